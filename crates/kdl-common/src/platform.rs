/// Returns the platform name string.
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "windows")]
    { "windows" }
    #[cfg(target_os = "linux")]
    { "linux" }
    #[cfg(target_os = "macos")]
    { "macos" }
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    { "unknown" }
}

/// Whether this build can open shared libraries at run time.
///
/// On other targets every kernel library load reports "not found".
pub fn supports_dynamic_loading() -> bool {
    cfg!(any(unix, windows))
}
