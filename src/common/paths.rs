//! Platform paths and executable naming
//!
//! Windows-family hosts get a `.exe` suffix on the default executable names;
//! everything else uses the bare name.

use std::path::PathBuf;

/// Name used for the configuration directory
const APP_NAME: &str = "tiobench-harness";

/// Whether the host is a Windows-family platform
pub fn is_windows_family() -> bool {
    cfg!(windows)
}

/// Platform-specific executable name for a bare program name
///
/// `executable_name("tio")` is `tio.exe` on Windows and `tio` elsewhere.
pub fn executable_name(base: &str) -> String {
    executable_name_for(base, is_windows_family())
}

pub(crate) fn executable_name_for(base: &str, windows: bool) -> String {
    if windows {
        format!("{}.exe", base)
    } else {
        base.to_string()
    }
}

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/tiobench-harness/`
/// - macOS: `~/Library/Application Support/tiobench-harness/`
/// - Windows: `%APPDATA%\tiobench-harness\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
