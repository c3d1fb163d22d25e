//! Centralized path resolution for platform-appropriate user data directories.
//!
//! In development mode (cargo run), paths resolve to local directories.
//! In installed mode, paths resolve to platform-specific locations:
//! - Windows: `%APPDATA%\Maskdrill\`
//! - macOS: `~/Library/Application Support/Maskdrill/`
//! - Linux: `~/.config/maskdrill/` (config), `~/.local/share/maskdrill/` (data)

use std::path::PathBuf;

/// Returns true when running in development mode (cargo run).
///
/// Detection methods:
/// - `CARGO` env var is set (cargo run sets this)
/// - Debug assertions enabled (debug builds)
pub fn is_dev_mode() -> bool {
    std::env::var("CARGO").is_ok() || cfg!(debug_assertions)
}

/// Platform-appropriate config directory.
///
/// - Dev mode: current directory
/// - Linux: `~/.config/maskdrill/`
/// - Windows/macOS: same as data_dir
pub fn config_dir() -> Option<PathBuf> {
    if is_dev_mode() {
        return Some(PathBuf::from("."));
    }

    #[cfg(target_os = "linux")]
    {
        dirs::config_dir().map(|p| p.join("maskdrill"))
    }

    #[cfg(not(target_os = "linux"))]
    {
        data_dir()
    }
}

/// Platform-appropriate data directory.
///
/// - Dev mode: current directory
/// - Windows: `%APPDATA%\Maskdrill\`
/// - macOS: `~/Library/Application Support/Maskdrill/`
/// - Linux: `~/.local/share/maskdrill/`
pub fn data_dir() -> Option<PathBuf> {
    if is_dev_mode() {
        return Some(PathBuf::from("."));
    }

    dirs::data_dir().map(|p| p.join("maskdrill"))
}

/// Path to the config file.
///
/// - Dev mode: `./config.json`
/// - Installed: `{config_dir}/config.json`
pub fn config_file() -> PathBuf {
    config_dir()
        .map(|p| p.join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

/// Directory holding the keyed record stores (one JSON file per kind).
///
/// - Dev mode: `./store/`
/// - Installed: `{data_dir}/store/`
pub fn store_dir() -> PathBuf {
    data_dir()
        .map(|p| p.join("store"))
        .unwrap_or_else(|| PathBuf::from("store"))
}

/// Directory holding imported page images.
///
/// - Dev mode: `./pages/`
/// - Installed: `{data_dir}/pages/`
pub fn pages_dir() -> PathBuf {
    data_dir()
        .map(|p| p.join("pages"))
        .unwrap_or_else(|| PathBuf::from("pages"))
}

/// Path to the logs directory.
///
/// - Dev mode: `./logs/`
/// - Installed: `{data_dir}/logs/`
pub fn logs_dir() -> PathBuf {
    data_dir()
        .map(|p| p.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Ensure all required directories exist.
///
/// Called early in startup to create config, store, and page image
/// directories.
pub fn ensure_directories() -> std::io::Result<()> {
    if let Some(config) = config_dir()
        && !is_dev_mode()
    {
        std::fs::create_dir_all(&config)?;
    }
    std::fs::create_dir_all(store_dir())?;
    std::fs::create_dir_all(pages_dir())?;
    std::fs::create_dir_all(logs_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_not_none() {
        // In test mode (debug), should return Some
        assert!(config_dir().is_some());
    }

    #[test]
    fn test_data_dir_not_none() {
        assert!(data_dir().is_some());
    }

    #[test]
    fn test_config_file_has_json_extension() {
        let path = config_file();
        assert!(path.to_string_lossy().ends_with("config.json"));
    }

    #[test]
    fn test_dev_mode_returns_local_paths() {
        // In tests, is_dev_mode() should be true due to debug_assertions
        assert!(is_dev_mode());
        assert_eq!(config_dir(), Some(PathBuf::from(".")));
        assert_eq!(data_dir(), Some(PathBuf::from(".")));
    }

    #[test]
    fn test_store_dir_under_data_dir() {
        assert!(store_dir().to_string_lossy().ends_with("store"));
        assert!(pages_dir().to_string_lossy().ends_with("pages"));
    }
}
