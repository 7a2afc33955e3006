//! Cross-platform path utilities for credentials and the snapshot cache

use std::path::PathBuf;

/// Get home directory
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Directory holding the Gemini / Antigravity OAuth state
pub fn gemini_config_dir() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".gemini"))
}

/// OAuth credential file written by the Antigravity login flow
pub fn credentials_file() -> Option<PathBuf> {
    gemini_config_dir().map(|d| d.join("oauth_creds.json"))
}

/// Per-user cache directory for agusage
pub fn cache_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        dirs::data_local_dir().map(|d| d.join("agusage").join("cache"))
    }
    #[cfg(target_os = "macos")]
    {
        home_dir().map(|h| h.join("Library").join("Caches").join("agusage"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        dirs::cache_dir()
            .or_else(|| home_dir().map(|h| h.join(".cache")))
            .map(|d| d.join("agusage"))
    }
}

/// Single-slot snapshot file
pub fn cache_file() -> Option<PathBuf> {
    cache_dir().map(|d| d.join("last_usage.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_file_under_gemini_dir() {
        if let Some(path) = credentials_file() {
            assert!(path.ends_with(".gemini/oauth_creds.json"));
        }
    }

    #[test]
    fn test_cache_file_name() {
        if let Some(path) = cache_file() {
            assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("last_usage.json"));
            assert!(path.to_string_lossy().contains("agusage"));
        }
    }
}
