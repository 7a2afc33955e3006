//! Runtime settings assembled from CLI flags and `AGUSAGE_*` environment variables

use crate::utils::paths;
use std::path::PathBuf;
use std::time::Duration;

/// Substring identifying the language server in a process listing
pub const DEFAULT_PROCESS_MATCH: &str = "language_server";

/// Minimum length of a flag value the token heuristic accepts as a CSRF token
pub const DEFAULT_TOKEN_MIN_LEN: usize = 20;

/// Per-request HTTP timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for `ps`, `netstat`, `lsof`, `ss` and PowerShell
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Cloud Code API host
pub const DEFAULT_CLOUD_BASE_URL: &str = "https://cloudcode-pa.googleapis.com";

#[derive(Debug, Clone)]
pub struct Settings {
    pub process_match: String,
    pub token_min_len: usize,
    pub request_timeout: Duration,
    pub command_timeout: Duration,
    pub credentials_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub cloud_base_url: String,
    /// Skip the Cloud Code tier
    pub no_remote: bool,
    /// Skip both live tiers
    pub offline: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            process_match: DEFAULT_PROCESS_MATCH.to_string(),
            token_min_len: DEFAULT_TOKEN_MIN_LEN,
            request_timeout: REQUEST_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            credentials_path: paths::credentials_file(),
            cache_path: paths::cache_file(),
            cloud_base_url: DEFAULT_CLOUD_BASE_URL.to_string(),
            no_remote: false,
            offline: false,
        }
    }
}

impl Settings {
    /// Defaults overridden by whatever `AGUSAGE_*` variables are set
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(pattern) = lookup("AGUSAGE_PROCESS_MATCH").filter(|s| !s.trim().is_empty()) {
            settings.process_match = pattern.trim().to_string();
        }
        if let Some(len) = lookup("AGUSAGE_TOKEN_MIN_LEN").and_then(|s| s.trim().parse::<usize>().ok()) {
            // A zero-length threshold would accept any flag value
            settings.token_min_len = len.max(1);
        }
        if let Some(secs) = lookup("AGUSAGE_COMMAND_TIMEOUT_SECS").and_then(|s| s.trim().parse::<u64>().ok()) {
            settings.command_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(path) = lookup("AGUSAGE_CREDENTIALS_FILE").filter(|s| !s.is_empty()) {
            settings.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("AGUSAGE_CACHE_FILE").filter(|s| !s.is_empty()) {
            settings.cache_path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("AGUSAGE_CLOUD_BASE_URL").filter(|s| !s.is_empty()) {
            settings.cloud_base_url = url.trim_end_matches('/').to_string();
        }

        settings
    }
}
