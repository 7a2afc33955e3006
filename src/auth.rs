//! OAuth credentials written by the Antigravity / Gemini login flow

use crate::error::AuthError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Unix timestamp in milliseconds
    #[serde(default)]
    pub expiry_date: i64,
}

impl Credentials {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }

    pub fn expires_in_minutes(&self) -> i64 {
        self.expires_in_minutes_at(Utc::now().timestamp_millis())
    }

    fn is_expired_at(&self, now_millis: i64) -> bool {
        now_millis > self.expiry_date
    }

    fn expires_in_minutes_at(&self, now_millis: i64) -> i64 {
        (self.expiry_date - now_millis) / 60_000
    }

    /// `Err(Expired)` when past expiry, so callers can skip the remote tier with a reason.
    pub fn ensure_valid(self) -> Result<Self, AuthError> {
        if self.is_expired() {
            return Err(AuthError::Expired {
                minutes: -self.expires_in_minutes(),
            });
        }
        Ok(self)
    }
}

/// Load credentials from `path`, or the default location when `None`.
pub fn load_credentials(path: Option<&Path>) -> Result<Credentials, AuthError> {
    let path = path.ok_or(AuthError::NoHome)?;
    let content = fs::read_to_string(path).map_err(|source| AuthError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}
