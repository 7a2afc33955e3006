//! Core types for agusage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of the normalised quota scale
pub const QUOTA_SCALE: f64 = 100.0;

/// Connection parameters recovered from the language server process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Primary (HTTPS-capable) port
    pub connect_port: u16,
    /// Plaintext fallback port; equals `connect_port` when no second listener was found
    pub http_port: u16,
    pub csrf_token: String,
}

impl ProcessInfo {
    pub fn new(pid: u32, params: ConnectionParams) -> Self {
        Self {
            pid,
            connect_port: params.connect_port,
            http_port: params.connect_port,
            csrf_token: params.csrf_token,
        }
    }
}

/// What the command-line parser extracts from raw process text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub connect_port: u16,
    pub csrf_token: String,
}

/// Quota for a single model, normalised onto a 0-100 scale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaInfo {
    pub model_name: String,
    pub used: f64,
    pub limit: f64,
    pub remaining: f64,
    /// ISO-8601 timestamp, or empty when unknown
    #[serde(default)]
    pub reset_time: String,
    pub usage_percent: f64,
}

impl QuotaInfo {
    /// Build a quota entry from a remaining fraction in [0, 1].
    ///
    /// Out-of-range fractions are clamped so `used + remaining == limit` always holds.
    pub fn from_remaining_fraction(model_name: impl Into<String>, fraction: f64, reset_time: impl Into<String>) -> Self {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        let remaining = fraction * QUOTA_SCALE;
        let used = QUOTA_SCALE - remaining;
        Self {
            model_name: model_name.into(),
            used,
            limit: QUOTA_SCALE,
            remaining,
            reset_time: reset_time.into(),
            usage_percent: used,
        }
    }

    /// Zero-valued entry for a model that reported no quota data at all
    pub fn without_quota(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }
}

/// One complete usage capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageData {
    #[serde(default)]
    pub models: Vec<QuotaInfo>,
    #[serde(default)]
    pub tier: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub prompt_credit: i64,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub is_cached: bool,
}

impl UsageData {
    /// Fresh, empty capture stamped with the current time
    pub fn new() -> Self {
        Self::captured_at(Utc::now())
    }

    pub fn captured_at(fetched_at: DateTime<Utc>) -> Self {
        Self {
            models: Vec::new(),
            tier: String::new(),
            email: String::new(),
            name: String::new(),
            prompt_credit: 0,
            fetched_at,
            is_cached: false,
        }
    }
}

impl Default for UsageData {
    fn default() -> Self {
        Self::new()
    }
}

/// Which tier of the retrieval pipeline produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Cloud Code quota API
    Remote,
    /// Local language server
    Local,
    /// Last persisted snapshot
    Cache,
}

impl Tier {
    pub fn is_live(self) -> bool {
        !matches!(self, Tier::Cache)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Remote => write!(f, "Cloud Code API"),
            Tier::Local => write!(f, "Language server"),
            Tier::Cache => write!(f, "Cache"),
        }
    }
}

/// CLI output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
