//! "Present or default" building blocks for loosely-shaped JSON payloads
//!
//! Every optional level of an upstream response is declared with
//! `#[serde(default, deserialize_with = "lenient")]`: a missing key, a `null`,
//! or a value of the wrong type all become `None` instead of failing the
//! whole document.

use crate::types::QuotaInfo;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize a field as `Some(T)` when it has the expected shape, `None` otherwise.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Deserialize an array field, dropping elements that do not have the expected shape.
///
/// A non-array value yields an empty list.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items.into_iter().filter_map(|item| T::deserialize(item).ok()).collect(),
        _ => Vec::new(),
    })
}

/// `Some` only for non-blank strings
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// `quotaInfo` object shared by the language server and Cloud Code responses
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub remaining_fraction: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub reset_time: Option<String>,
}

impl QuotaPayload {
    pub fn remaining_fraction(&self) -> Option<f64> {
        self.remaining_fraction
    }

    pub fn reset_time(&self) -> &str {
        self.reset_time.as_deref().unwrap_or_default()
    }
}

/// Normalised quota for `name`.
///
/// Without a `remainingFraction` the entry stays zero-valued (`limit == 0`);
/// a reported `resetTime` is kept either way.
pub fn quota_for(name: &str, payload: Option<&QuotaPayload>) -> QuotaInfo {
    let Some(quota) = payload else {
        return QuotaInfo::without_quota(name);
    };
    match quota.remaining_fraction() {
        Some(fraction) => QuotaInfo::from_remaining_fraction(name, fraction, quota.reset_time()),
        None => QuotaInfo {
            reset_time: quota.reset_time().to_string(),
            ..QuotaInfo::without_quota(name)
        },
    }
}
