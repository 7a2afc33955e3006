//! Cloud Code quota client (`fetchAvailableModels`)

use super::json::{lenient, non_empty, quota_for, QuotaPayload};
use super::QuotaSource;
use crate::auth::Credentials;
use crate::error::FetchError;
use crate::types::{QuotaInfo, Tier, UsageData};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const CLIENT_USER_AGENT: &str = "antigravity/1.11.3";

pub struct RemoteClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl RemoteClient {
    pub fn new(credentials: &Credentials, base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: credentials.access_token.clone(),
        })
    }

    async fn call(&self, method: &str, body: &Value) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/v1internal:{}", self.base_url, method);
        debug!(%url, "POST");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Auth(format!("HTTP {}: {}", status.as_u16(), body)));
        }
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Project id and subscription tier from `loadCodeAssist`.
    ///
    /// Best-effort: any failure yields `(None, None)`.
    pub async fn get_project_id(&self) -> (Option<String>, Option<String>) {
        let meta = json!({"metadata": {"ideType": "ANTIGRAVITY"}});
        let body = match self.call("loadCodeAssist", &meta).await {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "loadCodeAssist failed, continuing without project");
                return (None, None);
            }
        };

        match serde_json::from_slice::<LoadCodeAssistResponse>(&body) {
            Ok(data) => (data.project_id(), data.tier_name()),
            Err(err) => {
                warn!(error = %err, "Unreadable loadCodeAssist response");
                (None, None)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_usage_data(&self) -> Result<UsageData, FetchError> {
        let (project, subscription_tier) = self.get_project_id().await;
        let request = match &project {
            Some(project) => json!({ "project": project }),
            None => json!({}),
        };

        let body = self.call("fetchAvailableModels", &request).await?;
        let mut data = parse_models_response(&body)?;
        if data.tier.is_empty() {
            data.tier = subscription_tier.unwrap_or_default();
        }
        Ok(data)
    }
}

#[async_trait]
impl QuotaSource for RemoteClient {
    fn tier(&self) -> Tier {
        Tier::Remote
    }

    async fn fetch(&self) -> Result<UsageData, FetchError> {
        self.get_usage_data().await
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadCodeAssistResponse {
    /// Either a bare id or `{"id": ...}`
    #[serde(default, deserialize_with = "lenient")]
    cloudaicompanion_project: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    project: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    current_tier: Option<SubscriptionTier>,
    #[serde(default, deserialize_with = "lenient")]
    paid_tier: Option<SubscriptionTier>,
}

impl LoadCodeAssistResponse {
    fn project_id(&self) -> Option<String> {
        let companion = match &self.cloudaicompanion_project {
            Some(Value::String(id)) => Some(id.as_str()),
            Some(Value::Object(obj)) => obj.get("id").and_then(Value::as_str),
            _ => None,
        };
        companion
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| non_empty(&self.project))
            .map(str::to_string)
    }

    fn tier_name(&self) -> Option<String> {
        self.paid_tier
            .as_ref()
            .and_then(SubscriptionTier::label)
            .or_else(|| self.current_tier.as_ref().and_then(SubscriptionTier::label))
            .map(str::to_string)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SubscriptionTier {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
}

impl SubscriptionTier {
    fn label(&self) -> Option<&str> {
        non_empty(&self.name).or_else(|| non_empty(&self.id))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelsResponse {
    #[serde(default)]
    models: Option<Value>,
    #[serde(default)]
    models_map: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    plan_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteModel {
    #[serde(default, deserialize_with = "lenient")]
    label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    model_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    model: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    quota_info: Option<QuotaPayload>,
}

impl RemoteModel {
    fn name(&self) -> Option<&str> {
        non_empty(&self.label)
            .or_else(|| non_empty(&self.model_id))
            .or_else(|| non_empty(&self.model))
    }

    fn to_quota(&self, name: &str) -> QuotaInfo {
        quota_for(name, self.quota_info.as_ref())
    }
}

/// Map a `fetchAvailableModels` body onto `UsageData`.
///
/// `models` (or `modelsMap`) may be an array of entries or an object keyed by
/// model name. Entries that are not objects, and array entries without any
/// name, are dropped.
pub fn parse_models_response(body: &[u8]) -> Result<UsageData, FetchError> {
    let response: ModelsResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let models = match response.models.or(response.models_map) {
        Some(Value::Array(entries)) => entries
            .into_iter()
            .filter_map(|entry| RemoteModel::deserialize(entry).ok())
            .filter_map(|model| model.name().map(|name| model.to_quota(name)))
            .collect(),
        Some(Value::Object(entries)) => entries
            .into_iter()
            .filter(|(_, entry)| entry.is_object())
            .filter_map(|(key, entry)| {
                let model = RemoteModel::deserialize(entry).ok()?;
                let name = model.name().unwrap_or(&key).to_string();
                Some(model.to_quota(&name))
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut data = UsageData::new();
    data.tier = non_empty(&response.plan_name).unwrap_or_default().to_string();
    data.models = models;
    debug!(models = data.models.len(), "Parsed available models");
    Ok(data)
}
