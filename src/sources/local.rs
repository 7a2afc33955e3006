//! Language server IPC client (`GetUserStatus`)

use super::json::{lenient, lenient_list, non_empty, quota_for, QuotaPayload};
use super::QuotaSource;
use crate::error::FetchError;
use crate::types::{ProcessInfo, Tier, UsageData};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const USER_STATUS_PATH: &str = "/exa.language_server_pb.LanguageServerService/GetUserStatus";
const CSRF_HEADER: &str = "X-Codeium-Csrf-Token";
const UNKNOWN_MODEL: &str = "Unknown Model";

pub struct LocalClient {
    info: ProcessInfo,
    http: Client,
}

impl LocalClient {
    pub fn new(info: ProcessInfo, timeout: Duration) -> Result<Self, FetchError> {
        // Loopback only: the language server presents a self-signed certificate.
        let http = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { info, http })
    }

    fn endpoint(scheme: &str, port: u16) -> String {
        format!("{}://127.0.0.1:{}{}", scheme, port, USER_STATUS_PATH)
    }

    /// Query the language server, HTTPS on the connect port first, then plain HTTP.
    #[instrument(skip(self), fields(pid = self.info.pid))]
    pub async fn get_user_status(&self) -> Result<UsageData, FetchError> {
        let https = Self::endpoint("https", self.info.connect_port);
        match self.post_user_status(&https).await {
            Err(err) if err.is_transport() => {
                warn!(error = %err, "HTTPS request failed, retrying over HTTP");
                let http = Self::endpoint("http", self.info.http_port);
                self.post_user_status(&http).await
            }
            other => other,
        }
    }

    async fn post_user_status(&self, url: &str) -> Result<UsageData, FetchError> {
        debug!(url, "POST GetUserStatus");
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header("Connect-Protocol-Version", "1")
            .header(CSRF_HEADER, &self.info.csrf_token)
            .body("{}")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        parse_user_status(&bytes)
    }
}

#[async_trait]
impl QuotaSource for LocalClient {
    fn tier(&self) -> Tier {
        Tier::Local
    }

    async fn fetch(&self) -> Result<UsageData, FetchError> {
        self.get_user_status().await
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatusResponse {
    #[serde(default, deserialize_with = "lenient")]
    user_status: Option<UserStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatus {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    plan_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    plan_status: Option<PlanStatus>,
    #[serde(default, deserialize_with = "lenient")]
    cascade_model_config_data: Option<ModelConfigData>,
    #[serde(default, deserialize_with = "lenient")]
    prompt_credits_info: Option<PromptCreditsInfo>,
}

impl UserStatus {
    fn tier(&self) -> &str {
        non_empty(&self.plan_name)
            .or_else(|| {
                self.plan_status
                    .as_ref()
                    .and_then(|s| s.plan_info.as_ref())
                    .and_then(PlanInfo::preferred_name)
            })
            .unwrap_or_default()
    }

    fn configs(&self) -> &[ModelConfig] {
        self.cascade_model_config_data
            .as_ref()
            .map(|d| d.client_model_configs.as_slice())
            .unwrap_or_default()
    }

    fn remaining_credits(&self) -> i64 {
        self.prompt_credits_info
            .as_ref()
            .and_then(|c| c.remaining_credits)
            .unwrap_or_default() as i64
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanStatus {
    #[serde(default, deserialize_with = "lenient")]
    plan_info: Option<PlanInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanInfo {
    #[serde(default, deserialize_with = "lenient")]
    plan_display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    plan_name: Option<String>,
}

impl PlanInfo {
    fn preferred_name(&self) -> Option<&str> {
        non_empty(&self.plan_display_name)
            .or_else(|| non_empty(&self.display_name))
            .or_else(|| non_empty(&self.plan_name))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelConfigData {
    #[serde(default, deserialize_with = "lenient_list")]
    client_model_configs: Vec<ModelConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelConfig {
    #[serde(default, deserialize_with = "lenient")]
    label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    model_or_alias: Option<ModelAlias>,
    #[serde(default, deserialize_with = "lenient")]
    quota_info: Option<QuotaPayload>,
}

impl ModelConfig {
    fn display_name(&self) -> &str {
        non_empty(&self.label)
            .or_else(|| self.model_or_alias.as_ref().and_then(|m| non_empty(&m.model)))
            .unwrap_or(UNKNOWN_MODEL)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ModelAlias {
    #[serde(default, deserialize_with = "lenient")]
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptCreditsInfo {
    #[serde(default, deserialize_with = "lenient")]
    remaining_credits: Option<f64>,
}

/// Map a `GetUserStatus` body onto `UsageData`.
///
/// Only a body that is not JSON at all is an error; every missing level
/// degrades to an empty value.
pub fn parse_user_status(body: &[u8]) -> Result<UsageData, FetchError> {
    let response: UserStatusResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    let status = response.user_status.unwrap_or_default();

    let mut data = UsageData::new();
    data.tier = status.tier().to_string();
    data.email = non_empty(&status.email).unwrap_or_default().to_string();
    data.name = non_empty(&status.name).unwrap_or_default().to_string();
    data.prompt_credit = status.remaining_credits();
    data.models = status
        .configs()
        .iter()
        .map(|config| quota_for(config.display_name(), config.quota_info.as_ref()))
        .collect();

    debug!(models = data.models.len(), tier = %data.tier, "Parsed user status");
    Ok(data)
}
