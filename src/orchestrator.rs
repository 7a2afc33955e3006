//! Tiered retrieval: Cloud Code API, then the local language server, then the cache

use crate::auth::Credentials;
use crate::cache::SnapshotStore;
use crate::config::Settings;
use crate::error::{AuthError, DiscoveryError, RetrievalError};
use crate::sources::{LocalClient, QuotaSource, RemoteClient};
use crate::types::{ProcessInfo, Tier, UsageData};
use tracing::{debug, info, warn};

/// Usage data together with the tier that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub data: UsageData,
    pub tier: Tier,
}

pub struct Retriever<S> {
    remote: Option<Box<dyn QuotaSource>>,
    local: Option<Box<dyn QuotaSource>>,
    cache: S,
    skipped: Vec<String>,
}

impl<S: SnapshotStore> Retriever<S> {
    pub fn new(cache: S) -> Self {
        Self {
            remote: None,
            local: None,
            cache,
            skipped: Vec::new(),
        }
    }

    pub fn with_remote(mut self, source: Option<Box<dyn QuotaSource>>) -> Self {
        if source.is_none() {
            self.skipped.push(format!("{}: skipped", Tier::Remote));
        }
        self.remote = source;
        self
    }

    pub fn with_local(mut self, source: Option<Box<dyn QuotaSource>>) -> Self {
        if source.is_none() {
            self.skipped.push(format!("{}: skipped", Tier::Local));
        }
        self.local = source;
        self
    }

    /// Walk the tiers in priority order; the first live success is cached and returned.
    pub async fn retrieve(&self) -> Result<Retrieval, RetrievalError> {
        let mut reasons = self.skipped.clone();

        for source in [&self.remote, &self.local].into_iter().flatten() {
            let tier = source.tier();
            debug!(%tier, "Trying source");
            match source.fetch().await {
                Ok(data) => {
                    info!(%tier, models = data.models.len(), "Fetched live usage");
                    self.cache.save(&data);
                    return Ok(Retrieval { data, tier });
                }
                Err(err) => {
                    warn!(%tier, error = %err, "Source failed, falling back");
                    reasons.push(format!("{}: {}", tier, err));
                }
            }
        }

        match self.cache.load_last_known() {
            Ok(data) => {
                info!(fetched_at = %data.fetched_at, "Using cached snapshot");
                Ok(Retrieval {
                    data,
                    tier: Tier::Cache,
                })
            }
            Err(err) => {
                reasons.push(err.to_string());
                Err(RetrievalError::Unavailable(reasons.join("; ")))
            }
        }
    }
}

/// Remote tier, when credentials loaded, are unexpired, and remote access is allowed.
pub fn remote_source(credentials: Result<Credentials, AuthError>, settings: &Settings) -> Option<Box<dyn QuotaSource>> {
    if settings.no_remote || settings.offline {
        debug!("Remote tier disabled");
        return None;
    }
    let credentials = match credentials.and_then(Credentials::ensure_valid) {
        Ok(credentials) => credentials,
        Err(err) => {
            info!(error = %err, "Skipping remote tier");
            return None;
        }
    };
    match RemoteClient::new(&credentials, &settings.cloud_base_url, settings.request_timeout) {
        Ok(client) => Some(Box::new(client)),
        Err(err) => {
            warn!(error = %err, "Could not build remote client");
            None
        }
    }
}

/// Local tier, only when discovery succeeded.
pub fn local_source(discovery: Result<ProcessInfo, DiscoveryError>, settings: &Settings) -> Option<Box<dyn QuotaSource>> {
    if settings.offline {
        debug!("Local tier disabled");
        return None;
    }
    let info = match discovery {
        Ok(info) => info,
        Err(err) => {
            info!(error = %err, "Skipping local tier");
            return None;
        }
    };
    match LocalClient::new(info, settings.request_timeout) {
        Ok(client) => Some(Box::new(client)),
        Err(err) => {
            warn!(error = %err, "Could not build local client");
            None
        }
    }
}
