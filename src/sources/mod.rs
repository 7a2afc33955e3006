//! Live quota sources: the Cloud Code API and the local language server

pub mod json;
mod local;
mod remote;

pub use local::LocalClient;
pub use remote::RemoteClient;

use crate::error::FetchError;
use crate::types::{Tier, UsageData};
use async_trait::async_trait;

/// A live tier of the retrieval pipeline
#[async_trait]
pub trait QuotaSource: Send + Sync {
    /// Which tier this source represents
    fn tier(&self) -> Tier;

    /// Fetch a fresh usage snapshot
    async fn fetch(&self) -> Result<UsageData, FetchError>;
}
