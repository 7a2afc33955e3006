//! Single-slot snapshot cache of the last successful live capture

use crate::error::CacheError;
use crate::types::UsageData;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Persistence seam used by the retrieval pipeline
pub trait SnapshotStore {
    /// Overwrite the stored snapshot. Failures are logged, never returned.
    fn save(&self, data: &UsageData);

    /// Last stored snapshot, flagged as cached.
    fn load_last_known(&self) -> Result<UsageData, CacheError>;
}

/// JSON file on disk holding one `UsageData`
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: Option<PathBuf>,
}

impl SnapshotCache {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    fn write(path: &Path, data: &UsageData) -> anyhow::Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let json = serde_json::to_vec_pretty(data)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.persist(path)?;
        Ok(())
    }
}

impl SnapshotStore for SnapshotCache {
    fn save(&self, data: &UsageData) {
        let Some(path) = &self.path else {
            warn!("No cache location available, snapshot not saved");
            return;
        };
        match Self::write(path, data) {
            Ok(()) => debug!(path = %path.display(), "Saved usage snapshot"),
            Err(err) => warn!(path = %path.display(), error = %err, "Failed to save usage snapshot"),
        }
    }

    fn load_last_known(&self) -> Result<UsageData, CacheError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| CacheError::NotFound("no cache location".to_string()))?;

        let content = fs::read_to_string(path)
            .map_err(|e| CacheError::NotFound(format!("{}: {}", path.display(), e)))?;
        let mut data: UsageData = serde_json::from_str(&content)
            .map_err(|e| CacheError::NotFound(format!("{}: {}", path.display(), e)))?;

        data.is_cached = true;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuotaInfo;
    use chrono::{TimeZone, Utc};

    fn snapshot() -> UsageData {
        let mut data = UsageData::captured_at(Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap());
        data.tier = "Pro".to_string();
        data.email = "ada@example.com".to_string();
        data.prompt_credit = 500;
        data.models = vec![
            QuotaInfo::from_remaining_fraction("Gemini 3 Pro", 0.25, "2025-03-14T12:00:00Z"),
            QuotaInfo::without_quota("Basic"),
        ];
        data
    }

    #[test]
    fn test_round_trip_marks_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(Some(dir.path().join("nested").join("last_usage.json")));

        let original = snapshot();
        cache.save(&original);
        let loaded = cache.load_last_known().unwrap();

        assert!(loaded.is_cached);
        assert_eq!(loaded.fetched_at, original.fetched_at);
        assert_eq!(loaded.models, original.models);
        assert_eq!(
            UsageData {
                is_cached: false,
                ..loaded
            },
            original
        );
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(Some(dir.path().join("last_usage.json")));

        cache.save(&snapshot());
        let mut newer = snapshot();
        newer.tier = "Ultra".to_string();
        cache.save(&newer);

        assert_eq!(cache.load_last_known().unwrap().tier, "Ultra");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(Some(dir.path().join("missing.json")));
        assert!(matches!(cache.load_last_known(), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_usage.json");
        fs::write(&path, "{ not json").unwrap();

        let cache = SnapshotCache::new(Some(path));
        assert!(matches!(cache.load_last_known(), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_no_location() {
        let cache = SnapshotCache::new(None);
        cache.save(&snapshot());
        assert!(matches!(cache.load_last_known(), Err(CacheError::NotFound(_))));
    }
}
