use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::registry::ResolvedArtifact;
use crate::core::downloader::client::write_file;
use crate::core::error::LauncherResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedArtifact {
    #[serde(flatten)]
    pub artifact: ResolvedArtifact,
    pub target_version: String,
}

/// Persisted registry answers, keyed by `id` or `id@version`.
///
/// An entry recorded for a different game version is treated as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionCache {
    #[serde(default, alias = "mods")]
    packages: BTreeMap<String, CachedArtifact>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

impl ResolutionCache {
    /// Missing or unreadable caches start empty.
    pub async fn load(path: &Path) -> Self {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Could not read resolution cache {:?}: {}", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str::<ResolutionCache>(&raw) {
            Ok(cache) => {
                debug!("Loaded {} cached resolutions", cache.packages.len());
                cache
            }
            Err(e) => {
                warn!("Ignoring corrupt resolution cache {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub async fn save(&mut self, path: &Path) -> LauncherResult<()> {
        self.last_updated = Some(Utc::now());
        let raw = serde_json::to_string_pretty(self)?;
        write_file(path, raw.as_bytes()).await
    }

    pub fn lookup(&self, key: &str, target_version: &str) -> Option<&ResolvedArtifact> {
        self.packages
            .get(key)
            .filter(|cached| cached.target_version == target_version)
            .map(|cached| &cached.artifact)
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        artifact: ResolvedArtifact,
        target_version: &str,
    ) {
        self.packages.insert(
            key.into(),
            CachedArtifact {
                artifact,
                target_version: target_version.to_string(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(id: &str) -> ResolvedArtifact {
        ResolvedArtifact {
            id: id.into(),
            resolved_version: "1.0.0".into(),
            version_id: "abc123".into(),
            file_name: format!("{id}-1.0.0.jar"),
            download_url: format!("https://cdn.example/{id}.jar"),
            sha512: None,
            size: 0,
        }
    }

    #[test]
    fn entries_for_another_game_version_are_stale() {
        let mut cache = ResolutionCache::default();
        cache.insert("sodium", artifact("sodium"), "1.21.1");

        assert!(cache.lookup("sodium", "1.21.1").is_some());
        assert!(cache.lookup("sodium", "1.20.4").is_none());
        assert!(cache.lookup("lithium", "1.21.1").is_none());
    }

    #[tokio::test]
    async fn save_and_reload_keeps_entries_and_stamps_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modpack-cache.json");

        let mut cache = ResolutionCache::default();
        cache.insert("lithium@0.13.0", artifact("lithium"), "1.21.1");
        cache.save(&path).await.unwrap();

        let reloaded = ResolutionCache::load(&path).await;
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.last_updated().is_some());
        assert_eq!(
            reloaded.lookup("lithium@0.13.0", "1.21.1").unwrap().file_name,
            "lithium-1.0.0.jar"
        );

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"packages\""));
        assert!(raw.contains("\"targetVersion\": \"1.21.1\""));
    }

    #[tokio::test]
    async fn corrupt_cache_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modpack-cache.json");
        std::fs::write(&path, "{ nope").unwrap();

        assert!(ResolutionCache::load(&path).await.is_empty());
        assert!(ResolutionCache::load(&dir.path().join("absent.json"))
            .await
            .is_empty());
    }
}
