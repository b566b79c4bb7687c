use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::core::downloader::client::write_file;
use crate::core::error::LauncherResult;
use crate::core::http::{parse_json, Fetcher};
use crate::core::state::GameLayout;
use crate::core::version::AssetIndexRef;

/// Asset index document. Ordered so entry lists come out the same every run.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

/// A content-addressed asset object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub logical_name: String,
    pub digest: String,
    pub size_hint: u64,
}

impl AssetEntry {
    /// `objects/<digest[0:2]>/<digest>`, relative to the assets directory.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from("objects")
            .join(&self.digest[..2])
            .join(&self.digest)
    }

    pub fn url(&self, resources_base: &str) -> String {
        format!(
            "{}/{}/{}",
            resources_base.trim_end_matches('/'),
            &self.digest[..2],
            self.digest
        )
    }
}

impl AssetIndex {
    pub fn parse(source_name: &str, raw: &str) -> LauncherResult<Self> {
        parse_json(source_name, raw)
    }

    /// Index saved at `assets/indexes/<id>.json` if it is there and readable,
    /// otherwise fetched, checked against its digest and saved.
    pub async fn load_or_fetch(
        fetcher: &Fetcher,
        layout: &GameLayout,
        index_ref: &AssetIndexRef,
    ) -> LauncherResult<Self> {
        let path = layout.asset_index(&index_ref.id);

        if let Ok(raw) = tokio::fs::read_to_string(&path).await {
            match Self::parse(&path.display().to_string(), &raw) {
                Ok(index) => {
                    debug!("Reusing asset index {:?}", path);
                    return Ok(index);
                }
                Err(e) => warn!("Re-fetching unreadable asset index {:?}: {}", path, e),
            }
        }

        info!("Fetching asset index {}", index_ref.id);
        let raw = fetcher.get_text(&index_ref.url).await?;
        if let Some(digest) = &index_ref.digest {
            digest.verify(raw.as_bytes(), &path)?;
        }
        let index = Self::parse(&index_ref.url, &raw)?;
        write_file(&path, raw.as_bytes()).await?;
        Ok(index)
    }

    /// All objects as entries. Objects with a malformed hash are dropped.
    pub fn entries(&self) -> Vec<AssetEntry> {
        self.objects
            .iter()
            .filter_map(|(name, obj)| {
                if obj.hash.len() < 2 || !obj.hash.chars().all(|c| c.is_ascii_hexdigit()) {
                    warn!("Ignoring asset {} with malformed hash {:?}", name, obj.hash);
                    return None;
                }
                Some(AssetEntry {
                    logical_name: name.clone(),
                    digest: obj.hash.clone(),
                    size_hint: obj.size,
                })
            })
            .collect()
    }
}
