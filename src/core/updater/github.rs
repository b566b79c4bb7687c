// ─── Release Updater ───
// Pulls extra content (mod bundles, shader packs, resource packs, config)
// from the assets of a repository's latest release.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::core::downloader::client::write_file;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Fetcher;
use crate::core::java::extract::{extract_archive, ArchiveKind};
use crate::core::progress::{scaled, ProgressReporter};
use crate::core::state::GameLayout;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Placed as-is.
    File,
    /// Zip unpacked into the target folder.
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorizedAsset {
    #[serde(flatten)]
    pub asset: ReleaseAsset,
    pub kind: AssetKind,
    /// Folder under the data dir.
    pub folder: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseAssets {
    pub mods: Vec<CategorizedAsset>,
    pub shaders: Vec<CategorizedAsset>,
    pub resourcepacks: Vec<CategorizedAsset>,
    pub config: Vec<CategorizedAsset>,
    /// Not installed.
    pub other: Vec<ReleaseAsset>,
    pub latest_version: Option<String>,
}

impl ReleaseAssets {
    fn installable(&self) -> impl Iterator<Item = &CategorizedAsset> {
        self.mods
            .iter()
            .chain(&self.shaders)
            .chain(&self.resourcepacks)
            .chain(&self.config)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheck {
    pub has_updates: bool,
    pub current_version: Option<String>,
    pub latest_version: Option<String>,
    pub release_notes: Option<String>,
    pub assets: Option<ReleaseAssets>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Contents of `version.json` in the data dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMarker {
    pub version: String,
    pub updated_at: DateTime<Utc>,
}

/// Sort release assets into install folders by name.
pub fn categorize_assets(assets: &[ReleaseAsset]) -> ReleaseAssets {
    let mut out = ReleaseAssets::default();

    for asset in assets {
        let name = asset.name.to_lowercase();
        let categorized = |kind, folder| CategorizedAsset {
            asset: asset.clone(),
            kind,
            folder,
        };

        if name.contains("mods") || name.ends_with(".jar") {
            if name.ends_with(".zip") && name.contains("mods") {
                out.mods.push(categorized(AssetKind::Archive, "mods"));
            } else if name.ends_with(".jar") {
                out.mods.push(categorized(AssetKind::File, "mods"));
            }
        } else if name.contains("shader") {
            let kind = if name.ends_with(".zip") {
                AssetKind::Archive
            } else {
                AssetKind::File
            };
            out.shaders.push(categorized(kind, "shaderpacks"));
        } else if name.contains("resource") || name.contains("texture") {
            out.resourcepacks
                .push(categorized(AssetKind::File, "resourcepacks"));
        } else if name.contains("config") {
            out.config.push(categorized(AssetKind::Archive, "config"));
        } else {
            out.other.push(asset.clone());
        }
    }

    out
}

fn strip_v(tag: &str) -> &str {
    tag.strip_prefix('v').unwrap_or(tag)
}

fn needs_update(remote: &str, local: Option<&str>) -> bool {
    match local {
        None => true,
        Some(local) => strip_v(remote) != strip_v(local),
    }
}

pub struct ReleaseUpdater {
    fetcher: Fetcher,
    api_base: String,
    repo: String,
    layout: GameLayout,
    progress: ProgressReporter,
}

impl ReleaseUpdater {
    pub fn new(fetcher: Fetcher, api_base: &str, repo: &str, layout: GameLayout) -> Self {
        Self {
            fetcher,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo: repo.trim_matches('/').to_string(),
            layout,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Locally recorded release, if the marker exists and parses.
    pub async fn local_version(&self) -> Option<String> {
        let path = self.layout.version_marker();
        let raw = tokio::fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => value
                .get("version")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            Err(e) => {
                warn!("Ignoring unreadable version marker {:?}: {}", path, e);
                None
            }
        }
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    pub async fn check_for_updates(&self) -> LauncherResult<UpdateCheck> {
        self.progress.emit("Checking for updates...", 0);
        let url = format!("{}/repos/{}/releases/latest", self.api_base, self.repo);

        let release: Release = match self.fetcher.get_json(&url).await {
            Ok(release) => release,
            Err(LauncherError::DownloadFailed { status: 404, .. }) => {
                self.progress.emit("Check complete", 100);
                return Ok(UpdateCheck {
                    error: Some("No releases found in repository".into()),
                    ..UpdateCheck::default()
                });
            }
            Err(e) => return Err(e),
        };

        self.progress.emit("Checking versions...", 50);
        let current = self.local_version().await;
        let has_updates = needs_update(&release.tag_name, current.as_deref());
        let mut assets = categorize_assets(&release.assets);
        assets.latest_version = Some(release.tag_name.clone());

        info!(
            "Latest release {} (local {}), update needed: {}",
            release.tag_name,
            current.as_deref().unwrap_or("none"),
            has_updates
        );
        self.progress.emit("Check complete", 100);

        Ok(UpdateCheck {
            has_updates,
            current_version: current,
            latest_version: Some(release.tag_name),
            release_notes: release.body,
            assets: Some(assets),
            error: None,
        })
    }

    /// Install every categorized asset, then record the release in the marker.
    pub async fn download_assets(&self, assets: &ReleaseAssets) -> LauncherResult<()> {
        let installable: Vec<&CategorizedAsset> = assets.installable().collect();
        let total = installable.len();

        for (done, item) in installable.into_iter().enumerate() {
            self.progress.emit_with(
                format!("Downloading {}...", item.asset.name),
                scaled(0, 100, done, total),
                item.asset.name.clone(),
            );
            self.install_asset(item).await?;
        }

        let marker = VersionMarker {
            version: assets
                .latest_version
                .clone()
                .unwrap_or_else(|| "unknown".into()),
            updated_at: Utc::now(),
        };
        let raw = serde_json::to_string_pretty(&marker)?;
        write_file(&self.layout.version_marker(), raw.as_bytes()).await?;

        self.progress.emit("Downloads complete!", 100);
        Ok(())
    }

    async fn install_asset(&self, item: &CategorizedAsset) -> LauncherResult<()> {
        let target_dir = self.layout.root().join(item.folder);
        let name = &item.asset.name;
        let temp = target_dir.join(format!("{name}.tmp"));
        let dest = target_dir.join(name);

        self.fetcher
            .stream_to_file(&item.asset.browser_download_url, &temp, None)
            .await?;

        if item.kind == AssetKind::Archive && name.to_lowercase().ends_with(".zip") {
            info!("Extracting {} into {:?}", name, target_dir);
            let (archive, into) = (temp.clone(), target_dir.clone());
            tokio::task::spawn_blocking(move || {
                extract_archive(&archive, ArchiveKind::Zip, &into)
            })
            .await
            .map_err(|e| LauncherError::Other(format!("Extraction task failed: {e}")))??;
            remove_quietly(&temp).await;
        } else {
            remove_quietly(&dest).await;
            tokio::fs::rename(&temp, &dest)
                .await
                .map_err(|e| LauncherError::io(&dest, e))?;
        }
        Ok(())
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {:?}: {}", path, e);
        }
    }
}
