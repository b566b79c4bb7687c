// ─── Library & Asset Sync ───
// Existence-checked, batched downloads of everything under libraries/ and
// assets/objects/. Paths are deterministic, so "present" means "done".

use serde::Serialize;
use tracing::{debug, info, warn};

use super::asset_index::AssetIndex;
use crate::core::downloader::batch::{ASSET_BATCH, LIBRARY_BATCH};
use crate::core::downloader::{BatchScheduler, Digest, DownloadEntry, Downloader};
use crate::core::error::LauncherResult;
use crate::core::progress::{scaled, ProgressReporter};
use crate::core::state::{Endpoints, GameLayout};
use crate::core::version::{current_os_name, AssetIndexRef, InstallationPlan};

/// Outcome of one synchronization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub downloaded: usize,
    pub failed: usize,
    /// Already present locally.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct LibraryAssetSynchronizer {
    downloader: Downloader,
    layout: GameLayout,
    resources_base: String,
    progress: ProgressReporter,
    os: String,
}

impl LibraryAssetSynchronizer {
    pub fn new(downloader: Downloader, layout: GameLayout, endpoints: &Endpoints) -> Self {
        Self {
            downloader,
            layout,
            resources_base: endpoints.resources.clone(),
            progress: ProgressReporter::silent(),
            os: current_os_name().to_string(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Evaluate library rules as if running on `os`.
    pub fn with_platform(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    /// Download the game client jar unless it is already there.
    pub async fn sync_client(&self, plan: &InstallationPlan) -> LauncherResult<bool> {
        let dest = self.layout.client_jar(&plan.game_version);
        let Some(client) = &plan.client else {
            warn!("Minecraft {} lists no client download", plan.game_version);
            return Ok(false);
        };
        if path_exists(&dest).await {
            debug!("Client jar present at {:?}", dest);
            return Ok(false);
        }

        self.progress.emit("Downloading Minecraft client...", 0);
        self.downloader
            .download_file(&client.url, &dest, client.digest.as_ref())
            .await?;
        self.progress.emit("Minecraft client ready", 100);
        Ok(true)
    }

    /// Fetch every platform-allowed library that is not on disk yet.
    ///
    /// Download failures are counted; a filesystem error aborts.
    pub async fn sync_libraries(&self, plan: &InstallationPlan) -> LauncherResult<SyncReport> {
        let libraries_dir = self.layout.libraries_dir();
        let mut report = SyncReport::default();
        let mut missing = Vec::new();

        for lib in &plan.libraries {
            if !lib.is_allowed_for(&self.os) {
                debug!("Skipping library (platform rule): {}", lib.logical_name);
                continue;
            }
            let dest = libraries_dir.join(&lib.relative_path);
            if path_exists(&dest).await {
                report.skipped += 1;
                continue;
            }
            missing.push(
                DownloadEntry::new(&lib.source_url, dest)
                    .with_digest(lib.expected_digest.clone()),
            );
        }

        info!(
            "Downloading {} libraries ({} already present)",
            missing.len(),
            report.skipped
        );
        self.run_batches("libraries", missing, LIBRARY_BATCH, &mut report)
            .await?;
        Ok(report)
    }

    /// Fetch the asset index (if needed) and every object missing from disk.
    ///
    /// Only a failure to obtain the index, or a filesystem error, is an error.
    pub async fn sync_assets(&self, index_ref: &AssetIndexRef) -> LauncherResult<SyncReport> {
        let index =
            AssetIndex::load_or_fetch(self.downloader.fetcher(), &self.layout, index_ref).await?;
        let assets_dir = self.layout.assets_dir();
        let mut report = SyncReport::default();
        let mut missing = Vec::new();

        for entry in index.entries() {
            let dest = assets_dir.join(entry.relative_path());
            if path_exists(&dest).await {
                report.skipped += 1;
                continue;
            }
            missing.push(
                DownloadEntry::new(entry.url(&self.resources_base), dest)
                    .with_digest(Some(Digest::Sha1(entry.digest.clone()))),
            );
        }

        info!(
            "Downloading {} asset objects ({} already cached)",
            missing.len(),
            report.skipped
        );
        self.run_batches("assets", missing, ASSET_BATCH, &mut report)
            .await?;
        Ok(report)
    }

    async fn run_batches(
        &self,
        label: &str,
        entries: Vec<DownloadEntry>,
        batch_size: usize,
        report: &mut SyncReport,
    ) -> LauncherResult<()> {
        let progress = &self.progress;
        let outcome = self
            .downloader
            .download_batch(entries, BatchScheduler::new(batch_size), |done, total| {
                progress.emit_with(
                    format!("Downloading {label}... ({done}/{total})"),
                    scaled(0, 100, done, total),
                    format!("{done}/{total}"),
                );
            })
            .await?;

        for (entry, err) in &outcome.failed {
            warn!("Failed to download {}: {}", entry.url, err);
        }

        report.downloaded += outcome.succeeded_count();
        report.failed += outcome.failed_count();
        progress.emit(format!("{label} synced"), 100);
        Ok(())
    }
}

async fn path_exists(path: &std::path::Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
