// ─── Package Synchronizer ───
// Brings mods/ in line with an install manifest: resolve (cache first),
// verify what is already there, drop what is no longer declared, download the
// rest in batches, then refresh shader packs.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::cache::ResolutionCache;
use super::inventory::LocalInventory;
use super::manifest::InstallManifest;
use super::registry::{PackageRegistry, ResolvedArtifact};
use super::shaders::{sync_shaders, ShaderSyncSummary};
use crate::core::downloader::batch::PACKAGE_BATCH;
use crate::core::downloader::digest::file_matches;
use crate::core::downloader::{BatchScheduler, DownloadEntry, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::progress::{scaled, ProgressReporter};
use crate::core::state::GameLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Delete jars in mods/ that the manifest no longer declares.
    pub remove_undeclared: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            remove_undeclared: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PackageSyncSummary {
    pub downloaded: usize,
    /// Declared packages the registry resolved.
    pub total: usize,
    pub failed: usize,
    pub removed: usize,
    /// Already present with a matching digest.
    pub skipped: usize,
    /// Declared packages the registry could not resolve.
    pub unresolved: usize,
    pub shaders: ShaderSyncSummary,
}

pub struct PackageSynchronizer {
    registry: Arc<dyn PackageRegistry>,
    downloader: Downloader,
    layout: GameLayout,
    progress: ProgressReporter,
}

impl PackageSynchronizer {
    pub fn new(
        registry: Arc<dyn PackageRegistry>,
        downloader: Downloader,
        layout: GameLayout,
    ) -> Self {
        Self {
            registry,
            downloader,
            layout,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Only filesystem failures (mods/, the cache, writing a download) are
    /// fatal; every per-package problem is counted and the pass goes on.
    #[instrument(skip_all, fields(game = %manifest.minecraft_version))]
    pub async fn sync(
        &self,
        manifest: &InstallManifest,
        options: SyncOptions,
    ) -> LauncherResult<PackageSyncSummary> {
        let progress = &self.progress;
        let mods_dir = self.layout.mods_dir();
        let game_version = manifest.minecraft_version.as_str();
        let mut summary = PackageSyncSummary::default();

        progress.emit("Loading modpack...", 0);
        tokio::fs::create_dir_all(&mods_dir)
            .await
            .map_err(|e| LauncherError::io(&mods_dir, e))?;

        let cache_path = self.layout.resolution_cache();
        let mut cache = ResolutionCache::load(&cache_path).await;
        let inventory = LocalInventory::scan(&mods_dir, "jar").await?;

        // ── Resolve ─────────────────────────────────────
        progress.emit("Resolving mod versions...", 5);
        let declared_count = manifest.mods.len();
        let mut declared: HashSet<String> = HashSet::new();
        let mut pending: Vec<ResolvedArtifact> = Vec::new();

        for (i, reference) in manifest.mods.iter().enumerate() {
            if i % 5 == 0 {
                progress.emit_with(
                    format!("Resolving mods... ({}/{})", i + 1, declared_count),
                    scaled(5, 25, i, declared_count),
                    reference.id.clone(),
                );
            }

            let key = reference.cache_key();
            let artifact = match cache.lookup(&key, game_version) {
                Some(hit) => {
                    debug!("Cache hit for {}", key);
                    hit.clone()
                }
                None => match self
                    .registry
                    .resolve(
                        &reference.id,
                        game_version,
                        Some(manifest.loader),
                        reference.version.as_deref(),
                    )
                    .await
                {
                    Ok(Some(artifact)) => {
                        cache.insert(key, artifact.clone(), game_version);
                        artifact
                    }
                    Ok(None) => {
                        warn!("Skipping {}: no compatible release", reference.id);
                        summary.unresolved += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!("Skipping {}: {}", reference.id, e);
                        summary.unresolved += 1;
                        continue;
                    }
                },
            };

            declared.insert(artifact.file_name.clone());
            summary.total += 1;

            let path = mods_dir.join(&artifact.file_name);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                let intact = match artifact.digest() {
                    Some(digest) => file_matches(&path, &digest).await.unwrap_or(false),
                    None => true,
                };
                if intact {
                    summary.skipped += 1;
                    continue;
                }
                warn!("Hash mismatch for {}, re-downloading", artifact.file_name);
            }
            pending.push(artifact);
        }

        cache.save(&cache_path).await?;

        // ── Drift ───────────────────────────────────────
        if options.remove_undeclared {
            for stray in inventory.undeclared(&declared) {
                match tokio::fs::remove_file(&stray.path).await {
                    Ok(()) => {
                        info!("Removed undeclared mod: {}", stray.file_name);
                        summary.removed += 1;
                    }
                    Err(e) => warn!("Could not remove {:?}: {}", stray.path, e),
                }
            }
        }

        // ── Download ────────────────────────────────────
        if pending.is_empty() {
            progress.emit("All mods are up to date!", 90);
        } else {
            progress.emit(format!("Downloading {} mods...", pending.len()), 30);
            let entries: Vec<DownloadEntry> = pending
                .iter()
                .map(|a| {
                    DownloadEntry::new(&a.download_url, mods_dir.join(&a.file_name))
                        .with_digest(a.digest())
                })
                .collect();

            let outcome = self
                .downloader
                .download_batch(entries, BatchScheduler::new(PACKAGE_BATCH), |done, total| {
                    progress.emit_with(
                        format!("Downloading mods... ({done}/{total})"),
                        scaled(30, 100, done, total),
                        format!("{done}/{total}"),
                    );
                })
                .await?;

            for (entry, err) in &outcome.failed {
                warn!("Failed to download {}: {}", entry.url, err);
            }
            summary.downloaded = outcome.succeeded_count();
            summary.failed = outcome.failed_count();
        }

        // ── Shaders ─────────────────────────────────────
        if !manifest.shaders.is_empty() {
            progress.emit("Syncing shader packs...", 100);
            summary.shaders = sync_shaders(
                self.registry.as_ref(),
                &self.downloader,
                &self.layout.shaderpacks_dir(),
                &manifest.shaders,
                game_version,
            )
            .await?;
        }

        info!(
            "Package sync: {} downloaded, {} skipped, {} failed, {} removed, {} unresolved",
            summary.downloaded, summary.skipped, summary.failed, summary.removed, summary.unresolved
        );
        progress.emit("All synced!", 100);
        Ok(summary)
    }
}
