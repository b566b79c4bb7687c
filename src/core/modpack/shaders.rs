// Shader packs are zip files in shaderpacks/. A new release replaces older
// files that share its name stem (everything before the first "_v").

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::manifest::ShaderReference;
use super::registry::PackageRegistry;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShaderSyncSummary {
    pub downloaded: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Files in `listing` superseded by `new_name`.
pub fn superseded_files<'a>(listing: &'a [String], new_name: &str) -> Vec<&'a str> {
    let stem = new_name.split("_v").next().unwrap_or(new_name);
    if stem.is_empty() {
        return Vec::new();
    }
    listing
        .iter()
        .map(String::as_str)
        .filter(|name| name.starts_with(stem) && *name != new_name)
        .collect()
}

pub(crate) async fn sync_shaders(
    registry: &dyn PackageRegistry,
    downloader: &Downloader,
    dir: &Path,
    shaders: &[ShaderReference],
    game_version: &str,
) -> LauncherResult<ShaderSyncSummary> {
    let mut summary = ShaderSyncSummary::default();
    let wanted: Vec<&ShaderReference> = shaders.iter().filter(|s| s.is_from_registry()).collect();
    if wanted.is_empty() {
        return Ok(summary);
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| LauncherError::io(dir, e))?;

    for shader in wanted {
        let artifact = match registry.resolve(&shader.id, game_version, None, None).await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                warn!("Shader {} has no downloadable release", shader.id);
                summary.failed += 1;
                continue;
            }
            Err(e) => {
                warn!("Could not resolve shader {}: {}", shader.id, e);
                summary.failed += 1;
                continue;
            }
        };

        let listing = list_file_names(dir).await?;
        for old in superseded_files(&listing, &artifact.file_name) {
            let path = dir.join(old);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!("Removed old shader pack: {}", old);
                    summary.removed += 1;
                }
                Err(e) => warn!("Could not remove old shader pack {:?}: {}", path, e),
            }
        }

        let dest = dir.join(&artifact.file_name);
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            summary.skipped += 1;
            continue;
        }

        let digest = artifact.digest();
        match downloader
            .download_file(&artifact.download_url, &dest, digest.as_ref())
            .await
        {
            Ok(_) => {
                info!("Downloaded shader pack: {}", artifact.file_name);
                summary.downloaded += 1;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Failed to download shader {}: {}", shader.id, e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

async fn list_file_names(dir: &Path) -> LauncherResult<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| LauncherError::io(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| LauncherError::io(dir, e))?
    {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}
