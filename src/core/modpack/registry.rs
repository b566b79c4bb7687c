use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::downloader::Digest;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Fetcher;
use crate::core::loaders::LoaderKind;

/// A concrete downloadable file chosen for a package reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedArtifact {
    pub id: String,
    pub resolved_version: String,
    pub version_id: String,
    pub file_name: String,
    pub download_url: String,
    #[serde(default)]
    pub sha512: Option<String>,
    #[serde(default)]
    pub size: u64,
}

impl ResolvedArtifact {
    pub fn digest(&self) -> Option<Digest> {
        self.sha512
            .as_ref()
            .filter(|hex| !hex.is_empty())
            .map(|hex| Digest::Sha512(hex.clone()))
    }
}

/// Maps a package id plus compatibility constraints to one artifact.
///
/// `Ok(None)` means the registry has nothing that fits. Transport or format
/// problems come back as `RegistryResolutionFailed`.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    async fn resolve(
        &self,
        id: &str,
        target_version: &str,
        loader: Option<LoaderKind>,
        pinned: Option<&str>,
    ) -> LauncherResult<Option<ResolvedArtifact>>;
}

// ── Modrinth ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProjectVersion {
    id: String,
    version_number: String,
    #[serde(default)]
    files: Vec<VersionFile>,
}

#[derive(Debug, Deserialize)]
struct VersionFile {
    url: String,
    filename: String,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    hashes: FileHashes,
}

#[derive(Debug, Default, Deserialize)]
struct FileHashes {
    sha512: Option<String>,
}

/// Modrinth v2 API client. Versions come back newest first.
#[derive(Debug, Clone)]
pub struct ModrinthClient {
    fetcher: Fetcher,
    api_base: String,
}

impl ModrinthClient {
    pub fn new(fetcher: Fetcher, api_base: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn versions_url(
        &self,
        id: &str,
        loader: Option<LoaderKind>,
        target_version: Option<&str>,
    ) -> LauncherResult<Url> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(loader) = loader {
            params.push(("loaders", format!("[\"{}\"]", loader.as_str())));
        }
        if let Some(version) = target_version {
            params.push(("game_versions", format!("[\"{version}\"]")));
        }

        let base = format!("{}/project/{}/version", self.api_base, id);
        Url::parse_with_params(&base, &params).map_err(|e| {
            LauncherError::RegistryResolutionFailed {
                id: id.to_string(),
                message: format!("bad registry URL {base}: {e}"),
            }
        })
    }

    /// `Ok(None)` when the project does not exist.
    async fn list_versions(
        &self,
        id: &str,
        loader: Option<LoaderKind>,
        target_version: Option<&str>,
    ) -> LauncherResult<Option<Vec<ProjectVersion>>> {
        let url = self.versions_url(id, loader, target_version)?;
        debug!("Querying registry: {}", url);

        match self.fetcher.get_json::<Vec<ProjectVersion>>(url.as_str()).await {
            Ok(versions) => Ok(Some(versions)),
            Err(LauncherError::DownloadFailed { status: 404, .. }) => Ok(None),
            Err(e) => Err(LauncherError::RegistryResolutionFailed {
                id: id.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PackageRegistry for ModrinthClient {
    async fn resolve(
        &self,
        id: &str,
        target_version: &str,
        loader: Option<LoaderKind>,
        pinned: Option<&str>,
    ) -> LauncherResult<Option<ResolvedArtifact>> {
        let listed = self.list_versions(id, loader, Some(target_version)).await?;
        let Some(mut versions) = listed else {
            warn!("Project {} not found on Modrinth", id);
            return Ok(None);
        };

        if versions.is_empty() {
            warn!(
                "No {} versions of {} for Minecraft {}, retrying without the game filter",
                loader.map(|l| l.as_str()).unwrap_or("any"),
                id,
                target_version
            );
            versions = self
                .list_versions(id, loader, None)
                .await?
                .unwrap_or_default();
        }

        let Some(version) = select_version(id, versions, pinned) else {
            return Ok(None);
        };
        Ok(artifact_from(id, version))
    }
}

/// First version equal to or containing the pin, or newest when nothing pins or matches.
fn select_version(
    id: &str,
    versions: Vec<ProjectVersion>,
    pinned: Option<&str>,
) -> Option<ProjectVersion> {
    if let Some(pin) = pinned {
        let position = versions
            .iter()
            .position(|v| v.version_number == pin || v.version_number.contains(pin));
        match position {
            Some(i) => return versions.into_iter().nth(i),
            None => warn!("Version {} of {} not found, using latest", pin, id),
        }
    }
    versions.into_iter().next()
}

fn artifact_from(id: &str, version: ProjectVersion) -> Option<ResolvedArtifact> {
    let ProjectVersion {
        id: version_id,
        version_number,
        files,
    } = version;

    let primary = files.iter().position(|f| f.primary).unwrap_or(0);
    let Some(file) = files.into_iter().nth(primary) else {
        warn!("Version {} of {} has no files", version_number, id);
        return None;
    };

    Some(ResolvedArtifact {
        id: id.to_string(),
        resolved_version: version_number,
        version_id,
        file_name: file.filename,
        download_url: file.url,
        sha512: file.hashes.sha512,
        size: file.size,
    })
}
