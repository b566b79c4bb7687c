use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{parse_json, Fetcher};
use crate::core::state::Endpoints;
use crate::core::version::version_file::read_materialized;

/// Mod loaders whose meta service serves a launcher profile document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    #[default]
    Fabric,
    Quilt,
}

impl LoaderKind {
    /// Name used by the loader's meta service and by package registries.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderKind::Fabric => "fabric",
            LoaderKind::Quilt => "quilt",
        }
    }

    pub fn meta_base<'a>(&self, endpoints: &'a Endpoints) -> &'a str {
        match self {
            LoaderKind::Fabric => &endpoints.fabric_meta,
            LoaderKind::Quilt => &endpoints.quilt_meta,
        }
    }

    /// Version id the profile is materialized under, e.g. `fabric-loader-0.18.0-1.21.1`.
    pub fn version_id(&self, loader_version: &str, game_version: &str) -> String {
        format!("{}-loader-{}-{}", self.as_str(), loader_version, game_version)
    }

    pub fn profile_url(
        &self,
        endpoints: &Endpoints,
        game_version: &str,
        loader_version: &str,
    ) -> String {
        format!(
            "{}/versions/loader/{}/{}/profile/json",
            self.meta_base(endpoints).trim_end_matches('/'),
            game_version,
            loader_version
        )
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoaderKind {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fabric" => Ok(LoaderKind::Fabric),
            "quilt" => Ok(LoaderKind::Quilt),
            other => Err(LauncherError::Other(format!("Unsupported loader: {other}"))),
        }
    }
}

/// Launcher profile served by the loader meta service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderProfile {
    pub id: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    pub main_class: String,
    #[serde(default)]
    pub libraries: Vec<LoaderLibrary>,
    #[serde(default)]
    pub arguments: Option<LoaderArguments>,
}

/// Coordinate-form library: path derives from `name`, URL from `url` + path.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderLibrary {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoaderArguments {
    #[serde(default)]
    pub jvm: Vec<String>,
    #[serde(default)]
    pub game: Vec<String>,
}

impl LoaderProfile {
    /// Fetch the profile for `(game_version, loader_version)`, returning the raw body too.
    ///
    /// The meta service answers 4xx for unknown combinations; that is reported
    /// as `ManifestNotFound`.
    pub async fn fetch(
        fetcher: &Fetcher,
        endpoints: &Endpoints,
        kind: LoaderKind,
        game_version: &str,
        loader_version: &str,
    ) -> LauncherResult<(Self, String)> {
        let url = kind.profile_url(endpoints, game_version, loader_version);
        info!(
            "Fetching {} {} profile for Minecraft {}",
            kind, loader_version, game_version
        );

        let raw = match fetcher.get_text(&url).await {
            Ok(raw) => raw,
            Err(LauncherError::DownloadFailed { status, .. }) if (400..500).contains(&status) => {
                return Err(LauncherError::ManifestNotFound(format!(
                    "{kind} loader {loader_version} for Minecraft {game_version}"
                )));
            }
            Err(e) => return Err(e),
        };

        let profile = Self::parse(&url, &raw)?;
        Ok((profile, raw))
    }

    pub fn parse(source_name: &str, raw: &str) -> LauncherResult<Self> {
        let profile: LoaderProfile = parse_json(source_name, raw)?;
        if profile.main_class.trim().is_empty() {
            return Err(LauncherError::ManifestParse {
                source_name: source_name.to_string(),
                message: "profile has an empty mainClass".into(),
            });
        }
        Ok(profile)
    }

    pub async fn load(path: &Path) -> LauncherResult<Self> {
        let raw = read_materialized(path).await?;
        Self::parse(&path.display().to_string(), &raw)
    }
}
