// ─── Installation Plan ───
// Turns the game-version catalog, the version document and the loader profile
// into one immutable plan: runtime, libraries, asset index, entry point.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::manifest::VersionManifest;
use super::version_file::{rules_allow, LibraryEntry, LibraryRule, VersionJson};
use crate::core::downloader::client::write_file;
use crate::core::downloader::Digest;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Fetcher;
use crate::core::loaders::{LoaderKind, LoaderLibrary, LoaderProfile};
use crate::core::maven::MavenArtifact;
use crate::core::state::{Endpoints, GameLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryOrigin {
    Loader,
    Game,
}

/// One library to place under `libraries/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRef {
    pub logical_name: String,
    /// Relative to the libraries directory; depends only on the ref itself.
    pub relative_path: PathBuf,
    pub source_url: String,
    pub expected_digest: Option<Digest>,
    pub rules: Vec<LibraryRule>,
    pub origin: LibraryOrigin,
}

impl LibraryRef {
    /// Direct-artifact form: explicit path, URL and digest.
    pub fn from_artifact(
        name: &str,
        path: &str,
        url: &str,
        sha1: Option<&str>,
        rules: Vec<LibraryRule>,
        origin: LibraryOrigin,
    ) -> Self {
        Self {
            logical_name: name.to_string(),
            relative_path: path.split('/').collect(),
            source_url: url.to_string(),
            expected_digest: sha1.map(|h| Digest::Sha1(h.to_string())),
            rules,
            origin,
        }
    }

    /// Coordinate form: path from the Maven layout, URL from `base` + path.
    pub fn from_coordinate(
        coordinate: &str,
        base: &str,
        sha1: Option<&str>,
        rules: Vec<LibraryRule>,
        origin: LibraryOrigin,
    ) -> LauncherResult<Self> {
        let artifact = MavenArtifact::parse(coordinate)?;
        Ok(Self {
            logical_name: coordinate.to_string(),
            relative_path: artifact.local_path(),
            source_url: artifact.url(base),
            expected_digest: sha1.map(|h| Digest::Sha1(h.to_string())),
            rules,
            origin,
        })
    }

    fn from_loader_library(lib: &LoaderLibrary, default_base: &str) -> LauncherResult<Self> {
        let base = lib.url.as_deref().unwrap_or(default_base);
        Self::from_coordinate(
            &lib.name,
            base,
            lib.sha1.as_deref(),
            Vec::new(),
            LibraryOrigin::Loader,
        )
    }

    /// `None` for entries that carry neither an artifact nor a usable coordinate
    /// (natives-only entries of old versions).
    fn from_game_library(
        entry: &LibraryEntry,
        default_base: &str,
    ) -> LauncherResult<Option<Self>> {
        match &entry.downloads {
            Some(downloads) => Ok(downloads.artifact.as_ref().map(|a| {
                Self::from_artifact(
                    &entry.name,
                    &a.path,
                    &a.url,
                    a.sha1.as_deref(),
                    entry.rules.clone(),
                    LibraryOrigin::Game,
                )
            })),
            None => {
                let base = entry.url.as_deref().unwrap_or(default_base);
                Self::from_coordinate(
                    &entry.name,
                    base,
                    None,
                    entry.rules.clone(),
                    LibraryOrigin::Game,
                )
                .map(Some)
            }
        }
    }

    pub fn is_allowed_for(&self, os: &str) -> bool {
        rules_allow(&self.rules, os)
    }
}

/// Loader libraries, then game libraries, in document order and without
/// dedup. `libraries_base` only feeds source URLs; local paths never depend on it.
pub fn plan_libraries(
    profile: &LoaderProfile,
    game: &VersionJson,
    libraries_base: &str,
) -> LauncherResult<Vec<LibraryRef>> {
    let mut libraries = Vec::with_capacity(profile.libraries.len() + game.libraries.len());
    for lib in &profile.libraries {
        libraries.push(LibraryRef::from_loader_library(lib, libraries_base)?);
    }
    for entry in &game.libraries {
        match LibraryRef::from_game_library(entry, libraries_base)? {
            Some(lib) => libraries.push(lib),
            None => debug!("No artifact for {}, skipped", entry.name),
        }
    }
    Ok(libraries)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeDescriptor {
    pub component: String,
    pub major_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    pub digest: Option<Digest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientArtifact {
    pub url: String,
    pub digest: Option<Digest>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArgumentTemplate {
    pub jvm: Vec<String>,
    pub game: Vec<String>,
}

/// Resolved installation for one `(game, loader)` pair. Never mutated once built;
/// a different target version means a new plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationPlan {
    pub game_version: String,
    pub loader: LoaderKind,
    pub loader_version: String,
    /// Id the loader profile is materialized under.
    pub loader_version_id: String,
    pub runtime: RuntimeDescriptor,
    /// Loader libraries first, then game libraries. Not deduplicated.
    pub libraries: Vec<LibraryRef>,
    pub asset_index: AssetIndexRef,
    pub client: Option<ClientArtifact>,
    pub main_class: String,
    pub arguments: ArgumentTemplate,
}

impl InstallationPlan {
    /// Assemble a plan from already parsed documents. No I/O.
    pub fn assemble(
        game_version: &str,
        game: &VersionJson,
        loader: LoaderKind,
        loader_version: &str,
        profile: &LoaderProfile,
        libraries_base: &str,
    ) -> LauncherResult<Self> {
        let asset_index = game
            .asset_index
            .as_ref()
            .ok_or_else(|| LauncherError::ManifestParse {
                source_name: format!("Minecraft {game_version}"),
                message: "version document has no assetIndex".into(),
            })?;

        let libraries = plan_libraries(profile, game, libraries_base)?;

        let loader_args = profile.arguments.clone().unwrap_or_default();
        let mut arguments = ArgumentTemplate {
            jvm: game.simple_jvm_args(),
            game: game.simple_game_args(),
        };
        arguments.jvm.extend(loader_args.jvm);
        arguments.game.extend(loader_args.game);

        Ok(Self {
            game_version: game_version.to_string(),
            loader,
            loader_version: loader_version.to_string(),
            loader_version_id: loader.version_id(loader_version, game_version),
            runtime: RuntimeDescriptor {
                component: game
                    .java_component()
                    .unwrap_or("java-runtime-delta")
                    .to_string(),
                major_version: game.required_java_major(),
            },
            libraries,
            asset_index: AssetIndexRef {
                id: asset_index.id.clone(),
                url: asset_index.url.clone(),
                digest: asset_index.sha1.clone().map(Digest::Sha1),
            },
            client: game.client_download().map(|c| ClientArtifact {
                url: c.url.clone(),
                digest: c.sha1.clone().map(Digest::Sha1),
                size: c.size,
            }),
            main_class: profile.main_class.clone(),
            arguments,
        })
    }

    pub fn libraries_from(&self, origin: LibraryOrigin) -> impl Iterator<Item = &LibraryRef> {
        self.libraries.iter().filter(move |l| l.origin == origin)
    }
}

/// Fetches and materializes the manifest chain for one loader kind.
#[derive(Debug, Clone)]
pub struct ManifestResolver {
    fetcher: Fetcher,
    endpoints: Endpoints,
    layout: GameLayout,
    loader: LoaderKind,
    refresh: bool,
}

impl ManifestResolver {
    pub fn new(fetcher: Fetcher, endpoints: Endpoints, layout: GameLayout) -> Self {
        Self {
            fetcher,
            endpoints,
            layout,
            loader: LoaderKind::Fabric,
            refresh: false,
        }
    }

    pub fn with_loader(mut self, loader: LoaderKind) -> Self {
        self.loader = loader;
        self
    }

    /// Ignore materialized documents and fetch everything again.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Resolve `(game_version, loader_version)` into a plan.
    ///
    /// Both documents are written to `versions/<id>/<id>.json`; later runs read
    /// them back instead of going to the network.
    pub async fn resolve(
        &self,
        game_version: &str,
        loader_version: &str,
    ) -> LauncherResult<InstallationPlan> {
        info!(
            "Resolving Minecraft {} with {} {}",
            game_version, self.loader, loader_version
        );

        let game = self.game_document(game_version).await?;
        let profile = self.loader_profile(game_version, loader_version).await?;

        let plan = InstallationPlan::assemble(
            game_version,
            &game,
            self.loader,
            loader_version,
            &profile,
            &self.endpoints.libraries,
        )?;

        info!(
            "Plan ready: {} libraries, asset index {}, runtime {}",
            plan.libraries.len(),
            plan.asset_index.id,
            plan.runtime.major_version
        );
        Ok(plan)
    }

    async fn game_document(&self, game_version: &str) -> LauncherResult<VersionJson> {
        let path = self.layout.version_json(game_version);
        if !self.refresh {
            if let Some(doc) = reuse(&path, VersionJson::load(&path).await) {
                return Ok(doc);
            }
        }

        let catalog =
            VersionManifest::fetch(&self.fetcher, &self.endpoints.version_manifest).await?;
        let entry = catalog.require_version(game_version)?;
        let raw = self.fetcher.get_text(&entry.url).await?;
        let doc = VersionJson::parse(&entry.url, &raw)?;

        write_file(&path, raw.as_bytes()).await?;
        Ok(doc)
    }

    async fn loader_profile(
        &self,
        game_version: &str,
        loader_version: &str,
    ) -> LauncherResult<LoaderProfile> {
        let loader_id = self.loader.version_id(loader_version, game_version);
        let path = self.layout.version_json(&loader_id);
        if !self.refresh {
            if let Some(profile) = reuse(&path, LoaderProfile::load(&path).await) {
                return Ok(profile);
            }
        }

        let (profile, raw) = LoaderProfile::fetch(
            &self.fetcher,
            &self.endpoints,
            self.loader,
            game_version,
            loader_version,
        )
        .await?;

        write_file(&path, raw.as_bytes()).await?;
        Ok(profile)
    }
}

/// Keep a materialized document only when it loads cleanly.
fn reuse<T>(path: &std::path::Path, loaded: LauncherResult<T>) -> Option<T> {
    match loaded {
        Ok(doc) => {
            debug!("Using materialized {:?}", path);
            Some(doc)
        }
        Err(LauncherError::MissingManifest(_)) => None,
        Err(e) => {
            warn!("Discarding unreadable {:?}: {}", path, e);
            None
        }
    }
}
