use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::layout::GameLayout;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{Fetcher, HttpSettings};

const APP_DIR_NAME: &str = ".yonix-launcher";
pub const DATA_DIR_ENV: &str = "YONIX_DATA_DIR";

/// Base URLs of every remote catalog. Overridable for mirrors and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Endpoints {
    pub version_manifest: String,
    pub libraries: String,
    pub resources: String,
    pub fabric_meta: String,
    pub quilt_meta: String,
    pub modrinth_api: String,
    pub adoptium_api: String,
    pub github_api: String,
    /// `owner/repo` whose releases feed the updater.
    pub release_repo: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            version_manifest: "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json"
                .into(),
            libraries: "https://libraries.minecraft.net/".into(),
            resources: "https://resources.download.minecraft.net".into(),
            fabric_meta: "https://meta.fabricmc.net/v2".into(),
            quilt_meta: "https://meta.quiltmc.org/v3".into(),
            modrinth_api: "https://api.modrinth.com/v2".into(),
            adoptium_api: "https://api.adoptium.net/v3".into(),
            github_api: "https://api.github.com".into(),
            release_repo: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    pub ram_gb: u32,
    /// Delete mods the install manifest no longer declares.
    pub remove_undeclared: bool,
    pub java_path: Option<PathBuf>,
    pub endpoints: Endpoints,
    pub http: HttpSettings,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            ram_gb: 4,
            remove_undeclared: true,
            java_path: None,
            endpoints: Endpoints::default(),
            http: HttpSettings::default(),
        }
    }
}

/// Everything one installation run needs, built once and passed down.
#[derive(Debug, Clone)]
pub struct AppState {
    pub layout: GameLayout,
    pub settings: LauncherSettings,
    pub fetcher: Fetcher,
    pub downloader: Downloader,
}

impl AppState {
    /// Open `data_dir`, creating it if needed, and load its settings file.
    pub fn new(data_dir: PathBuf) -> LauncherResult<Self> {
        std::fs::create_dir_all(&data_dir).map_err(|e| LauncherError::io(&data_dir, e))?;
        let layout = GameLayout::new(data_dir);
        let settings = load_settings_from_disk(&layout.settings_file()).unwrap_or_default();
        Self::with_settings(layout, settings)
    }

    pub fn with_settings(layout: GameLayout, settings: LauncherSettings) -> LauncherResult<Self> {
        let fetcher = Fetcher::new(&settings.http)?;
        let downloader = Downloader::new(fetcher.clone());
        Ok(Self {
            layout,
            settings,
            fetcher,
            downloader,
        })
    }

    pub fn data_dir(&self) -> &Path {
        self.layout.root()
    }

    pub fn save_settings(&self) -> LauncherResult<()> {
        let path = self.layout.settings_file();
        let json = serde_json::to_string_pretty(&self.settings)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(path, e))
    }
}

fn load_settings_from_disk(path: &Path) -> Option<LauncherSettings> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => {
            debug!("Loaded settings from {:?}", path);
            Some(settings)
        }
        Err(e) => {
            warn!("Ignoring unreadable settings file {:?}: {}", path, e);
            None
        }
    }
}

/// `$YONIX_DATA_DIR`, else `<platform data dir>/.yonix-launcher`.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
