// ─── Launch Plan ───
// Turns the materialized version documents into a JVM command line.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, instrument};

use super::classpath::{build_classpath, classpath_entries, path_arg};
use crate::core::auth::Identity;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::{LoaderKind, LoaderProfile};
use crate::core::state::{Endpoints, GameLayout};
use crate::core::version::{current_os_name, plan_libraries, VersionJson};

const G1_FLAGS: &[&str] = &[
    "-XX:+UseG1GC",
    "-XX:+ParallelRefProcEnabled",
    "-XX:MaxGCPauseMillis=200",
    "-XX:+UnlockExperimentalVMOptions",
    "-XX:+DisableExplicitGC",
    "-XX:G1NewSizePercent=30",
    "-XX:G1MaxNewSizePercent=40",
    "-XX:G1HeapRegionSize=8M",
    "-XX:G1ReservePercent=20",
    "-XX:G1HeapWastePercent=5",
    "-XX:G1MixedGCCountTarget=4",
    "-XX:InitiatingHeapOccupancyPercent=15",
    "-XX:G1MixedGCLiveThresholdPercent=90",
    "-XX:G1RSetUpdatingPauseTimePercent=5",
    "-XX:SurvivorRatio=32",
    "-XX:+PerfDisableSharedMem",
];

/// What is being launched and with which runtime.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub layout: GameLayout,
    pub game_version: String,
    pub loader: LoaderKind,
    pub loader_version: String,
    pub java: PathBuf,
}

impl LaunchContext {
    pub fn loader_version_id(&self) -> String {
        self.loader
            .version_id(&self.loader_version, &self.game_version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamConfig {
    pub max_gb: u32,
}

impl RamConfig {
    pub fn new(max_gb: u32) -> Self {
        Self {
            max_gb: max_gb.max(1),
        }
    }

    fn memory_args(&self) -> [String; 2] {
        [
            format!("-Xmx{}G", self.max_gb),
            format!("-Xms{}G", (self.max_gb / 2).max(1)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchInvocation {
    pub executable: PathBuf,
    pub arguments: Vec<String>,
    pub working_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LaunchPlanBuilder {
    os: String,
}

impl Default for LaunchPlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchPlanBuilder {
    pub fn new() -> Self {
        Self {
            os: current_os_name().to_string(),
        }
    }

    /// Build for `os` instead of the host (classpath separator and rules).
    pub fn with_platform(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    /// Reads `versions/<loaderId>/<loaderId>.json` and `versions/<game>/<game>.json`;
    /// either missing is `MissingManifest`.
    #[instrument(skip_all, fields(game = %ctx.game_version, loader = %ctx.loader))]
    pub async fn build(
        &self,
        ctx: &LaunchContext,
        identity: &Identity,
        ram: RamConfig,
    ) -> LauncherResult<LaunchInvocation> {
        let layout = &ctx.layout;
        let loader_id = ctx.loader_version_id();
        let loader = LoaderProfile::load(&layout.version_json(&loader_id)).await?;
        let game = VersionJson::load(&layout.version_json(&ctx.game_version)).await?;

        let asset_index = game
            .asset_index
            .as_ref()
            .map(|a| a.id.clone())
            .ok_or_else(|| LauncherError::ManifestParse {
                source_name: ctx.game_version.clone(),
                message: "version document has no assetIndex".into(),
            })?;

        let libraries = plan_libraries(&loader, &game, &Endpoints::default().libraries)?;
        let entries = classpath_entries(layout, &ctx.game_version, &libraries, &self.os);
        let classpath = build_classpath(&entries, &self.os);
        debug!("Classpath has {} entries", entries.len());

        let mut arguments: Vec<String> = ram.memory_args().into();
        arguments.extend(G1_FLAGS.iter().map(|f| f.to_string()));
        arguments.push(format!(
            "-Djava.library.path={}",
            path_arg(&layout.natives_dir())
        ));
        arguments.push("-cp".into());
        arguments.push(classpath);
        arguments.push(loader.main_class.clone());

        let game_args = [
            ("--username", identity.display_name.clone()),
            ("--version", loader_id),
            ("--gameDir", path_arg(layout.root())),
            ("--assetsDir", path_arg(&layout.assets_dir())),
            ("--assetIndex", asset_index),
            ("--uuid", identity.compact_id()),
            (
                "--accessToken",
                identity
                    .credential
                    .clone()
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| "0".into()),
            ),
            ("--userType", identity.kind.user_type().to_string()),
            ("--versionType", "release".to_string()),
        ];
        for (flag, value) in game_args {
            arguments.push(flag.to_string());
            arguments.push(value);
        }

        Ok(LaunchInvocation {
            executable: ctx.java.clone(),
            arguments,
            working_dir: layout.root().to_path_buf(),
        })
    }
}
