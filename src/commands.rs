// ─── Command Surface ───
// CLI definitions and the orchestration behind each subcommand.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::core::assets::{LibraryAssetSynchronizer, SyncReport};
use crate::core::auth::Identity;
use crate::core::error::{LauncherError, LauncherResult, Stage, StageExt};
use crate::core::java::RuntimeProvisioner;
use crate::core::launch::{self, LaunchContext, LaunchPlanBuilder, RamConfig};
use crate::core::loaders::LoaderKind;
use crate::core::modpack::{
    installed_packages, InstallManifest, ModrinthClient, PackageSyncSummary, PackageSynchronizer,
    SyncOptions,
};
use crate::core::progress::ProgressReporter;
use crate::core::state::{default_data_dir, AppState, DATA_DIR_ENV};
use crate::core::updater::ReleaseUpdater;
use crate::core::version::{InstallationPlan, ManifestResolver};

/// Yonix - install, sync and launch a modded Minecraft setup
#[derive(Parser, Debug)]
#[command(name = "yonix", author, version)]
pub struct Cli {
    /// Data directory (defaults to the platform data dir)
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every install stage for a manifest
    Install(InstallArgs),

    /// Bring mods/ and shaderpacks/ in line with a manifest
    Sync(SyncArgs),

    /// Print the installation plan for a game and loader version
    Plan(PlanArgs),

    /// Build the launch command and run the game
    Launch(LaunchArgs),

    /// List installed mod files
    List,

    /// Compare the latest release with the local version marker
    UpdateCheck(UpdateArgs),

    /// Download the latest release assets
    Update(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct ManifestArg {
    /// Install manifest: local path or http(s) URL
    #[arg(long, short = 'm')]
    pub manifest: String,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub source: ManifestArg,

    /// Fetch version documents again even if they are on disk
    #[arg(long)]
    pub refresh: bool,

    /// Keep mods the manifest no longer declares
    #[arg(long)]
    pub keep_undeclared: bool,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub source: ManifestArg,

    #[arg(long)]
    pub keep_undeclared: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[arg(long)]
    pub game: String,

    #[arg(long)]
    pub loader_version: String,

    #[arg(long, default_value = "fabric")]
    pub loader: LoaderKind,
}

#[derive(Args, Debug)]
pub struct LaunchArgs {
    #[command(flatten)]
    pub source: ManifestArg,

    /// Offline player name
    #[arg(long, short = 'u')]
    pub username: String,

    /// Heap size in GB (defaults to the saved setting)
    #[arg(long)]
    pub ram: Option<u32>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// `owner/repo` (defaults to the configured release repository)
    #[arg(long)]
    pub repo: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallSummary {
    pub java: PathBuf,
    pub client_downloaded: bool,
    pub libraries: SyncReport,
    pub assets: SyncReport,
    pub packages: PackageSyncSummary,
}

pub async fn execute(cli: Cli) -> LauncherResult<()> {
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let state = AppState::new(data_dir)?;
    info!("Data directory: {:?}", state.data_dir());

    match cli.command {
        Commands::Install(args) => {
            let manifest = InstallManifest::load(&args.source.manifest, &state.fetcher)
                .await
                .stage(Stage::Manifest)?;
            let options = sync_options(&state, args.keep_undeclared);
            let summary = install(&state, &manifest, args.refresh, options).await?;
            print_json(&summary)
        }
        Commands::Sync(args) => {
            let manifest = InstallManifest::load(&args.source.manifest, &state.fetcher)
                .await
                .stage(Stage::Manifest)?;
            let summary = package_synchronizer(&state)
                .sync(&manifest, sync_options(&state, args.keep_undeclared))
                .await
                .stage(Stage::Packages)?;
            print_json(&summary)
        }
        Commands::Plan(args) => {
            let plan = resolver(&state, args.loader, false)
                .resolve(&args.game, &args.loader_version)
                .await
                .stage(Stage::Manifest)?;
            print_json(&plan)
        }
        Commands::Launch(args) => {
            let manifest = InstallManifest::load(&args.source.manifest, &state.fetcher)
                .await
                .stage(Stage::Manifest)?;
            let identity = Identity::offline(&args.username)?;
            let ram = RamConfig::new(args.ram.unwrap_or(state.settings.ram_gb));
            let code = play(&state, &manifest, &identity, ram).await?;
            info!("Game exited with code {:?}", code);
            Ok(())
        }
        Commands::List => print_json(&installed_packages(&state.layout.mods_dir()).await?),
        Commands::UpdateCheck(args) => {
            let check = updater(&state, args.repo)?
                .check_for_updates()
                .await
                .stage(Stage::Update)?;
            print_json(&check)
        }
        Commands::Update(args) => {
            let updater = updater(&state, args.repo)?;
            let check = updater.check_for_updates().await.stage(Stage::Update)?;
            match check.assets {
                Some(assets) if check.has_updates => {
                    updater
                        .download_assets(&assets)
                        .await
                        .stage(Stage::Update)?;
                    info!(
                        "Updated to {}",
                        check.latest_version.as_deref().unwrap_or("unknown")
                    );
                }
                _ => info!("Already up to date"),
            }
            Ok(())
        }
    }
}

/// Resolve, provision the runtime, then fetch client, libraries, assets and
/// packages. Any stage error aborts with that stage attached.
pub async fn install(
    state: &AppState,
    manifest: &InstallManifest,
    refresh: bool,
    options: SyncOptions,
) -> LauncherResult<InstallSummary> {
    let progress = ProgressReporter::silent();

    let plan = resolver(state, manifest.loader, refresh)
        .resolve(&manifest.minecraft_version, &manifest.loader_version)
        .await
        .stage(Stage::Manifest)?;

    let java = runtime_provisioner(state, &plan)
        .with_progress(progress.clone())
        .ensure()
        .await
        .stage(Stage::Runtime)?;

    let synchronizer = LibraryAssetSynchronizer::new(
        state.downloader.clone(),
        state.layout.clone(),
        &state.settings.endpoints,
    )
    .with_progress(progress.clone());

    let client_downloaded = synchronizer
        .sync_client(&plan)
        .await
        .stage(Stage::Client)?;
    let libraries = synchronizer
        .sync_libraries(&plan)
        .await
        .stage(Stage::Libraries)?;
    let assets = synchronizer
        .sync_assets(&plan.asset_index)
        .await
        .stage(Stage::Assets)?;

    let packages = package_synchronizer(state)
        .with_progress(progress)
        .sync(manifest, options)
        .await
        .stage(Stage::Packages)?;

    Ok(InstallSummary {
        java,
        client_downloaded,
        libraries,
        assets,
        packages,
    })
}

async fn play(
    state: &AppState,
    manifest: &InstallManifest,
    identity: &Identity,
    ram: RamConfig,
) -> LauncherResult<Option<i32>> {
    let plan = resolver(state, manifest.loader, false)
        .resolve(&manifest.minecraft_version, &manifest.loader_version)
        .await
        .stage(Stage::Manifest)?;
    let java = runtime_provisioner(state, &plan)
        .ensure()
        .await
        .stage(Stage::Runtime)?;

    let ctx = LaunchContext {
        layout: state.layout.clone(),
        game_version: plan.game_version.clone(),
        loader: plan.loader,
        loader_version: plan.loader_version.clone(),
        java,
    };
    let invocation = LaunchPlanBuilder::new()
        .build(&ctx, identity, ram)
        .await
        .stage(Stage::Launch)?;
    let status = launch::launch(&invocation).await.stage(Stage::Launch)?;
    Ok(status.code())
}

fn resolver(state: &AppState, loader: LoaderKind, refresh: bool) -> ManifestResolver {
    ManifestResolver::new(
        state.fetcher.clone(),
        state.settings.endpoints.clone(),
        state.layout.clone(),
    )
    .with_loader(loader)
    .with_refresh(refresh)
}

fn runtime_provisioner(state: &AppState, plan: &InstallationPlan) -> RuntimeProvisioner {
    let system = state
        .settings
        .java_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("java"));
    RuntimeProvisioner::new(
        state.fetcher.clone(),
        state.settings.endpoints.clone(),
        state.layout.clone(),
    )
    .for_major(plan.runtime.major_version)
    .with_system_candidate(Some(system))
}

fn package_synchronizer(state: &AppState) -> PackageSynchronizer {
    let registry = ModrinthClient::new(
        state.fetcher.clone(),
        state.settings.endpoints.modrinth_api.clone(),
    );
    PackageSynchronizer::new(
        Arc::new(registry),
        state.downloader.clone(),
        state.layout.clone(),
    )
}

fn updater(state: &AppState, repo: Option<String>) -> LauncherResult<ReleaseUpdater> {
    let repo = repo
        .or_else(|| state.settings.endpoints.release_repo.clone())
        .ok_or_else(|| {
            LauncherError::Other("No release repository configured (use --repo owner/repo)".into())
        })?;
    Ok(ReleaseUpdater::new(
        state.fetcher.clone(),
        &state.settings.endpoints.github_api,
        &repo,
        state.layout.clone(),
    ))
}

fn sync_options(state: &AppState, keep_undeclared: bool) -> SyncOptions {
    SyncOptions {
        remove_undeclared: state.settings.remove_undeclared && !keep_undeclared,
    }
}

fn print_json<T: Serialize>(value: &T) -> LauncherResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
