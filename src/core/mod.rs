// ─── Yonix Core ───
// Install and sync engine for a manifest-driven Minecraft setup.
//
// Architecture:
//   core/
//     http        Shared fetcher: pooled client, timeouts, retry
//     downloader/ Digest checks, batch scheduling, verified writes
//     version/    Mojang catalog + version documents + installation plan
//     loaders/    Fabric / Quilt launcher profiles
//     maven/      Coordinate parsing and repository paths
//     java/       Runtime probe, providers, archive extraction, provisioning
//     assets/     Asset index + library/asset synchronization
//     modpack/    Install manifest, registry, cache, package sync
//     launch/     Classpath, JVM command line, process spawn
//     updater/    Release-asset updater
//     state/      Data-dir layout and settings

pub mod assets;
pub mod auth;
pub mod downloader;
pub mod error;
pub mod http;
pub mod java;
pub mod launch;
pub mod loaders;
pub mod maven;
pub mod modpack;
pub mod progress;
pub mod state;
pub mod updater;
pub mod version;
