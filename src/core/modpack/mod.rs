pub mod cache;
pub mod inventory;
pub mod manifest;
pub mod registry;
pub mod shaders;
pub mod sync;

pub use cache::ResolutionCache;
pub use inventory::{installed_packages, InventoryFile, LocalInventory};
pub use manifest::{InstallManifest, PackageReference, ShaderReference};
pub use registry::{ModrinthClient, PackageRegistry, ResolvedArtifact};
pub use shaders::{superseded_files, ShaderSyncSummary};
pub use sync::{PackageSynchronizer, PackageSyncSummary, SyncOptions};
