pub mod manifest;
pub mod plan;
pub mod version_file;

pub use manifest::{VersionEntry, VersionManifest};
pub use plan::{
    plan_libraries, ArgumentTemplate, AssetIndexRef, ClientArtifact, InstallationPlan,
    LibraryOrigin, LibraryRef, ManifestResolver, RuntimeDescriptor,
};
pub use version_file::{
    current_os_name, rules_allow, LibraryEntry, LibraryRule, RuleAction, VersionJson,
};
