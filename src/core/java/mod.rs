pub mod extract;
pub mod probe;
pub mod runtime;
pub mod source;

pub use probe::{probe_java, JavaInstallation};
pub use runtime::RuntimeProvisioner;
pub use source::{RuntimeDownload, RuntimePlatform, RuntimeSource};
