pub mod classpath;
pub mod plan;
pub mod task;

pub use classpath::{build_classpath, classpath_entries, classpath_separator};
pub use plan::{LaunchContext, LaunchInvocation, LaunchPlanBuilder, RamConfig};
pub use task::launch;
