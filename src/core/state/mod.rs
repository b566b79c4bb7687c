mod app_state;
mod layout;

pub use app_state::{default_data_dir, AppState, Endpoints, LauncherSettings, DATA_DIR_ENV};
pub use layout::GameLayout;
