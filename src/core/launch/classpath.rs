// ─── Classpath Builder ───
// Loader libraries first, then the game's own libraries, then the client jar.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::state::GameLayout;
use crate::core::version::LibraryRef;

/// Ordered classpath entries. Duplicates are kept in place.
///
/// `libraries` is the plan's list, so every library the synchronizer placed
/// on disk (artifact or coordinate form) lands here under the same path.
pub fn classpath_entries(
    layout: &GameLayout,
    game_version: &str,
    libraries: &[LibraryRef],
    os: &str,
) -> Vec<PathBuf> {
    let libraries_dir = layout.libraries_dir();
    let mut entries = Vec::with_capacity(libraries.len() + 1);

    for lib in libraries {
        if !lib.is_allowed_for(os) {
            debug!("Classpath skips {} on {}", lib.logical_name, os);
            continue;
        }
        entries.push(libraries_dir.join(&lib.relative_path));
    }

    entries.push(layout.client_jar(game_version));
    entries
}

pub fn build_classpath(entries: &[PathBuf], os: &str) -> String {
    entries
        .iter()
        .map(|p| path_arg(p))
        .collect::<Vec<_>>()
        .join(classpath_separator(os))
}

pub fn classpath_separator(os: &str) -> &'static str {
    if os == "windows" {
        ";"
    } else {
        ":"
    }
}

/// Path as handed to the JVM.
pub fn path_arg(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();

    // Java does not understand extended-length paths.
    #[cfg(target_os = "windows")]
    {
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}
