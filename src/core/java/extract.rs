use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};

/// Archive formats runtime providers ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Guess from a file name or URL; `None` when the suffix says nothing.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else {
            None
        }
    }

    /// What the provider ships for a platform when nothing else says.
    pub fn for_os(os: &str) -> Self {
        if os == "windows" {
            ArchiveKind::Zip
        } else {
            ArchiveKind::TarGz
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
        }
    }
}

/// Unpack `archive` into `dest`, keeping the archive's own directory layout.
///
/// Returns the top-level names the archive produced. Entries escaping `dest`
/// are rejected.
pub fn extract_archive(
    archive: &Path,
    kind: ArchiveKind,
    dest: &Path,
) -> LauncherResult<BTreeSet<String>> {
    std::fs::create_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;
    match kind {
        ArchiveKind::Zip => extract_zip(archive, dest),
        ArchiveKind::TarGz => extract_tar_gz(archive, dest),
    }
}

fn extract_zip(archive: &Path, dest: &Path) -> LauncherResult<BTreeSet<String>> {
    let file = File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut roots = BTreeSet::new();

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(LauncherError::Other(format!(
                "Unsafe zip entry: {}",
                entry.name()
            )));
        };
        if let Some(root) = top_level(&relative) {
            roots.insert(root);
        }

        let out_path = dest.join(&relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }

        let mut out = File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
                .map_err(|e| LauncherError::io(&out_path, e))?;
        }
    }

    Ok(roots)
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> LauncherResult<BTreeSet<String>> {
    let file = File::open(archive).map_err(|e| LauncherError::io(archive, e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));
    tar.set_preserve_permissions(true);
    let mut roots = BTreeSet::new();

    let entries = tar.entries().map_err(|e| LauncherError::io(archive, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| LauncherError::io(archive, e))?;
        let relative = entry
            .path()
            .map_err(|e| LauncherError::io(archive, e))?
            .into_owned();
        if let Some(root) = top_level(&relative) {
            roots.insert(root);
        }
        // `unpack_in` refuses entries that would land outside `dest`.
        let inside = entry
            .unpack_in(dest)
            .map_err(|e| LauncherError::io(dest.join(&relative), e))?;
        if !inside {
            return Err(LauncherError::Other(format!(
                "Unsafe tar entry: {}",
                relative.display()
            )));
        }
    }

    Ok(roots)
}

fn top_level(relative: &Path) -> Option<String> {
    relative.components().find_map(|c| match c {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    })
}

/// First extracted root that looks like a runtime home (`jdk-*` or `jre-*`).
pub fn runtime_home_name(roots: &BTreeSet<String>) -> Option<&str> {
    roots
        .iter()
        .map(String::as_str)
        .find(|name| is_runtime_dir_name(name))
}

pub fn is_runtime_dir_name(name: &str) -> bool {
    name.starts_with("jdk-") || name.starts_with("jre-")
}

pub(crate) fn staging_path(root: &Path, kind: ArchiveKind) -> PathBuf {
    root.join("temp")
        .join(format!("{}.{}", uuid::Uuid::new_v4(), kind.extension()))
}
