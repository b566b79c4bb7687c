use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryFile {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Snapshot of the package files currently in a directory.
#[derive(Debug, Clone, Default)]
pub struct LocalInventory {
    files: Vec<InventoryFile>,
}

impl LocalInventory {
    /// Read every regular file in `dir` with the given extension. A missing
    /// directory is an empty inventory.
    pub async fn scan(dir: &Path, extension: &str) -> LauncherResult<Self> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(LauncherError::io(dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LauncherError::io(dir, e))?
        {
            let path = entry.path();
            let matches_ext = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if !matches_ext {
                continue;
            }
            let meta = entry
                .metadata()
                .await
                .map_err(|e| LauncherError::io(&path, e))?;
            if !meta.is_file() {
                continue;
            }
            files.push(InventoryFile {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size: meta.len(),
            });
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(Self { files })
    }

    pub fn files(&self) -> &[InventoryFile] {
        &self.files
    }

    /// Files whose names are not in `declared`.
    pub fn undeclared<'a>(
        &'a self,
        declared: &'a HashSet<String>,
    ) -> impl Iterator<Item = &'a InventoryFile> {
        self.files
            .iter()
            .filter(move |f| !declared.contains(&f.file_name))
    }
}

/// Installed package jars, sorted by file name.
pub async fn installed_packages(mods_dir: &Path) -> LauncherResult<Vec<InventoryFile>> {
    Ok(LocalInventory::scan(mods_dir, "jar").await?.files)
}
