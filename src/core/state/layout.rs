use std::path::{Path, PathBuf};

/// On-disk layout of the game directory. Every durable artifact lives under `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLayout {
    root: PathBuf,
}

impl GameLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ── Versions ────────────────────────────────────────

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    /// `versions/<id>/<id>.json`
    pub fn version_json(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id).join(format!("{id}.json"))
    }

    /// `versions/<id>/<id>.jar`
    pub fn client_jar(&self, id: &str) -> PathBuf {
        self.versions_dir().join(id).join(format!("{id}.jar"))
    }

    // ── Shared caches ───────────────────────────────────

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn asset_index(&self, id: &str) -> PathBuf {
        self.assets_dir().join("indexes").join(format!("{id}.json"))
    }

    pub fn natives_dir(&self) -> PathBuf {
        self.root.join("natives")
    }

    // ── Runtime ─────────────────────────────────────────

    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join("runtime")
    }

    /// Canonical home of the managed runtime.
    pub fn managed_java_home(&self) -> PathBuf {
        self.runtime_dir().join("java")
    }

    /// Records a runtime home that could not be moved to the canonical place.
    pub fn runtime_marker(&self) -> PathBuf {
        self.runtime_dir().join("active-runtime.txt")
    }

    // ── Packages ────────────────────────────────────────

    pub fn mods_dir(&self) -> PathBuf {
        self.root.join("mods")
    }

    pub fn shaderpacks_dir(&self) -> PathBuf {
        self.root.join("shaderpacks")
    }

    pub fn resolution_cache(&self) -> PathBuf {
        self.root.join("modpack-cache.json")
    }

    pub fn version_marker(&self) -> PathBuf {
        self.root.join("version.json")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join("launcher_settings.json")
    }
}
