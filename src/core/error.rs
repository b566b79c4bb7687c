use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Installation stage a fatal error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Runtime,
    Manifest,
    Client,
    Libraries,
    Assets,
    Packages,
    Launch,
    Update,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Runtime => "runtime provisioning",
            Stage::Manifest => "manifest resolution",
            Stage::Client => "client download",
            Stage::Libraries => "library sync",
            Stage::Assets => "asset sync",
            Stage::Packages => "package sync",
            Stage::Launch => "launch",
            Stage::Update => "release update",
        };
        f.write_str(name)
    }
}

/// Central error type for the entire launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network error for {url} after {attempts} attempts: {message}")]
    NetworkTransient {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("Digest mismatch for {path:?}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Manifests ───────────────────────────────────────
    #[error("Manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("Manifest parse error in {source_name}: {message}")]
    ManifestParse {
        source_name: String,
        message: String,
    },

    #[error("Missing manifest {0:?}: run the install stages first")]
    MissingManifest(PathBuf),

    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Runtime ─────────────────────────────────────────
    #[error("Runtime provisioning failed: {0}")]
    RuntimeProvisionFailed(String),

    // ── Registry ────────────────────────────────────────
    #[error("Could not resolve package {id}: {message}")]
    RegistryResolutionFailed { id: String, message: String },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Stage wrapper ───────────────────────────────────
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<LauncherError>,
    },

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl LauncherError {
    /// Attribute this error to a stage. Already-attributed errors keep their stage.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            LauncherError::Stage { .. } => self,
            other => LauncherError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }

    /// Filesystem failures abort the whole stage instead of counting against one item.
    pub fn is_fatal(&self) -> bool {
        match self {
            LauncherError::Io { .. } => true,
            LauncherError::Stage { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Extension for attaching a stage to a `LauncherResult`.
pub trait StageExt<T> {
    fn stage(self, stage: Stage) -> LauncherResult<T>;
}

impl<T> StageExt<T> for LauncherResult<T> {
    fn stage(self, stage: Stage) -> LauncherResult<T> {
        self.map_err(|e| e.in_stage(stage))
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// Rendered as a plain message for JSON consumers of command results.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
