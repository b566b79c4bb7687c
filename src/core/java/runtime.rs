// ─── Runtime Provisioner ───
// Finds a usable Java for the requested major, installing a managed copy when
// nothing on the machine qualifies.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sha2::{Digest as _, Sha256};
use tracing::{debug, info, instrument, warn};

use super::extract::{extract_archive, is_runtime_dir_name, runtime_home_name, staging_path};
use super::probe::{
    ensure_java_executable, is_java_compatible_major, locate_java_binary, probe_java,
    JavaInstallation,
};
use super::source::{RuntimeDownload, RuntimePlatform, RuntimeSource};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Fetcher;
use crate::core::progress::ProgressReporter;
use crate::core::state::{Endpoints, GameLayout};
use crate::core::version::version_file::DEFAULT_JAVA_MAJOR;

/// Archives smaller than this are truncated transfers, not runtimes.
pub const MIN_ARCHIVE_BYTES: u64 = 10 * 1024 * 1024;
const MIN_FREE_DISK_BYTES: u64 = 512 * 1024 * 1024;
const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct RuntimeProvisioner {
    fetcher: Fetcher,
    endpoints: Endpoints,
    layout: GameLayout,
    major: u32,
    platform: RuntimePlatform,
    system_candidate: Option<PathBuf>,
    size_floor: u64,
    progress: ProgressReporter,
}

impl RuntimeProvisioner {
    pub fn new(fetcher: Fetcher, endpoints: Endpoints, layout: GameLayout) -> Self {
        Self {
            fetcher,
            endpoints,
            layout,
            major: DEFAULT_JAVA_MAJOR,
            platform: RuntimePlatform::current(),
            system_candidate: Some(PathBuf::from("java")),
            size_floor: MIN_ARCHIVE_BYTES,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn for_major(mut self, major: u32) -> Self {
        self.major = major;
        self
    }

    /// Binary tried before any managed runtime: `java` on `PATH` by default,
    /// a configured path, or nothing.
    pub fn with_system_candidate(mut self, candidate: Option<PathBuf>) -> Self {
        self.system_candidate = candidate;
        self
    }

    pub fn with_platform(mut self, platform: RuntimePlatform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_size_floor(mut self, bytes: u64) -> Self {
        self.size_floor = bytes;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Path to a Java executable of the requested major.
    ///
    /// Order: system candidate, `runtime/java`, a recorded runtime home,
    /// `runtime/jdk-*`/`jre-*` folders, then download. First hit wins.
    #[instrument(skip(self), fields(major = self.major))]
    pub async fn ensure(&self) -> LauncherResult<PathBuf> {
        self.progress.emit(format!("Checking Java {}...", self.major), 0);

        if let Some(candidate) = &self.system_candidate {
            if let Some(found) = self.usable(candidate).await {
                info!("Using system Java {} at {:?}", found.version, candidate);
                return self.done(candidate.clone());
            }
        }

        if let Some(java) = self.find_installed().await {
            return self.done(java);
        }

        self.install().await?;

        match self.find_installed().await {
            Some(java) => self.done(java),
            None => Err(LauncherError::RuntimeProvisionFailed(format!(
                "no Java {} executable found under {:?} after installation",
                self.major,
                self.layout.runtime_dir()
            ))),
        }
    }

    fn done(&self, java: PathBuf) -> LauncherResult<PathBuf> {
        self.progress.emit(format!("Java {} ready", self.major), 100);
        Ok(java)
    }

    async fn usable(&self, java_bin: &Path) -> Option<JavaInstallation> {
        let found = probe_java(java_bin).await?;
        if is_java_compatible_major(found.major, self.major) {
            Some(found)
        } else {
            debug!("{:?} is Java {}, need {}", java_bin, found.major, self.major);
            None
        }
    }

    async fn usable_home(&self, home: &Path) -> Option<PathBuf> {
        let java = locate_java_binary(home)?;
        self.usable(&java).await.map(|_| java)
    }

    /// Look for an already installed managed runtime.
    async fn find_installed(&self) -> Option<PathBuf> {
        if let Some(java) = self.usable_home(&self.layout.managed_java_home()).await {
            debug!("Managed runtime at {:?}", java);
            return Some(java);
        }

        if let Ok(recorded) = tokio::fs::read_to_string(self.layout.runtime_marker()).await {
            if let Some(java) = self.usable_home(Path::new(recorded.trim())).await {
                debug!("Recorded runtime at {:?}", java);
                return Some(java);
            }
        }

        for home in self.scan_runtime_homes().await {
            if let Some(java) = self.usable_home(&home).await {
                debug!("Found runtime folder {:?}", home);
                return Some(java);
            }
        }
        None
    }

    /// `runtime/` children named `jdk-*` or `jre-*`, in name order.
    async fn scan_runtime_homes(&self) -> Vec<PathBuf> {
        let mut homes = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(self.layout.runtime_dir()).await else {
            return homes;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && is_runtime_dir_name(&name.to_string_lossy()) {
                homes.push(entry.path());
            }
        }
        homes.sort();
        homes
    }

    // ── Download + extract + relocate ───────────────────

    async fn install(&self) -> LauncherResult<PathBuf> {
        let runtime_dir = self.layout.runtime_dir();
        tokio::fs::create_dir_all(&runtime_dir)
            .await
            .map_err(|e| LauncherError::io(&runtime_dir, e))?;
        ensure_min_disk_space(&runtime_dir, MIN_FREE_DISK_BYTES)?;

        let mut failures = Vec::new();
        for source in RuntimeSource::CHAIN {
            match self.install_from(source).await {
                Ok(home) => return Ok(home),
                Err(e) => {
                    warn!("Java {} from {} failed: {}", self.major, source, e);
                    failures.push(format!("{source}: {e}"));
                }
            }
        }

        Err(LauncherError::RuntimeProvisionFailed(failures.join("; ")))
    }

    async fn install_from(&self, source: RuntimeSource) -> LauncherResult<PathBuf> {
        let download = source
            .locate(&self.fetcher, &self.endpoints, self.major, &self.platform)
            .await?;
        let archive = staging_path(&self.layout.runtime_dir(), download.archive);

        let result = self.fetch_and_unpack(&download, &archive).await;
        let _ = tokio::fs::remove_file(&archive).await;
        result
    }

    async fn fetch_and_unpack(
        &self,
        download: &RuntimeDownload,
        archive: &Path,
    ) -> LauncherResult<PathBuf> {
        self.progress.emit_with(
            format!("Downloading Java {}...", self.major),
            15,
            download.url.clone(),
        );

        let started = Instant::now();
        let written = self
            .fetcher
            .stream_to_file(&download.url, archive, Some(ARCHIVE_TIMEOUT))
            .await?;
        info!("Runtime download finished in {:?}", started.elapsed());

        if written < self.size_floor {
            return Err(LauncherError::RuntimeProvisionFailed(format!(
                "archive from {} is only {} bytes",
                download.url, written
            )));
        }

        if let Some(expected) = &download.sha256 {
            let actual = sha256_file(archive)?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::IntegrityMismatch {
                    path: archive.to_path_buf(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        self.progress.emit(format!("Extracting Java {}...", self.major), 60);
        let runtime_dir = self.layout.runtime_dir();
        let roots = {
            let archive = archive.to_path_buf();
            let kind = download.archive;
            let dest = runtime_dir.clone();
            tokio::task::spawn_blocking(move || extract_archive(&archive, kind, &dest))
                .await
                .map_err(|e| LauncherError::Other(format!("extraction task failed: {e}")))??
        };

        let name = runtime_home_name(&roots).ok_or_else(|| {
            LauncherError::RuntimeProvisionFailed(format!(
                "archive from {} has no jdk-/jre- folder",
                download.url
            ))
        })?;

        let home = self.relocate(&runtime_dir.join(name)).await?;
        if let Some(java) = locate_java_binary(&home) {
            ensure_java_executable(&java)?;
        }
        Ok(home)
    }

    /// Move the extracted home to `runtime/java`. If that fails the extracted
    /// folder is kept and recorded instead.
    async fn relocate(&self, extracted: &Path) -> LauncherResult<PathBuf> {
        let canonical = self.layout.managed_java_home();
        let marker = self.layout.runtime_marker();

        if tokio::fs::try_exists(&canonical).await.unwrap_or(false) {
            // Present but unusable, or we would not be installing.
            if let Err(e) = tokio::fs::remove_dir_all(&canonical).await {
                debug!("Could not clear {:?}: {}", canonical, e);
            }
        }

        match tokio::fs::rename(extracted, &canonical).await {
            Ok(()) => {
                let _ = tokio::fs::remove_file(&marker).await;
                Ok(canonical)
            }
            Err(e) => {
                warn!(
                    "Could not move {:?} to {:?} ({}), using it in place",
                    extracted, canonical, e
                );
                let recorded = extracted.display().to_string();
                tokio::fs::write(&marker, recorded)
                    .await
                    .map_err(|e| LauncherError::io(&marker, e))?;
                Ok(extracted.to_path_buf())
            }
        }
    }
}

fn sha256_file(path: &Path) -> LauncherResult<String> {
    let mut file = std::fs::File::open(path).map_err(|e| LauncherError::io(path, e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| LauncherError::io(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

fn ensure_min_disk_space(path: &Path, minimum_bytes: u64) -> LauncherResult<()> {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    let mut best_len = 0usize;
    let mut available = None;
    for disk in disks.list() {
        let mount = disk.mount_point();
        if canonical.starts_with(mount) {
            let len = mount.as_os_str().len();
            if len >= best_len {
                best_len = len;
                available = Some(disk.available_space());
            }
        }
    }

    match available {
        Some(bytes) if bytes < minimum_bytes => {
            Err(LauncherError::RuntimeProvisionFailed(format!(
                "not enough disk space for a runtime: {bytes} bytes free, {minimum_bytes} needed"
            )))
        }
        _ => Ok(()),
    }
}
