use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::batch::{BatchReport, BatchScheduler};
use super::digest::Digest;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Fetcher;

/// A single file to download with an optional digest for validation.
#[derive(Debug, Clone)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub digest: Option<Digest>,
}

impl DownloadEntry {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            digest: None,
        }
    }

    pub fn with_digest(mut self, digest: Option<Digest>) -> Self {
        self.digest = digest;
        self
    }
}

/// Digest-validated downloader over the shared fetcher.
#[derive(Debug, Clone)]
pub struct Downloader {
    fetcher: Fetcher,
}

impl Downloader {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    // ── Single file download ────────────────────────────

    /// Download `url` to `dest`, validating the digest when one is given.
    ///
    /// The body is checked in memory before anything touches `dest`, so a bad
    /// transfer never leaves a file behind. A digest mismatch is re-fetched
    /// once before it is reported.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        expected: Option<&Digest>,
    ) -> LauncherResult<u64> {
        match self.fetch_verified(url, dest, expected).await {
            Err(LauncherError::IntegrityMismatch { .. }) => {
                warn!("Digest mismatch for {}, downloading again", url);
                self.fetch_verified(url, dest, expected).await
            }
            other => other,
        }
    }

    pub async fn download_entry(&self, entry: &DownloadEntry) -> LauncherResult<u64> {
        self.download_file(&entry.url, &entry.dest, entry.digest.as_ref())
            .await
    }

    async fn fetch_verified(
        &self,
        url: &str,
        dest: &Path,
        expected: Option<&Digest>,
    ) -> LauncherResult<u64> {
        let bytes = self.fetcher.get_bytes(url).await?;

        if let Some(digest) = expected {
            digest.verify(&bytes, dest)?;
        }

        write_file(dest, &bytes).await?;
        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(bytes.len() as u64)
    }

    // ── Batch downloads ─────────────────────────────────

    /// Download `entries` through `scheduler`, reporting `(settled, total)` per batch.
    /// A filesystem error ends the run; anything else is recorded per entry.
    pub async fn download_batch<P>(
        &self,
        entries: Vec<DownloadEntry>,
        scheduler: BatchScheduler,
        on_batch: P,
    ) -> LauncherResult<BatchReport<DownloadEntry>>
    where
        P: FnMut(usize, usize),
    {
        info!(
            "Starting batch download: {} files, batch size {}",
            entries.len(),
            scheduler.batch_size()
        );

        scheduler
            .run(
                entries,
                |entry| async move { self.download_entry(&entry).await.map(|_| ()) },
                on_batch,
            )
            .await
    }
}

/// Write `bytes` to `path`, creating parent directories.
///
/// The bytes go to a sibling `.part` file that is renamed over `path` once
/// flushed, so `path` is either absent or complete. The handle is dropped
/// before the rename so this also works on Windows.
pub async fn write_file(path: &Path, bytes: &[u8]) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }

    let staging = staging_path(path);
    if let Err(e) = write_staged(&staging, bytes).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(LauncherError::io(path, e));
    }
    Ok(())
}

async fn write_staged(staging: &Path, bytes: &[u8]) -> LauncherResult<()> {
    let mut file = tokio::fs::File::create(staging)
        .await
        .map_err(|e| LauncherError::io(staging, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| LauncherError::io(staging, e))?;
    file.flush().await.map_err(|e| LauncherError::io(staging, e))?;
    file.sync_all()
        .await
        .map_err(|e| LauncherError::io(staging, e))?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.part", uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn names_in(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut read = tokio::fs::read_dir(dir).await.unwrap();
        while let Some(entry) = read.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }

    #[tokio::test]
    async fn write_replaces_content_and_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libs").join("a.jar");

        write_file(&dest, b"first").await.unwrap();
        write_file(&dest, b"second").await.unwrap();

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"second");
        assert_eq!(names_in(&dest.parent().unwrap()).await, vec!["a.jar"]);
    }

    #[tokio::test]
    async fn failed_write_leaves_nothing_at_the_destination() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the final rename fail.
        let dest = dir.path().join("a.jar");
        tokio::fs::create_dir(&dest).await.unwrap();
        tokio::fs::write(dest.join("inner"), b"x").await.unwrap();

        let err = write_file(&dest, b"payload").await.unwrap_err();
        assert!(matches!(err, LauncherError::Io { .. }));
        assert!(dest.is_dir());
        assert_eq!(names_in(dir.path()).await, vec!["a.jar"]);
    }

    #[tokio::test]
    async fn digest_mismatch_never_creates_the_file() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"short".to_vec()))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("client.jar");
        let expected = Digest::Sha1("0".repeat(40));

        let downloader = Downloader::new(Fetcher::new(&Default::default()).unwrap());
        let err = downloader
            .download_file(&format!("{}/client.jar", server.uri()), &dest, Some(&expected))
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::IntegrityMismatch { .. }));
        assert!(names_in(dir.path()).await.is_empty());
    }
}
