use std::fmt;

use serde::Deserialize;
use tracing::debug;

use super::extract::ArchiveKind;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::Fetcher;
use crate::core::state::Endpoints;

/// Provider naming for the running platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePlatform {
    pub os: &'static str,
    pub arch: String,
}

impl RuntimePlatform {
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "windows" => "windows",
            "macos" => "mac",
            _ => "linux",
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "x64".to_string(),
            "aarch64" => "aarch64".to_string(),
            "x86" => "x32".to_string(),
            other => other.to_string(),
        };
        Self { os, arch }
    }
}

/// Where a runtime archive comes from. Tried in `CHAIN` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeSource {
    /// Provider catalog lookup; carries a checksum.
    Primary,
    /// Fixed download URL, used when the catalog is unavailable.
    Fallback,
}

impl RuntimeSource {
    pub const CHAIN: [RuntimeSource; 2] = [RuntimeSource::Primary, RuntimeSource::Fallback];

    /// Turn this source into a concrete download for `major` on `platform`.
    pub async fn locate(
        &self,
        fetcher: &Fetcher,
        endpoints: &Endpoints,
        major: u32,
        platform: &RuntimePlatform,
    ) -> LauncherResult<RuntimeDownload> {
        match self {
            RuntimeSource::Primary => primary(fetcher, endpoints, major, platform).await,
            RuntimeSource::Fallback => Ok(fallback(endpoints, major, platform)),
        }
    }
}

impl fmt::Display for RuntimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeSource::Primary => f.write_str("catalog"),
            RuntimeSource::Fallback => f.write_str("fallback URL"),
        }
    }
}

/// A concrete runtime archive to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDownload {
    pub source: RuntimeSource,
    pub url: String,
    pub sha256: Option<String>,
    pub archive: ArchiveKind,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdoptiumRelease {
    binary: AdoptiumBinary,
    version: AdoptiumVersion,
}

#[derive(Debug, Deserialize)]
struct AdoptiumBinary {
    package: AdoptiumPackage,
}

#[derive(Debug, Deserialize)]
struct AdoptiumPackage {
    link: String,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdoptiumVersion {
    openjdk_version: String,
}

pub fn catalog_url(endpoints: &Endpoints, major: u32, platform: &RuntimePlatform) -> String {
    format!(
        "{}/assets/latest/{}/hotspot?architecture={}&image_type=jre&os={}&vendor=eclipse",
        endpoints.adoptium_api.trim_end_matches('/'),
        major,
        platform.arch,
        platform.os
    )
}

async fn primary(
    fetcher: &Fetcher,
    endpoints: &Endpoints,
    major: u32,
    platform: &RuntimePlatform,
) -> LauncherResult<RuntimeDownload> {
    let url = catalog_url(endpoints, major, platform);
    let releases: Vec<AdoptiumRelease> = fetcher.get_json(&url).await?;
    let release = releases.into_iter().next().ok_or_else(|| {
        LauncherError::RuntimeProvisionFailed(format!(
            "catalog lists no Java {} build for {}/{}",
            major, platform.os, platform.arch
        ))
    })?;

    let package = release.binary.package;
    let archive = package
        .name
        .as_deref()
        .and_then(ArchiveKind::from_name)
        .or_else(|| ArchiveKind::from_name(&package.link))
        .unwrap_or_else(|| ArchiveKind::for_os(platform.os));
    debug!(
        "Catalog offers Java {} at {}",
        release.version.openjdk_version, package.link
    );

    Ok(RuntimeDownload {
        source: RuntimeSource::Primary,
        url: package.link,
        sha256: package.checksum.filter(|c| !c.trim().is_empty()),
        archive,
        version: Some(release.version.openjdk_version),
    })
}

/// Redirecting "latest GA" endpoint. No checksum is available here.
fn fallback(endpoints: &Endpoints, major: u32, platform: &RuntimePlatform) -> RuntimeDownload {
    RuntimeDownload {
        source: RuntimeSource::Fallback,
        url: format!(
            "{}/binary/latest/{}/ga/{}/{}/jre/hotspot/normal/eclipse",
            endpoints.adoptium_api.trim_end_matches('/'),
            major,
            platform.os,
            platform.arch
        ),
        sha256: None,
        archive: ArchiveKind::for_os(platform.os),
        version: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> RuntimePlatform {
        RuntimePlatform {
            os: "linux",
            arch: "x64".into(),
        }
    }

    #[test]
    fn catalog_query_names_platform_and_major() {
        assert_eq!(
            catalog_url(&Endpoints::default(), 21, &linux()),
            "https://api.adoptium.net/v3/assets/latest/21/hotspot?architecture=x64&image_type=jre&os=linux&vendor=eclipse"
        );
    }

    #[tokio::test]
    async fn fallback_needs_no_network() {
        let fetcher = Fetcher::new(&Default::default()).unwrap();
        let download = RuntimeSource::Fallback
            .locate(&fetcher, &Endpoints::default(), 21, &linux())
            .await
            .unwrap();
        assert_eq!(
            download.url,
            "https://api.adoptium.net/v3/binary/latest/21/ga/linux/x64/jre/hotspot/normal/eclipse"
        );
        assert_eq!(download.archive, ArchiveKind::TarGz);
        assert_eq!(download.sha256, None);
    }

    #[test]
    fn chain_tries_the_catalog_first() {
        assert_eq!(RuntimeSource::CHAIN[0], RuntimeSource::Primary);
        assert_eq!(RuntimeSource::CHAIN[1], RuntimeSource::Fallback);
    }
}
