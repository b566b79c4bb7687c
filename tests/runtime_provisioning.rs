#![cfg(unix)]

mod common;

use std::path::Path;

use common::endpoints;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yonix_lib::core::downloader::digest::sha256_hex;
use yonix_lib::core::error::LauncherError;
use yonix_lib::core::java::{RuntimePlatform, RuntimeProvisioner};
use yonix_lib::core::state::GameLayout;

const HOME: &str = "jdk-21.0.4+7-jre";

/// tar.gz with a `bin/java` script that reports the given version.
fn fake_runtime(version: &str) -> Vec<u8> {
    let script = format!(
        "#!/bin/sh\necho 'openjdk version \"{version}\" 2024-07-16' >&2\nexit 0\n"
    );
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));

    let mut header = tar::Header::new_gnu();
    header.set_size(script.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, format!("{HOME}/bin/java"), script.as_bytes())
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

fn linux_x64() -> RuntimePlatform {
    RuntimePlatform {
        os: "linux",
        arch: "x64".into(),
    }
}

fn provisioner(server: &MockServer, root: &Path) -> RuntimeProvisioner {
    RuntimeProvisioner::new(common::fetcher(), endpoints(server), GameLayout::new(root))
        .for_major(21)
        .with_system_candidate(None)
        .with_platform(linux_x64())
        .with_size_floor(0)
}

async fn mount_catalog(server: &MockServer, checksum: &str) {
    Mock::given(method("GET"))
        .and(path("/adoptium/v3/assets/latest/21/hotspot"))
        .and(query_param("os", "linux"))
        .and(query_param("architecture", "x64"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "binary": { "package": {
                "link": format!("{}/downloads/jre.tar.gz", server.uri()),
                "checksum": checksum,
                "name": "OpenJDK21U-jre_x64_linux_hotspot_21.0.4_7.tar.gz"
            } },
            "version": { "openjdk_version": "21.0.4+7" }
        }])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn catalog_download_is_relocated_to_runtime_java() {
    let server = MockServer::start().await;
    let archive = fake_runtime("21.0.4");
    mount_catalog(&server, &sha256_hex(&archive)).await;
    Mock::given(method("GET"))
        .and(path("/downloads/jre.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let java = provisioner(&server, dir.path()).ensure().await.unwrap();

    let layout = GameLayout::new(dir.path());
    assert_eq!(java, layout.managed_java_home().join("bin").join("java"));
    assert!(!layout.runtime_dir().join(HOME).exists());

    // Already provisioned: no further downloads.
    let again = provisioner(&server, dir.path()).ensure().await.unwrap();
    assert_eq!(again, java);
}

#[tokio::test]
async fn catalog_outage_falls_back_to_fixed_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/adoptium/v3/assets/latest/21/hotspot"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(
            "/adoptium/v3/binary/latest/21/ga/linux/x64/jre/hotspot/normal/eclipse",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(fake_runtime("21.0.4")))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let java = provisioner(&server, dir.path()).ensure().await.unwrap();
    assert!(java.ends_with("java/bin/java"));
}

#[tokio::test]
async fn checksum_mismatch_and_missing_fallback_fail_provisioning() {
    let server = MockServer::start().await;
    mount_catalog(&server, &"0".repeat(64)).await;
    common::serve_bytes(&server, "/downloads/jre.tar.gz", &fake_runtime("21.0.4")).await;

    let dir = tempfile::tempdir().unwrap();
    let err = provisioner(&server, dir.path()).ensure().await.unwrap_err();
    assert!(matches!(err, LauncherError::RuntimeProvisionFailed(_)), "{err}");
}

#[tokio::test]
async fn archive_below_size_floor_is_rejected() {
    let server = MockServer::start().await;
    let archive = fake_runtime("21.0.4");
    mount_catalog(&server, &sha256_hex(&archive)).await;
    common::serve_bytes(&server, "/downloads/jre.tar.gz", &archive).await;

    let dir = tempfile::tempdir().unwrap();
    let err = provisioner(&server, dir.path())
        .with_size_floor(10 * 1024 * 1024)
        .ensure()
        .await
        .unwrap_err();
    assert!(matches!(err, LauncherError::RuntimeProvisionFailed(_)), "{err}");
    assert!(!GameLayout::new(dir.path()).managed_java_home().exists());
}

#[tokio::test]
async fn existing_runtime_folder_is_used_without_network() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let layout = GameLayout::new(dir.path());
    let bin = layout.runtime_dir().join("jre-21.0.1").join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let java = bin.join("java");
    std::fs::write(
        &java,
        "#!/bin/sh\necho 'openjdk version \"21.0.1\" 2023-10-17' >&2\n",
    )
    .unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    let found = provisioner(&server, dir.path()).ensure().await.unwrap();
    assert_eq!(found, java);
    assert!(server.received_requests().await.unwrap().is_empty());
}
