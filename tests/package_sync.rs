mod common;

use std::sync::Arc;

use common::{endpoints, versions_route, FakeMod};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yonix_lib::core::loaders::LoaderKind;
use yonix_lib::core::modpack::{
    InstallManifest, ModrinthClient, PackageReference, PackageRegistry, PackageSynchronizer,
    ShaderReference, SyncOptions,
};
use yonix_lib::core::progress::ProgressReporter;
use yonix_lib::core::state::GameLayout;

const GAME: &str = "1.21.1";

fn manifest(mods: Vec<PackageReference>) -> InstallManifest {
    InstallManifest {
        name: Some("Yonix".into()),
        version: Some("1.0.0".into()),
        minecraft_version: GAME.into(),
        loader_version: "0.18.0".into(),
        loader: LoaderKind::Fabric,
        mods,
        shaders: Vec::new(),
    }
}

fn registry(server: &MockServer) -> ModrinthClient {
    ModrinthClient::new(common::fetcher(), endpoints(server).modrinth_api)
}

fn synchronizer(server: &MockServer, layout: &GameLayout) -> PackageSynchronizer {
    PackageSynchronizer::new(
        Arc::new(registry(server)),
        common::downloader(),
        layout.clone(),
    )
}

/// Registry listing plus file route for `m`; the listing may be hit `lookups` times.
async fn publish(server: &MockServer, m: &FakeMod, lookups: u64) {
    Mock::given(method("GET"))
        .and(path(versions_route(m.id)))
        .and(query_param("loaders", "[\"fabric\"]"))
        .and(query_param("game_versions", format!("[\"{GAME}\"]")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([m.version_json(server)])))
        .expect(lookups)
        .mount(server)
        .await;
    common::serve_bytes(server, &m.file_route(), &m.bytes).await;
}

#[tokio::test]
async fn fresh_install_then_idempotent_rerun() {
    let server = MockServer::start().await;
    let sodium = FakeMod::new("sodium", "0.6.0");
    let lithium = FakeMod::new("lithium", "0.13.0");
    // Second run is answered from the resolution cache.
    publish(&server, &sodium, 1).await;
    publish(&server, &lithium, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let layout = GameLayout::new(dir.path());
    let pack = manifest(vec![
        PackageReference::new("sodium"),
        PackageReference::pinned("lithium", "0.13.0"),
    ]);
    let (progress, mut events) = ProgressReporter::channel();

    let first = synchronizer(&server, &layout)
        .with_progress(progress)
        .sync(&pack, SyncOptions::default())
        .await
        .unwrap();
    assert_eq!((first.downloaded, first.total, first.failed), (2, 2, 0));
    assert_eq!(
        std::fs::read(layout.mods_dir().join(&sodium.file_name)).unwrap(),
        sodium.bytes
    );

    let cache: Value =
        serde_json::from_str(&std::fs::read_to_string(layout.resolution_cache()).unwrap()).unwrap();
    let packages = cache["packages"].as_object().unwrap();
    assert!(packages.contains_key("sodium"));
    assert!(packages.contains_key("lithium@0.13.0"));
    assert_eq!(packages["sodium"]["targetVersion"], GAME);
    assert!(cache["lastUpdated"].is_string());

    let mut percents = Vec::new();
    while let Ok(event) = events.try_recv() {
        percents.push(event.percent);
    }
    assert_eq!(percents.first(), Some(&0));
    assert_eq!(percents.last(), Some(&100));

    let second = synchronizer(&server, &layout)
        .sync(&pack, SyncOptions::default())
        .await
        .unwrap();
    assert_eq!((second.downloaded, second.skipped, second.removed), (0, 2, 0));
}

#[tokio::test]
async fn stale_cache_entry_is_resolved_again() {
    let server = MockServer::start().await;
    let sodium = FakeMod::new("sodium", "0.6.0");
    publish(&server, &sodium, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let layout = GameLayout::new(dir.path());
    std::fs::write(
        layout.resolution_cache(),
        json!({
            "packages": { "sodium": {
                "id": "sodium",
                "resolvedVersion": "0.5.0",
                "versionId": "old",
                "fileName": "sodium-0.5.0.jar",
                "downloadUrl": format!("{}/cdn/old.jar", server.uri()),
                "size": 1,
                "targetVersion": "1.20.4"
            } }
        })
        .to_string(),
    )
    .unwrap();

    let summary = synchronizer(&server, &layout)
        .sync(&manifest(vec![PackageReference::new("sodium")]), SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.downloaded, 1);
    assert!(layout.mods_dir().join("sodium-0.6.0.jar").exists());
}

#[tokio::test]
async fn undeclared_files_follow_the_removal_switch() {
    let server = MockServer::start().await;
    let sodium = FakeMod::new("sodium", "0.6.0");
    publish(&server, &sodium, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let layout = GameLayout::new(dir.path());
    let mods = layout.mods_dir();
    std::fs::create_dir_all(&mods).unwrap();
    std::fs::write(mods.join("old-mod.jar"), b"stray").unwrap();
    std::fs::write(mods.join("readme.txt"), b"not a jar").unwrap();
    let pack = manifest(vec![PackageReference::new("sodium")]);

    let kept = synchronizer(&server, &layout)
        .sync(&pack, SyncOptions { remove_undeclared: false })
        .await
        .unwrap();
    assert_eq!(kept.removed, 0);
    assert!(mods.join("old-mod.jar").exists());

    let pruned = synchronizer(&server, &layout)
        .sync(&pack, SyncOptions { remove_undeclared: true })
        .await
        .unwrap();
    assert_eq!(pruned.removed, 1);
    assert!(!mods.join("old-mod.jar").exists());
    assert!(mods.join("readme.txt").exists());
    assert!(mods.join(&sodium.file_name).exists());
}

#[tokio::test]
async fn corrupted_local_file_is_fetched_again() {
    let server = MockServer::start().await;
    let sodium = FakeMod::new("sodium", "0.6.0");
    publish(&server, &sodium, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let layout = GameLayout::new(dir.path());
    let dest = layout.mods_dir().join(&sodium.file_name);
    std::fs::create_dir_all(layout.mods_dir()).unwrap();
    std::fs::write(&dest, b"truncated").unwrap();

    let summary = synchronizer(&server, &layout)
        .sync(&manifest(vec![PackageReference::new("sodium")]), SyncOptions::default())
        .await
        .unwrap();
    assert_eq!((summary.downloaded, summary.skipped), (1, 0));
    assert_eq!(std::fs::read(&dest).unwrap(), sodium.bytes);
}

#[tokio::test]
async fn one_failing_download_leaves_the_rest_installed() {
    let server = MockServer::start().await;
    let sodium = FakeMod::new("sodium", "0.6.0");
    let lithium = FakeMod::new("lithium", "0.13.0");
    let iris = FakeMod::new("iris", "1.8.0");
    publish(&server, &sodium, 1).await;
    publish(&server, &lithium, 1).await;
    Mock::given(method("GET"))
        .and(path(versions_route(iris.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([iris.version_json(&server)])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(iris.file_route()))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let layout = GameLayout::new(dir.path());
    let summary = synchronizer(&server, &layout)
        .sync(
            &manifest(vec![
                PackageReference::new("sodium"),
                PackageReference::new("iris"),
                PackageReference::new("lithium"),
            ]),
            SyncOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!((summary.downloaded, summary.failed, summary.total), (2, 1, 3));
    assert!(!layout.mods_dir().join(&iris.file_name).exists());
}

#[tokio::test]
async fn unresolvable_package_is_skipped() {
    let server = MockServer::start().await;
    let sodium = FakeMod::new("sodium", "0.6.0");
    publish(&server, &sodium, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let layout = GameLayout::new(dir.path());
    let summary = synchronizer(&server, &layout)
        .sync(
            &manifest(vec![
                PackageReference::new("sodium"),
                PackageReference::new("does-not-exist"),
            ]),
            SyncOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!((summary.downloaded, summary.unresolved), (1, 1));
}

#[tokio::test]
async fn unmatched_pin_falls_back_to_newest() {
    let server = MockServer::start().await;
    let newest = FakeMod::new("lithium", "0.14.0");
    let older = FakeMod::new("lithium", "0.13.0");
    Mock::given(method("GET"))
        .and(path(versions_route("lithium")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            newest.version_json(&server),
            older.version_json(&server)
        ])))
        .mount(&server)
        .await;

    let client = registry(&server);
    let pinned = client
        .resolve("lithium", GAME, Some(LoaderKind::Fabric), Some("0.13"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pinned.resolved_version, "0.13.0");

    let fallback = client
        .resolve("lithium", GAME, Some(LoaderKind::Fabric), Some("9.9.9"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fallback.resolved_version, "0.14.0");
    assert_eq!(fallback.file_name, newest.file_name);
}

#[tokio::test]
async fn empty_filtered_listing_retries_without_game_filter() {
    let server = MockServer::start().await;
    let shader = FakeMod::new("complementary", "r5.3");
    Mock::given(method("GET"))
        .and(path(versions_route(shader.id)))
        .and(query_param("game_versions", format!("[\"{GAME}\"]")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(versions_route(shader.id)))
        .and(query_param_is_missing("game_versions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([shader.version_json(&server)])))
        .expect(1)
        .mount(&server)
        .await;

    let artifact = registry(&server)
        .resolve(shader.id, GAME, None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(artifact.resolved_version, "r5.3");
}

#[tokio::test]
async fn registry_server_error_is_a_resolution_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(versions_route("sodium")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = registry(&server)
        .resolve("sodium", GAME, Some(LoaderKind::Fabric), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        yonix_lib::core::error::LauncherError::RegistryResolutionFailed { .. }
    ));
}

#[tokio::test]
async fn shader_update_replaces_older_release() {
    let server = MockServer::start().await;
    let mut shader = FakeMod::new("bsl", "8.2.09");
    shader.file_name = "BSL_v8.2.09.zip".into();
    Mock::given(method("GET"))
        .and(path(versions_route(shader.id)))
        .and(query_param_is_missing("loaders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([shader.version_json(&server)])))
        .mount(&server)
        .await;
    common::serve_bytes(&server, &shader.file_route(), &shader.bytes).await;

    let dir = tempfile::tempdir().unwrap();
    let layout = GameLayout::new(dir.path());
    let packs = layout.shaderpacks_dir();
    std::fs::create_dir_all(&packs).unwrap();
    std::fs::write(packs.join("BSL_v8.2.08.zip"), b"old").unwrap();
    std::fs::write(packs.join("Other_v1.zip"), b"other").unwrap();

    let mut pack = manifest(Vec::new());
    pack.shaders = vec![
        ShaderReference {
            id: "bsl".into(),
            source: "modrinth".into(),
        },
        ShaderReference {
            id: "local-only".into(),
            source: "file".into(),
        },
    ];

    let summary = synchronizer(&server, &layout)
        .sync(&pack, SyncOptions::default())
        .await
        .unwrap();
    assert_eq!((summary.shaders.downloaded, summary.shaders.removed), (1, 1));
    assert!(packs.join("BSL_v8.2.09.zip").exists());
    assert!(!packs.join("BSL_v8.2.08.zip").exists());
    assert!(packs.join("Other_v1.zip").exists());
}

#[tokio::test]
async fn non_jar_release_is_not_downloaded_twice() {
    let server = MockServer::start().await;
    let mut pack_data = FakeMod::new("terralith", "2.5.4");
    pack_data.file_name = "Terralith_1.21_v2.5.4.zip".into();
    Mock::given(method("GET"))
        .and(path(versions_route(pack_data.id)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([pack_data.version_json(&server)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(pack_data.file_route()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pack_data.bytes.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let layout = GameLayout::new(dir.path());
    let pack = manifest(vec![PackageReference::new("terralith")]);

    let first = synchronizer(&server, &layout)
        .sync(&pack, SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(first.downloaded, 1);

    let second = synchronizer(&server, &layout)
        .sync(&pack, SyncOptions::default())
        .await
        .unwrap();
    assert_eq!((second.downloaded, second.skipped), (0, 1));
    assert!(layout.mods_dir().join(&pack_data.file_name).exists());
}
