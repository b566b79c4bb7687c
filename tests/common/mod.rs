#![allow(dead_code)]

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use yonix_lib::core::downloader::digest::{sha1_hex, sha512_hex};
use yonix_lib::core::downloader::Downloader;
use yonix_lib::core::http::Fetcher;
use yonix_lib::core::state::Endpoints;

/// Fetcher with one retry and a tiny backoff so failure paths stay fast.
pub fn fetcher() -> Fetcher {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    Fetcher::from_client(client, 1, Duration::from_millis(5))
}

pub fn downloader() -> Downloader {
    Downloader::new(fetcher())
}

/// Every endpoint pointed at the mock server.
pub fn endpoints(server: &MockServer) -> Endpoints {
    let base = server.uri();
    Endpoints {
        version_manifest: format!("{base}/mc/game/version_manifest_v2.json"),
        libraries: format!("{base}/libraries/"),
        resources: format!("{base}/resources"),
        fabric_meta: format!("{base}/fabric/v2"),
        quilt_meta: format!("{base}/quilt/v3"),
        modrinth_api: format!("{base}/modrinth/v2"),
        adoptium_api: format!("{base}/adoptium/v3"),
        github_api: format!("{base}/github"),
        release_repo: Some("yonix/pack".into()),
    }
}

pub async fn serve_bytes(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

pub async fn serve_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Registry fixtures ───────────────────────────────────

pub struct FakeMod {
    pub id: &'static str,
    pub version: &'static str,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FakeMod {
    pub fn new(id: &'static str, version: &'static str) -> Self {
        Self {
            id,
            version,
            file_name: format!("{id}-{version}.jar"),
            bytes: format!("jar bytes of {id} {version}").into_bytes(),
        }
    }

    pub fn file_route(&self) -> String {
        format!("/cdn/{}", self.file_name)
    }

    pub fn version_json(&self, server: &MockServer) -> Value {
        json!({
            "id": format!("{}-{}", self.id, self.version),
            "version_number": self.version,
            "files": [{
                "url": format!("{}{}", server.uri(), self.file_route()),
                "filename": self.file_name,
                "primary": true,
                "size": self.bytes.len(),
                "hashes": { "sha512": sha512_hex(&self.bytes), "sha1": sha1_hex(&self.bytes) }
            }]
        })
    }
}

pub fn versions_route(id: &str) -> String {
    format!("/modrinth/v2/project/{id}/version")
}

// ── Mojang / Fabric fixtures ────────────────────────────

pub const GAME: &str = "1.21.1";
pub const LOADER: &str = "0.18.0";

pub struct GameFixture {
    pub client: Vec<u8>,
    pub library: Vec<u8>,
    pub loader_library: Vec<u8>,
    pub asset_a: Vec<u8>,
    pub asset_b: Vec<u8>,
}

impl GameFixture {
    pub fn new() -> Self {
        Self {
            client: b"client jar".to_vec(),
            library: b"brigadier jar".to_vec(),
            loader_library: b"fabric loader jar".to_vec(),
            asset_a: b"sound bytes".to_vec(),
            asset_b: b"lang bytes".to_vec(),
        }
    }

    pub fn asset_index(&self) -> Value {
        json!({
            "objects": {
                "minecraft/sounds/click.ogg": { "hash": sha1_hex(&self.asset_a), "size": self.asset_a.len() },
                "minecraft/lang/en_us.json": { "hash": sha1_hex(&self.asset_b), "size": self.asset_b.len() }
            }
        })
    }

    pub fn asset_route(bytes: &[u8]) -> String {
        let hash = sha1_hex(bytes);
        format!("/resources/{}/{}", &hash[..2], hash)
    }

    /// Mount the catalog, detail document, loader profile and every file.
    pub async fn mount(&self, server: &MockServer) {
        let base = server.uri();
        let index = self.asset_index();
        let index_raw = serde_json::to_vec(&index).unwrap();

        serve_json(
            server,
            "/mc/game/version_manifest_v2.json",
            json!({
                "latest": { "release": GAME, "snapshot": GAME },
                "versions": [{
                    "id": GAME,
                    "type": "release",
                    "url": format!("{base}/v1/packages/{GAME}.json"),
                    "releaseTime": "2024-08-08T12:24:45+00:00",
                    "sha1": "0000000000000000000000000000000000000000"
                }]
            }),
        )
        .await;

        serve_json(
            server,
            &format!("/v1/packages/{GAME}.json"),
            json!({
                "id": GAME,
                "mainClass": "net.minecraft.client.main.Main",
                "javaVersion": { "component": "java-runtime-delta", "majorVersion": 21 },
                "assetIndex": {
                    "id": "17",
                    "url": format!("{base}/v1/indexes/17.json"),
                    "sha1": sha1_hex(&index_raw),
                    "totalSize": 21
                },
                "downloads": { "client": {
                    "url": format!("{base}/v1/objects/client.jar"),
                    "sha1": sha1_hex(&self.client),
                    "size": self.client.len()
                } },
                "libraries": [
                    {
                        "name": "com.mojang:brigadier:1.3.10",
                        "downloads": { "artifact": {
                            "path": "com/mojang/brigadier/1.3.10/brigadier-1.3.10.jar",
                            "url": format!("{base}/libraries/com/mojang/brigadier/1.3.10/brigadier-1.3.10.jar"),
                            "sha1": sha1_hex(&self.library),
                            "size": self.library.len()
                        } }
                    },
                    {
                        "name": "org.lwjgl:lwjgl:3.3.3:natives-windows",
                        "downloads": { "artifact": {
                            "path": "org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-windows.jar",
                            "url": format!("{base}/libraries/org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3-natives-windows.jar")
                        } },
                        "rules": [{ "action": "allow", "os": { "name": "windows" } }]
                    }
                ]
            }),
        )
        .await;

        serve_json(
            server,
            &format!("/fabric/v2/versions/loader/{GAME}/{LOADER}/profile/json"),
            json!({
                "id": format!("fabric-loader-{LOADER}-{GAME}"),
                "inheritsFrom": GAME,
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "libraries": [
                    {
                        "name": format!("net.fabricmc:fabric-loader:{LOADER}"),
                        "url": format!("{base}/maven/"),
                        "sha1": sha1_hex(&self.loader_library)
                    },
                    {
                        "name": "com.mojang:brigadier:1.3.10",
                        "url": format!("{base}/libraries/")
                    }
                ]
            }),
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/v1/indexes/17.json"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(index_raw))
            .mount(server)
            .await;
        serve_bytes(server, "/v1/objects/client.jar", &self.client).await;
        serve_bytes(
            server,
            "/libraries/com/mojang/brigadier/1.3.10/brigadier-1.3.10.jar",
            &self.library,
        )
        .await;
        serve_bytes(
            server,
            &format!("/maven/net/fabricmc/fabric-loader/{LOADER}/fabric-loader-{LOADER}.jar"),
            &self.loader_library,
        )
        .await;
    }
}
