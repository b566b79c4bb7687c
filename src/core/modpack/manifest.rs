use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{parse_json, Fetcher};
use crate::core::loaders::LoaderKind;

/// Declared install: target versions plus the packages that belong in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(alias = "minecraft")]
    pub minecraft_version: String,
    pub loader_version: String,
    #[serde(default)]
    pub loader: LoaderKind,
    #[serde(default)]
    pub mods: Vec<PackageReference>,
    #[serde(default)]
    pub shaders: Vec<ShaderReference>,
}

/// A package by registry id, optionally pinned to a version string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PackageReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }

    pub fn pinned(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: Some(version.into()),
        }
    }

    /// `id`, or `id@version` when pinned.
    pub fn cache_key(&self) -> String {
        match &self.version {
            Some(v) => format!("{}@{}", self.id, v),
            None => self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderReference {
    pub id: String,
    pub source: String,
}

impl ShaderReference {
    pub fn is_from_registry(&self) -> bool {
        self.source.eq_ignore_ascii_case("modrinth")
    }
}

impl InstallManifest {
    pub fn parse(source_name: &str, raw: &str) -> LauncherResult<Self> {
        let manifest: InstallManifest = parse_json(source_name, raw)?;
        if manifest.minecraft_version.trim().is_empty() {
            return Err(LauncherError::ManifestParse {
                source_name: source_name.to_string(),
                message: "minecraftVersion is empty".into(),
            });
        }
        Ok(manifest)
    }

    /// Load from an http(s) URL or a local file path.
    pub async fn load(source: &str, fetcher: &Fetcher) -> LauncherResult<Self> {
        let raw = if source.starts_with("http://") || source.starts_with("https://") {
            fetcher.get_text(source).await?
        } else {
            let path = Path::new(source);
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LauncherError::io(path, e))?
        };

        let manifest = Self::parse(source, &raw)?;
        info!(
            "Loaded install manifest {} {} (Minecraft {}, {} {}, {} mods)",
            manifest.name.as_deref().unwrap_or("<unnamed>"),
            manifest.version.as_deref().unwrap_or(""),
            manifest.minecraft_version,
            manifest.loader,
            manifest.loader_version,
            manifest.mods.len()
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_legacy_minecraft_key_and_defaults_loader() {
        let manifest = InstallManifest::parse(
            "pack.json",
            r#"{
                "name": "Yonix",
                "minecraft": "1.21.1",
                "loaderVersion": "0.18.0",
                "mods": [{ "id": "sodium" }, { "id": "lithium", "version": "0.13.0" }],
                "shaders": [{ "id": "complementary-reimagined", "source": "modrinth" }]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.minecraft_version, "1.21.1");
        assert_eq!(manifest.loader, LoaderKind::Fabric);
        assert_eq!(manifest.mods[0].cache_key(), "sodium");
        assert_eq!(manifest.mods[1].cache_key(), "lithium@0.13.0");
        assert!(manifest.shaders[0].is_from_registry());
    }

    #[test]
    fn missing_loader_version_is_a_parse_error() {
        let err = InstallManifest::parse("pack.json", r#"{"minecraftVersion": "1.21.1"}"#)
            .unwrap_err();
        assert!(matches!(err, LauncherError::ManifestParse { .. }));
    }

    #[tokio::test]
    async fn loads_from_a_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modpack.json");
        std::fs::write(
            &path,
            r#"{"minecraftVersion": "1.21.1", "loaderVersion": "0.18.0", "loader": "quilt"}"#,
        )
        .unwrap();

        let fetcher = Fetcher::new(&Default::default()).unwrap();
        let manifest = InstallManifest::load(path.to_str().unwrap(), &fetcher)
            .await
            .unwrap();
        assert_eq!(manifest.loader, LoaderKind::Quilt);
        assert!(manifest.mods.is_empty());
    }
}
