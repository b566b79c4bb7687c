// ─── Version File ───
// Parses a Mojang version document and evaluates platform rules.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::parse_json;

/// Runtime major used when a version document does not name one.
pub const DEFAULT_JAVA_MAJOR: u32 = 21;

/// A parsed Mojang version document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: Option<String>,
    pub main_class: String,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Pre-1.13 space separated game arguments.
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    #[serde(default)]
    pub component: Option<String>,
    pub major_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<serde_json::Value>,
    #[serde(default)]
    pub jvm: Vec<serde_json::Value>,
}

// ─── Library Entry with Rules ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Vec<LibraryRule>,
    /// Repository base for coordinate-only entries.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    pub artifact: Option<LibDownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    pub path: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    #[serde(alias = "deny")]
    Disallow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
}

impl LibraryRule {
    fn applies_to(&self, os: &str) -> bool {
        match self.os.as_ref().and_then(|o| o.name.as_deref()) {
            None => true,
            Some(name) => name == os,
        }
    }
}

/// Evaluate a rule list for the platform `os` (`windows`, `osx`, `linux`).
///
/// - No rules: allowed.
/// - Otherwise the last rule that applies decides. A rule without an OS
///   predicate always applies.
/// - When no rule applies, the list's own polarity decides: any `allow` rule
///   makes the default "deny", a list of only `disallow` rules defaults to
///   "allow".
pub fn rules_allow(rules: &[LibraryRule], os: &str) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = !rules.iter().any(|r| r.action == RuleAction::Allow);
    for rule in rules {
        if rule.applies_to(os) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

/// Mojang's name for the platform we run on.
pub fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

impl VersionJson {
    pub fn parse(source_name: &str, raw: &str) -> LauncherResult<Self> {
        parse_json(source_name, raw)
    }

    /// Read an already materialized document. A missing file is `MissingManifest`.
    pub async fn load(path: &Path) -> LauncherResult<Self> {
        let raw = read_materialized(path).await?;
        Self::parse(&path.display().to_string(), &raw)
    }

    pub fn required_java_major(&self) -> u32 {
        self.java_version
            .as_ref()
            .map(|j| j.major_version)
            .unwrap_or(DEFAULT_JAVA_MAJOR)
    }

    pub fn java_component(&self) -> Option<&str> {
        self.java_version.as_ref()?.component.as_deref()
    }

    pub fn client_download(&self) -> Option<&DownloadArtifact> {
        self.downloads.as_ref()?.client.as_ref()
    }

    /// Game arguments that apply on this platform, conditional ones resolved.
    pub fn simple_game_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) => args.game.iter().flat_map(extract_argument_values).collect(),
            None => self
                .minecraft_arguments
                .as_deref()
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    pub fn simple_jvm_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) => args.jvm.iter().flat_map(extract_argument_values).collect(),
            None => vec![],
        }
    }
}

/// Read a document written by an earlier stage.
pub async fn read_materialized(path: &Path) -> LauncherResult<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LauncherError::MissingManifest(path.to_path_buf()))
        }
        Err(e) => Err(LauncherError::io(path, e)),
    }
}

fn extract_argument_values(value: &serde_json::Value) -> Vec<String> {
    if let Some(arg) = value.as_str() {
        return vec![arg.to_string()];
    }

    let Some(obj) = value.as_object() else {
        return vec![];
    };

    if let Some(rules) = obj.get("rules").and_then(|r| r.as_array()) {
        // Feature-gated arguments (demo mode, custom resolution) are never enabled.
        if rules.iter().any(|r| r.get("features").is_some()) {
            return vec![];
        }
        let parsed = serde_json::from_value::<Vec<LibraryRule>>(serde_json::Value::Array(
            rules.clone(),
        ));
        let Ok(rules) = parsed else {
            return vec![];
        };
        if !rules_allow(&rules, current_os_name()) {
            return vec![];
        }
    }

    match obj.get("value") {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect(),
        _ => vec![],
    }
}
