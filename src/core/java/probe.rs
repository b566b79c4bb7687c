use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::core::error::LauncherResult;

/// What `java -version` told us about a binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JavaInstallation {
    pub path: PathBuf,
    pub version: String,
    pub major: u32,
    pub vendor: String,
}

/// Run `<path> -version` and parse the banner. `None` if it does not start.
#[instrument]
pub async fn probe_java(path: &Path) -> Option<JavaInstallation> {
    let output = Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }

    // The banner goes to stderr on every vendor we know of, stdout on a few wrappers.
    let banner = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    debug!("Probing {:?}: {}", path, banner.lines().next().unwrap_or(""));
    parse_banner(path, &banner)
}

pub(crate) fn parse_banner(path: &Path, banner: &str) -> Option<JavaInstallation> {
    let version = parse_version_string(banner)?;
    Some(JavaInstallation {
        path: path.to_path_buf(),
        major: parse_major_version(&version),
        vendor: parse_vendor(banner),
        version,
    })
}

/// First double-quoted token: `openjdk version "21.0.4" 2024-07-16` gives `21.0.4`.
fn parse_version_string(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let start = line.find('"')?;
        let end = line[start + 1..].find('"')?;
        Some(line[start + 1..start + 1 + end].to_string())
    })
}

/// `21.0.4` is 21, legacy `1.8.0_392` is 8.
pub fn parse_major_version(version: &str) -> u32 {
    let mut parts = version.split(['.', '_', '+', '-']);
    let first: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    if first == 1 {
        parts.next().and_then(|p| p.parse().ok()).unwrap_or(first)
    } else {
        first
    }
}

fn parse_vendor(output: &str) -> String {
    for (needle, vendor) in [
        ("Temurin", "Temurin"),
        ("Adoptium", "Adoptium"),
        ("Zulu", "Zulu"),
        ("OpenJDK", "OpenJDK"),
        ("Java(TM)", "Oracle"),
    ] {
        if output.contains(needle) {
            return vendor.to_string();
        }
    }
    "unknown".to_string()
}

/// Installed runtimes satisfy a requirement within the same LTS line.
pub fn is_java_compatible_major(installed_major: u32, required_major: u32) -> bool {
    installed_major >= required_major
        && runtime_track(installed_major) == runtime_track(required_major)
}

fn runtime_track(major: u32) -> u32 {
    if major <= 8 {
        8
    } else if major >= 21 {
        21
    } else {
        17
    }
}

pub fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// Find the launcher binary inside a runtime home: `bin/`, the macOS bundle
/// layout, or anywhere below as a last resort.
pub fn locate_java_binary(runtime_root: &Path) -> Option<PathBuf> {
    let primary = runtime_root.join("bin").join(java_exe());
    if primary.is_file() {
        return Some(primary);
    }

    let mac_layout = runtime_root
        .join("Contents")
        .join("Home")
        .join("bin")
        .join(java_exe());
    if mac_layout.is_file() {
        return Some(mac_layout);
    }

    find_java_binary_recursive(runtime_root)
}

fn find_java_binary_recursive(root: &Path) -> Option<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(root)
        .ok()?
        .filter_map(Result::ok)
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type().ok()?;
        if file_type.is_file() {
            let is_java = path.file_name().and_then(|n| n.to_str()) == Some(java_exe());
            let in_bin = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                == Some("bin");
            if is_java && in_bin {
                return Some(path);
            }
        } else if file_type.is_dir() {
            if let Some(found) = find_java_binary_recursive(&path) {
                return Some(found);
            }
        }
    }
    None
}

/// Archives do not always carry the executable bit; set it on the binary we found.
pub fn ensure_java_executable(java_bin: &Path) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        use crate::core::error::LauncherError;
        use std::os::unix::fs::PermissionsExt;

        let mut perms = std::fs::metadata(java_bin)
            .map_err(|e| LauncherError::io(java_bin, e))?
            .permissions();
        if perms.mode() & 0o111 != 0o111 {
            perms.set_mode(0o755);
            std::fs::set_permissions(java_bin, perms)
                .map_err(|e| LauncherError::io(java_bin, e))?;
        }
    }
    #[cfg(not(unix))]
    let _ = java_bin;
    Ok(())
}
