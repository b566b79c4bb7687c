use md5::{Digest as _, Md5};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Online,
    Offline,
}

impl IdentityKind {
    /// Value passed to the game as `--userType`.
    pub fn user_type(&self) -> &'static str {
        match self {
            IdentityKind::Online => "msa",
            IdentityKind::Offline => "legacy",
        }
    }
}

/// Player identity handed to the launch step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    pub kind: IdentityKind,
}

impl Identity {
    /// Offline profile with the same UUID an offline-mode server derives.
    pub fn offline(name: &str) -> LauncherResult<Self> {
        let name = name.trim();
        if !(3..=16).contains(&name.len()) {
            return Err(LauncherError::Other(
                "Username must be between 3 and 16 characters".into(),
            ));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(LauncherError::Other(
                "Username can only contain letters, numbers and underscores".into(),
            ));
        }

        Ok(Self {
            id: offline_uuid(name).to_string(),
            display_name: name.to_string(),
            credential: None,
            kind: IdentityKind::Offline,
        })
    }

    /// UUID without dashes, as the game expects it.
    pub fn compact_id(&self) -> String {
        self.id.replace('-', "")
    }
}

/// Name-based (version 3) UUID of `OfflinePlayer:<name>`.
pub fn offline_uuid(name: &str) -> Uuid {
    let digest = Md5::digest(format!("OfflinePlayer:{name}").as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    bytes[6] = (bytes[6] & 0x0f) | 0x30;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_uuid_matches_server_derivation() {
        // Same value vanilla servers in offline mode assign to "Notch".
        assert_eq!(
            offline_uuid("Notch").to_string(),
            "b50ad385-829d-3141-a216-7e7d7539ba7f"
        );
        assert_eq!(offline_uuid("Notch").get_version_num(), 3);
    }

    #[test]
    fn offline_identity_validates_the_name() {
        let identity = Identity::offline("  Steve_01 ").unwrap();
        assert_eq!(identity.display_name, "Steve_01");
        assert_eq!(identity.kind.user_type(), "legacy");
        assert_eq!(identity.compact_id().len(), 32);
        assert!(identity.credential.is_none());

        assert!(Identity::offline("ab").is_err());
        assert!(Identity::offline("has space").is_err());
        assert!(Identity::offline("seventeen_chars_x").is_err());
    }
}
