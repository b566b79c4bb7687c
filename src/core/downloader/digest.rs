use std::path::Path;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest as _, Sha256, Sha512};

use crate::core::error::{LauncherError, LauncherResult};

/// Expected content digest, hex encoded. The variant picks the algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "hex", rename_all = "lowercase")]
pub enum Digest {
    Sha1(String),
    Sha256(String),
    Sha512(String),
}

impl Digest {
    pub fn hex(&self) -> &str {
        match self {
            Digest::Sha1(h) | Digest::Sha256(h) | Digest::Sha512(h) => h,
        }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            Digest::Sha1(_) => "sha1",
            Digest::Sha256(_) => "sha256",
            Digest::Sha512(_) => "sha512",
        }
    }

    /// Hash `bytes` with this digest's algorithm.
    pub fn compute(&self, bytes: &[u8]) -> String {
        match self {
            Digest::Sha1(_) => sha1_hex(bytes),
            Digest::Sha256(_) => sha256_hex(bytes),
            Digest::Sha512(_) => sha512_hex(bytes),
        }
    }

    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.compute(bytes).eq_ignore_ascii_case(self.hex())
    }

    /// Compare `bytes` against the expectation; `path` only labels the error.
    pub fn verify(&self, bytes: &[u8], path: &Path) -> LauncherResult<()> {
        let actual = self.compute(bytes);
        if actual.eq_ignore_ascii_case(self.hex()) {
            Ok(())
        } else {
            Err(LauncherError::IntegrityMismatch {
                path: path.to_path_buf(),
                expected: self.hex().to_string(),
                actual,
            })
        }
    }
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn sha512_hex(bytes: &[u8]) -> String {
    hex::encode(Sha512::digest(bytes))
}

/// `true` if `path` exists and its content matches `expected`.
/// A missing file is a mismatch, not an error.
pub async fn file_matches(path: &Path, expected: &Digest) -> LauncherResult<bool> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(expected.matches(&bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(LauncherError::io(path, e)),
    }
}
