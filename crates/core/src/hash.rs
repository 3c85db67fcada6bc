use crate::error::MirrorError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Digest used by the remote manifest.
///
/// PhoenixBuilder's `hashes.json` carries MD5 hex digests, so that is the
/// default; SHA-256 is available for bundles that publish stronger hashes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl HashAlgorithm {
    /// Lowercase hex digest of `data`.
    pub fn digest(&self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Md5 => format!("{:x}", md5::compute(data)),
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        }
    }

    /// Check that `data`, downloaded for `name`, hashes to `expected`.
    ///
    /// Hex case and surrounding whitespace in `expected` are ignored.
    pub fn verify(&self, name: &str, data: &[u8], expected: &str) -> Result<(), MirrorError> {
        let actual = self.digest(data);
        let expected = expected.trim();
        if actual.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(MirrorError::DigestMismatch {
                name: name.to_string(),
                expected: expected.to_ascii_lowercase(),
                actual,
            })
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(HashAlgorithm::Md5),
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            other => Err(MirrorError::Config(format!(
                "unknown hash algorithm '{}', expected md5 or sha256",
                other
            ))),
        }
    }
}
