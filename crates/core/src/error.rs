use thiserror::Error;

/// Everything that can go wrong while mirroring a release bundle.
///
/// None of these are fatal to the process: the sync engine decides per
/// variant whether a failure isolates a single file, fails over to the
/// mirror endpoint, or ends the current pass.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Transport-level failure reaching an endpoint (DNS, TLS, timeout...).
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    /// The endpoint answered, but not with a success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// Reading, writing or hashing a file under the local root failed.
    #[error("local I/O error on {path}: {source}")]
    LocalIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The manifest body is not a JSON object of name -> digest strings.
    #[error("malformed manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    /// A manifest name that would resolve outside the local root.
    #[error("unsafe asset name {0:?}")]
    UnsafePath(String),

    /// Downloaded bytes do not hash to the manifest's digest.
    #[error("digest mismatch for {name}: expected {expected}, got {actual}")]
    DigestMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MirrorError {
    pub fn local_io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        MirrorError::LocalIo {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// True when the remote side is at fault rather than the local disk.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            MirrorError::Network { .. }
                | MirrorError::HttpStatus { .. }
                | MirrorError::DigestMismatch { .. }
        )
    }
}
