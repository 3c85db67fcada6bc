use crate::error::MirrorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resource name of the manifest under every endpoint.
pub const MANIFEST_NAME: &str = "hashes.json";

/// Remote listing of relative file name -> expected hex digest.
///
/// Downloaded fresh on every pass; never diffed against an older copy.
/// Entries iterate in name order so progress output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse a `hashes.json` body: a flat JSON object of strings.
    pub fn from_json(body: &[u8]) -> Result<Self, MirrorError> {
        let entries: BTreeMap<String, String> = serde_json::from_slice(body)?;
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which of the two configured sources is meant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointKind {
    #[default]
    Primary,
    Mirror,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Primary => f.write_str("primary"),
            EndpointKind::Mirror => f.write_str("mirror"),
        }
    }
}

/// An immutable base URL that resource names are appended to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub kind: EndpointKind,
    pub base_url: String,
}

impl Endpoint {
    /// Normalises `base_url` to end with a single `/`.
    pub fn new(kind: EndpointKind, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { kind, base_url }
    }

    /// Resource URL by plain concatenation; names are not escaped.
    pub fn url_for(&self, name: &str) -> String {
        format!("{}{}", self.base_url, name.trim_start_matches('/'))
    }
}

/// The primary/mirror pair a sync engine fails over between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub primary: Endpoint,
    pub mirror: Endpoint,
}

impl Endpoints {
    pub fn new(primary: impl Into<String>, mirror: impl Into<String>) -> Self {
        Self {
            primary: Endpoint::new(EndpointKind::Primary, primary),
            mirror: Endpoint::new(EndpointKind::Mirror, mirror),
        }
    }

    pub fn get(&self, kind: EndpointKind) -> &Endpoint {
        match kind {
            EndpointKind::Primary => &self.primary,
            EndpointKind::Mirror => &self.mirror,
        }
    }
}
