use crate::storage::LocalRoot;
use crate::transport::Transport;
use hashmirror_core::hash::HashAlgorithm;
use hashmirror_core::manifest::Endpoint;
use hashmirror_core::MirrorError;
use std::sync::Arc;

/// Retrieves named resources from an endpoint and stores them under the
/// local root, byte for byte.
///
/// No retries happen here; retry policy belongs to the sync engine.
#[derive(Clone)]
pub struct ContentFetcher {
    transport: Arc<dyn Transport>,
    root: LocalRoot,
}

impl ContentFetcher {
    pub fn new(transport: Arc<dyn Transport>, root: LocalRoot) -> Self {
        Self { transport, root }
    }

    pub fn root(&self) -> &LocalRoot {
        &self.root
    }

    /// Download `name` from `endpoint` without touching the disk.
    pub async fn retrieve(&self, endpoint: &Endpoint, name: &str) -> Result<Vec<u8>, MirrorError> {
        self.transport.get(&endpoint.url_for(name)).await
    }

    /// Download `name` from `endpoint`, check it against `expected` and
    /// write it to `root/name`.
    ///
    /// The name is checked before any request goes out. Bytes that do not
    /// hash to `expected` are never written. On any failure the previous
    /// local copy, if any, is left untouched.
    pub async fn fetch(
        &self,
        endpoint: &Endpoint,
        name: &str,
        algorithm: HashAlgorithm,
        expected: &str,
    ) -> Result<Vec<u8>, MirrorError> {
        self.root.resolve(name)?;
        let data = self.retrieve(endpoint, name).await?;
        algorithm.verify(name, &data, expected)?;
        self.root.write(name, &data).await?;
        Ok(data)
    }

    /// Persist an already downloaded body to `root/name`.
    pub async fn store(&self, name: &str, data: &[u8]) -> Result<(), MirrorError> {
        self.root.write(name, data).await.map(|_| ())
    }
}
