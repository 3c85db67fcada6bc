#![allow(dead_code)]

use async_trait::async_trait;
use courier::{ContentFetcher, LocalRoot, SyncEngine, Transport};
use hashmirror_core::config::RetryPolicy;
use hashmirror_core::hash::HashAlgorithm;
use hashmirror_core::manifest::Endpoints;
use hashmirror_core::MirrorError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PRIMARY: &str = "http://primary.test/download/";
pub const MIRROR: &str = "http://mirror.test/download/";

/// Canned answer for one URL.
#[derive(Clone)]
pub enum Reply {
    Body(Vec<u8>),
    Status(u16),
    Down,
    /// Network failure for the first `n` requests, then the body
    FailTimes(usize, Vec<u8>),
    /// The body, after a delay
    Slow(Duration, Vec<u8>),
}

/// In-memory remote: answers by exact URL and counts requests.
#[derive(Default)]
pub struct StubTransport {
    replies: Mutex<HashMap<String, Reply>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, url: impl Into<String>, reply: Reply) {
        self.replies.lock().unwrap().insert(url.into(), reply);
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    /// Publish `files` and a matching md5 manifest under `base`.
    pub fn publish(&self, base: &str, files: &[(&str, &str)]) {
        let manifest: HashMap<&str, String> = files
            .iter()
            .map(|(name, data)| (*name, HashAlgorithm::Md5.digest(data.as_bytes())))
            .collect();
        self.set(
            format!("{}hashes.json", base),
            Reply::Body(serde_json::to_vec(&manifest).unwrap()),
        );
        for (name, data) in files {
            self.set(format!("{}{}", base, name), Reply::Body(data.as_bytes().to_vec()));
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, MirrorError> {
        let count = {
            let mut hits = self.hits.lock().unwrap();
            let count = hits.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let reply = self.replies.lock().unwrap().get(url).cloned();

        let down = || MirrorError::Network {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        };

        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Status(status)) => Err(MirrorError::HttpStatus {
                url: url.to_string(),
                status,
            }),
            Some(Reply::FailTimes(n, body)) => {
                if count <= n {
                    Err(down())
                } else {
                    Ok(body)
                }
            }
            Some(Reply::Slow(delay, body)) => {
                async_std::task::sleep(delay).await;
                Ok(body)
            }
            Some(Reply::Down) => Err(down()),
            None => Err(MirrorError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

pub fn engine(transport: Arc<StubTransport>, root: &std::path::Path, retry: RetryPolicy) -> SyncEngine {
    let fetcher = ContentFetcher::new(transport, LocalRoot::new(root));
    SyncEngine::new(
        fetcher,
        Endpoints::new(PRIMARY, MIRROR),
        HashAlgorithm::Md5,
        retry,
    )
}

pub fn url(base: &str, name: &str) -> String {
    format!("{}{}", base, name)
}
