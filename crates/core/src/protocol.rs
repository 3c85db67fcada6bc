use crate::manifest::EndpointKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Progress of a sync pass, streamed to whoever renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncEvent {
    /// A pass (or a retry of one) is starting
    PassStarted { attempt: u32 },
    /// Requesting the manifest from an endpoint
    ManifestFetching { endpoint: EndpointKind, url: String },
    /// The manifest could not be retrieved from this endpoint
    ManifestUnavailable { endpoint: EndpointKind, error: String },
    /// Switching the active endpoint after a manifest failure
    FailingOver { from: EndpointKind, to: EndpointKind },
    /// The manifest was retrieved but is not valid JSON of strings
    ManifestInvalid { endpoint: EndpointKind, error: String },
    /// Reconciling `total` manifest entries against the local root
    SweepStarted { total: usize },
    FileCurrent(String),
    FileFetching(String),
    FileUpdated(String),
    FileFailed { name: String, error: String },
    /// The name would escape the local root and was skipped
    FileRejected { name: String, error: String },
    /// Some downloads failed; the pass will run again after `delay`
    RetryScheduled { attempt: u32, delay: Duration },
    /// The pass is over, including all retries
    PassFinished(PassOutcome),
    /// A scheduled tick found the previous pass still running
    TickSkipped,
}

/// What happened to each manifest entry during one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Endpoint the manifest and files came from
    pub endpoint: EndpointKind,
    /// 1-based attempt number within the pass
    pub attempts: u32,
    /// Entries downloaded in this attempt
    pub updated: Vec<String>,
    /// Entries whose local hash already matched
    pub current: Vec<String>,
    /// Entries whose download failed, with the reason
    pub failed: Vec<(String, String)>,
    /// Entries skipped because their name is unsafe
    pub rejected: Vec<String>,
}

impl PassReport {
    pub fn new(endpoint: EndpointKind, attempts: u32) -> Self {
        Self {
            endpoint,
            attempts,
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Final result of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassOutcome {
    /// Every entry that needed an update was downloaded
    Synced(PassReport),
    /// Downloads were still failing when the retry budget ran out
    Incomplete(PassReport),
    /// Neither endpoint produced a manifest
    ManifestUnavailable,
    /// The manifest body could not be parsed
    ManifestInvalid { endpoint: EndpointKind },
}

impl PassOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PassOutcome::Synced(_))
    }

    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Synced(report) | PassOutcome::Incomplete(report) => Some(report),
            _ => None,
        }
    }
}
