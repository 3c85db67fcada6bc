use crate::fetcher::ContentFetcher;
use async_std::task;
use futures::channel::mpsc;
use hashmirror_core::config::RetryPolicy;
use hashmirror_core::hash::HashAlgorithm;
use hashmirror_core::manifest::{Endpoint, EndpointKind, Endpoints, Manifest, MANIFEST_NAME};
use hashmirror_core::protocol::{PassOutcome, PassReport, SyncEvent};
use log::{error, warn};

/// Reconciles the local root against the remote manifest.
///
/// The engine owns its failover state: `active` says which endpoint the
/// current pass is talking to. A pass that had to fall back to the mirror
/// hands control back to the primary once it ends, so every pass starts
/// from the primary.
pub struct SyncEngine {
    fetcher: ContentFetcher,
    endpoints: Endpoints,
    active: EndpointKind,
    algorithm: HashAlgorithm,
    retry: RetryPolicy,
    events: Option<mpsc::UnboundedSender<SyncEvent>>,
}

impl SyncEngine {
    pub fn new(
        fetcher: ContentFetcher,
        endpoints: Endpoints,
        algorithm: HashAlgorithm,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            active: EndpointKind::Primary,
            algorithm,
            retry,
            events: None,
        }
    }

    /// Stream of progress events for every pass run from now on.
    ///
    /// Replaces any earlier subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SyncEvent> {
        let (tx, rx) = mpsc::unbounded();
        self.events = Some(tx);
        rx
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<SyncEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn active_endpoint(&self) -> EndpointKind {
        self.active
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = tx.unbounded_send(event);
        }
    }

    /// Run one pass to completion, including retries.
    ///
    /// Failed downloads re-run the whole pass with exponential backoff
    /// until the retry policy is exhausted. Manifest failures end the pass
    /// straight away; the next scheduled tick tries again.
    pub async fn run_pass(&mut self) -> PassOutcome {
        let mut attempt = 1;
        let outcome = loop {
            self.emit(SyncEvent::PassStarted { attempt });
            let outcome = self.attempt(attempt).await;

            match outcome {
                PassOutcome::Incomplete(_) if self.retry.should_retry(attempt) => {
                    let delay = self.retry.backoff(attempt);
                    attempt += 1;
                    self.emit(SyncEvent::RetryScheduled { attempt, delay });
                    if !delay.is_zero() {
                        task::sleep(delay).await;
                    }
                }
                other => break other,
            }
        };

        self.active = EndpointKind::Primary;
        self.emit(SyncEvent::PassFinished(outcome.clone()));
        outcome
    }

    async fn attempt(&mut self, attempt: u32) -> PassOutcome {
        let manifest = match self.acquire_manifest().await {
            Ok(manifest) => manifest,
            Err(outcome) => return outcome,
        };

        let endpoint = self.endpoints.get(self.active).clone();
        let mut report = PassReport::new(self.active, attempt);
        if manifest.is_empty() {
            warn!("{} from the {} endpoint lists no files", MANIFEST_NAME, self.active);
        }
        self.emit(SyncEvent::SweepStarted {
            total: manifest.len(),
        });

        for (name, expected) in manifest.iter() {
            self.reconcile(&endpoint, name, expected, &mut report).await;
        }

        if report.is_complete() {
            PassOutcome::Synced(report)
        } else {
            PassOutcome::Incomplete(report)
        }
    }

    /// Bring one manifest entry up to date. Never aborts the sweep.
    async fn reconcile(
        &self,
        endpoint: &Endpoint,
        name: &str,
        expected: &str,
        report: &mut PassReport,
    ) {
        let root = self.fetcher.root();
        let path = match root.resolve(name) {
            Ok(path) => path,
            Err(e) => {
                warn!("skipping manifest entry: {}", e);
                report.rejected.push(name.to_string());
                self.emit(SyncEvent::FileRejected {
                    name: name.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let current = root.digest(&path, self.algorithm).await;
        if current.is_some_and(|digest| digest.eq_ignore_ascii_case(expected.trim())) {
            report.current.push(name.to_string());
            self.emit(SyncEvent::FileCurrent(name.to_string()));
            return;
        }

        self.emit(SyncEvent::FileFetching(name.to_string()));
        match self
            .fetcher
            .fetch(endpoint, name, self.algorithm, expected)
            .await
        {
            Ok(_) => {
                report.updated.push(name.to_string());
                self.emit(SyncEvent::FileUpdated(name.to_string()));
            }
            Err(e) => {
                if e.is_remote() {
                    warn!("{}", e);
                } else {
                    error!("{}", e);
                }
                report.failed.push((name.to_string(), e.to_string()));
                self.emit(SyncEvent::FileFailed {
                    name: name.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    /// Fetch and parse the manifest, failing over from primary to mirror
    /// at most once.
    async fn acquire_manifest(&mut self) -> Result<Manifest, PassOutcome> {
        loop {
            let endpoint = self.endpoints.get(self.active).clone();
            self.emit(SyncEvent::ManifestFetching {
                endpoint: endpoint.kind,
                url: endpoint.url_for(MANIFEST_NAME),
            });

            let body = match self.fetcher.retrieve(&endpoint, MANIFEST_NAME).await {
                Ok(body) => body,
                Err(e) => {
                    self.emit(SyncEvent::ManifestUnavailable {
                        endpoint: endpoint.kind,
                        error: e.to_string(),
                    });
                    match self.active {
                        EndpointKind::Primary => {
                            self.active = EndpointKind::Mirror;
                            self.emit(SyncEvent::FailingOver {
                                from: EndpointKind::Primary,
                                to: EndpointKind::Mirror,
                            });
                            continue;
                        }
                        EndpointKind::Mirror => {
                            self.active = EndpointKind::Primary;
                            return Err(PassOutcome::ManifestUnavailable);
                        }
                    }
                }
            };

            return match Manifest::from_json(&body) {
                Ok(manifest) => {
                    // Only a manifest that parsed replaces the served copy.
                    if let Err(e) = self.fetcher.store(MANIFEST_NAME, &body).await {
                        warn!("could not persist {}: {}", MANIFEST_NAME, e);
                    }
                    Ok(manifest)
                }
                Err(e) => {
                    self.emit(SyncEvent::ManifestInvalid {
                        endpoint: endpoint.kind,
                        error: e.to_string(),
                    });
                    self.active = EndpointKind::Primary;
                    Err(PassOutcome::ManifestInvalid {
                        endpoint: endpoint.kind,
                    })
                }
            };
        }
    }
}
