use crate::engine::SyncEngine;
use async_std::sync::Mutex;
use async_std::task;
use futures::channel::mpsc;
use hashmirror_core::protocol::{PassOutcome, SyncEvent};
use log::debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs sync passes on a fixed interval, one at a time.
///
/// Ticks fire on a fixed schedule regardless of how long a pass takes.
/// A tick that arrives while the previous pass (and its retries) is still
/// running is skipped rather than queued.
#[derive(Clone)]
pub struct Scheduler {
    engine: Arc<Mutex<SyncEngine>>,
    interval: Duration,
    events: Option<mpsc::UnboundedSender<SyncEvent>>,
}

impl Scheduler {
    pub fn new(engine: SyncEngine, interval: Duration) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            interval,
            events: None,
        }
    }

    /// Where skipped ticks are reported.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SyncEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run a pass now unless one is already in progress.
    ///
    /// Returns `None` when the tick was skipped.
    pub async fn tick(&self) -> Option<PassOutcome> {
        let Some(mut engine) = self.engine.try_lock() else {
            if let Some(tx) = &self.events {
                let _ = tx.unbounded_send(SyncEvent::TickSkipped);
            }
            return None;
        };
        Some(engine.run_pass().await)
    }

    /// Tick forever, starting one interval from now.
    ///
    /// The immediate first pass at startup is the caller's job (so it can
    /// finish before the file server comes up).
    pub async fn run(self) {
        let mut next = Instant::now() + self.interval;
        loop {
            task::sleep(next.saturating_duration_since(Instant::now())).await;
            next = next_deadline(next, Instant::now(), self.interval);

            let scheduler = self.clone();
            task::spawn(async move {
                scheduler.tick().await;
            });
        }
    }
}

/// Deadline after the tick due at `due`, observed at `now`.
///
/// Stays on the fixed grid while on time; after a stall (suspend, clock
/// jump) the missed ticks are dropped and the grid restarts from `now`.
fn next_deadline(due: Instant, now: Instant, interval: Duration) -> Instant {
    let next = due + interval;
    if next > now {
        next
    } else {
        debug!("scheduler fell behind by {:?}, dropping missed ticks", now - due);
        now + interval
    }
}
