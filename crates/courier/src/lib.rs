//! # Courier: The Mirror Keeper
//!
//! **Manifest-driven mirroring of a remote release bundle, with endpoint failover.**
//!
//! Courier keeps a local directory in step with a remote `hashes.json`
//! manifest (relative file name -> hex digest). Every pass downloads the
//! manifest, hashes each local file, and fetches only what differs. When the
//! primary endpoint cannot produce a manifest, the pass fails over to the
//! mirror.
//!
//! ## Core Features
//!
//! - **Failover**: primary first, mirror once, then back to primary for the next pass.
//! - **Best-effort sweep**: a failed download never stops the other entries.
//! - **Bounded retry**: incomplete passes re-run with exponential backoff.
//! - **Atomic writes**: assets are renamed into place, never served half-written.
//!
//! ## Usage
//!
//! ### 1. One Pass
//!
//! ```no_run
//! use courier::{ContentFetcher, HttpTransport, LocalRoot, SyncEngine};
//! use hashmirror_core::config::MirrorConfig;
//! use std::sync::Arc;
//!
//! #[async_std::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MirrorConfig::default();
//!     let root = LocalRoot::new(&config.local_root);
//!     root.ensure().await?;
//!
//!     let fetcher = ContentFetcher::new(Arc::new(HttpTransport::new(config.timeout())), root);
//!     let mut engine = SyncEngine::new(
//!         fetcher,
//!         config.endpoints(),
//!         config.hash_algorithm,
//!         config.retry_policy(),
//!     );
//!
//!     let outcome = engine.run_pass().await;
//!     println!("synced: {}", outcome.is_success());
//!     Ok(())
//! }
//! ```
//!
//! ### 2. Event-Based Progress
//!
//! ```no_run
//! # use courier::SyncEngine;
//! use futures::StreamExt;
//! use hashmirror_core::protocol::SyncEvent;
//!
//! # async fn watch(mut engine: SyncEngine) {
//! let mut events = engine.subscribe();
//! async_std::task::spawn(async move {
//!     while let Some(event) = events.next().await {
//!         if let SyncEvent::FileUpdated(name) = event {
//!             println!("updated {}", name);
//!         }
//!     }
//! });
//! engine.run_pass().await;
//! # }
//! ```

/// The reconciliation pass and its failover state.
pub mod engine;

/// Download-and-store for a single resource.
pub mod fetcher;

/// Interval ticking with a single-pass-at-a-time guard.
pub mod scheduler;

/// The local root: path mapping, hashing and atomic writes.
pub mod storage;

/// HTTP access behind a small trait.
pub mod transport;

pub use engine::SyncEngine;
pub use fetcher::ContentFetcher;
pub use scheduler::Scheduler;
pub use storage::LocalRoot;
pub use transport::{HttpTransport, Transport};
