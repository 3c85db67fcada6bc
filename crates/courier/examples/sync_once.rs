use courier::{ContentFetcher, HttpTransport, LocalRoot, SyncEngine};
use futures::StreamExt;
use hashmirror_core::config::MirrorConfig;
use hashmirror_core::protocol::SyncEvent;
use std::error::Error;
use std::sync::Arc;

#[async_std::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = MirrorConfig::default();
    let root = LocalRoot::new(&config.local_root);
    root.ensure().await?;

    println!("Mirroring {} into {:?}", config.primary_url, config.local_root);

    let fetcher = ContentFetcher::new(Arc::new(HttpTransport::new(config.timeout())), root);
    let mut engine = SyncEngine::new(
        fetcher,
        config.endpoints(),
        config.hash_algorithm,
        config.retry_policy(),
    );

    let mut events = engine.subscribe();
    let printer = async_std::task::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                SyncEvent::ManifestFetching { url, .. } => println!("Manifest: {}", url),
                SyncEvent::FailingOver { to, .. } => println!("Failing over to {}", to),
                SyncEvent::FileCurrent(name) => println!("  = {}", name),
                SyncEvent::FileUpdated(name) => println!("  + {}", name),
                SyncEvent::FileFailed { name, error } => eprintln!("  ! {} ({})", name, error),
                SyncEvent::PassFinished(outcome) => {
                    println!("Finished, success: {}", outcome.is_success());
                    break;
                }
                _ => {}
            }
        }
    });

    engine.run_pass().await;
    printer.await;
    Ok(())
}
