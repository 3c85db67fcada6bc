//! # Hashmirror: The Keeper
//! The `hashmirror` binary syncs a release bundle on a schedule and serves
//! the local copy, or runs a single pass with `hashmirror sync`.

use anyhow::{Context, Result};
use async_std::task;
use clap::Parser;
use colored::*;
use courier::{ContentFetcher, HttpTransport, LocalRoot, Scheduler, SyncEngine};
use futures::channel::mpsc;
use hashmirror::cli::{Cli, Commands};
use hashmirror::report::{self, Console};
use hashmirror::server;
use hashmirror_core::config::MirrorConfig;
use hashmirror_core::protocol::SyncEvent;
use std::sync::Arc;

#[async_std::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = cli.settings.resolve()?;
    let console = Arc::new(Console::new(config.interval()));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, console).await,
        Commands::Sync => {
            if !sync_once(config, console).await? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn build_engine(config: &MirrorConfig, events: mpsc::UnboundedSender<SyncEvent>) -> SyncEngine {
    let transport = Arc::new(HttpTransport::new(config.timeout()));
    let fetcher = ContentFetcher::new(transport, LocalRoot::new(&config.local_root));
    SyncEngine::new(
        fetcher,
        config.endpoints(),
        config.hash_algorithm,
        config.retry_policy(),
    )
    .with_events(events)
}

async fn prepare_root(config: &MirrorConfig) -> Result<()> {
    LocalRoot::new(&config.local_root)
        .ensure()
        .await
        .with_context(|| format!("Failed to create {}", config.local_root.display()))
}

async fn sync_once(config: MirrorConfig, console: Arc<Console>) -> Result<bool> {
    prepare_root(&config).await?;

    let (tx, rx) = mpsc::unbounded();
    let reporter = task::spawn(report::drain(console, rx));

    let mut engine = build_engine(&config, tx);
    let outcome = engine.run_pass().await;
    drop(engine);
    reporter.await;

    Ok(outcome.is_success())
}

async fn serve(config: MirrorConfig, console: Arc<Console>) -> Result<()> {
    console.banner();
    console.line(format!(
        "{} {}",
        "Serving directory:".bright_cyan(),
        config.local_root.display()
    ));
    console.line(format!(
        "{} http://{}{}",
        "Listening on:".bright_cyan(),
        config.listen_addr,
        config.route_prefix
    ));
    prepare_root(&config).await?;

    {
        let console = console.clone();
        ctrlc::set_handler(move || {
            console.line("Shutting down".yellow());
            std::process::exit(0);
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let (tx, rx) = mpsc::unbounded();
    task::spawn(report::drain(console.clone(), rx));

    let scheduler =
        Scheduler::new(build_engine(&config, tx.clone()), config.interval()).with_events(tx);

    console.line("File server will start after the first update".yellow());
    scheduler.tick().await;
    task::spawn(scheduler.run());

    let app = server::build_app(&config.local_root, &config.route_prefix, console.clone())
        .with_context(|| format!("Failed to serve {}", config.local_root.display()))?;
    console.line("File server started".green());
    app.listen(config.listen_addr.clone())
        .await
        .with_context(|| format!("Failed to listen on {}", config.listen_addr))?;
    Ok(())
}
