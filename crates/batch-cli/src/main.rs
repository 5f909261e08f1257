//! `batch-dl`: download every linked item of a spreadsheet manifest, grouped
//! into one folder per group, and tag the mp3 results.
//!
//! Anything not given on the command line (source, concurrency, group) is
//! asked for on the console.

mod cli;
mod prompt;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use batch_downloader::{
    AssetFetcher, AssetResolver, BatchOrchestrator, DownloaderConfig, EventBus, GroupProcessor,
    HttpTransport, LoftyTagWriter, ManifestSource, Transport, manifest, render_summary,
};
use batch_types::{FetchEvent, GroupSelection, OutcomeTally};
use clap::Parser;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::prompt::Prompter;

/// Used when `RUST_LOG` is unset. Logs go to stderr; stdout carries progress.
const DEFAULT_LOG_FILTER: &str = "warn,batch_downloader=info,batch_dl=info";

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();

    tokio::select! {
        result = run(args) => result,
        () = cancel_requested(tokio::signal::ctrl_c()) => {
            println!("\nProcess cancelled by user.");
            // A prompt may still be blocked on stdin; don't wait for it.
            std::process::exit(0);
        }
    }
}

/// Resolves when the user interrupts. If the handler cannot be installed the
/// run keeps going and this never resolves.
async fn cancel_requested(signal: impl Future<Output = io::Result<()>>) {
    if let Err(err) = signal.await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable, running to completion");
        std::future::pending::<()>().await;
    }
}

async fn run(args: cli::Args) -> Result<()> {
    let cfg = match args.config.as_ref() {
        Some(path) => DownloaderConfig::load(path)?,
        None => DownloaderConfig::default(),
    };
    let endpoints = cfg.endpoints()?;
    let transport: Arc<dyn Transport> = Arc::new(
        HttpTransport::new(cfg.user_agent.as_deref()).context("build http client")?,
    );

    let source = match args.source.as_deref() {
        Some(source) => ManifestSource::parse(source),
        None => prompt(|p| p.source()).await?,
    };
    let concurrency = match args.concurrency.or(cfg.concurrency()?) {
        Some(limit) => limit,
        None => prompt(|p| p.concurrency()).await?,
    };
    println!("\nWill download up to {concurrency} files simultaneously.");

    let manifest = manifest::load(&source, transport.as_ref())
        .await
        .context("load manifest")?;

    let selection = if args.all {
        GroupSelection::All
    } else if let Some(group) = args.group {
        GroupSelection::One(group)
    } else {
        let groups = manifest.groups.clone();
        prompt(move |p| p.group(&groups)).await?
    };

    let download_dir = args.download_dir.unwrap_or_else(|| cfg.download_dir());
    tracing::info!(
        download_dir = %download_dir.display(),
        concurrency = concurrency.get(),
        "starting batch"
    );

    let events = EventBus::default();
    let printer = spawn_event_printer(events.subscribe());
    let fetcher = AssetFetcher::new(AssetResolver::new(endpoints), transport, events.clone());
    let processor = GroupProcessor::new(
        fetcher,
        Arc::new(LoftyTagWriter::new(cfg.comment())),
        events.clone(),
        download_dir,
        concurrency,
    );
    let orchestrator = BatchOrchestrator::new(processor, cfg.max_group_concurrency());
    let tally = orchestrator.run(&manifest.rows, &selection).await;

    // Dropping every sender lets the printer drain and stop.
    drop(orchestrator);
    drop(events);
    let _ = printer.await;

    print!("{}", render_summary(&tally));
    if let Some(path) = args.report.as_deref() {
        write_report(path, &tally)?;
    }
    Ok(())
}

/// Run a console prompt off the async workers; stdin reads block.
async fn prompt<T, F>(ask: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Prompter<io::StdinLock<'static>, io::Stdout>) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
        ask(&mut prompter)
    })
    .await
    .context("prompt task")?
}

fn spawn_event_printer(mut rx: broadcast::Receiver<FetchEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => println!("{event}"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "progress output fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn write_report(path: &Path, tally: &OutcomeTally) -> Result<()> {
    let json = serde_json::to_string_pretty(tally).context("serialize report")?;
    std::fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}
