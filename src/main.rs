use anyhow::Context;
use clap::Parser;
use colored::*;
use log::{error, info};
use nexus_exporter::cli::{Cli, Settings};
use nexus_exporter::client::{NexusApi, NexusClient};
use nexus_exporter::jobs::{AssetsJob, BlobstoresJob, EntitlementJob, StatusJob, SourceJob};
use nexus_exporter::registry::MetricRegistry;
use nexus_exporter::scheduler::Scheduler;
use nexus_exporter::server;
use nexus_exporter::types::JobKind;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn build_scheduler(settings: &Settings, registry: Arc<MetricRegistry>) -> anyhow::Result<Scheduler> {
    let api: Option<Arc<dyn NexusApi>> = match &settings.nexus {
        Some(nexus) => Some(Arc::new(
            NexusClient::new(
                &nexus.base_url,
                nexus.credentials.clone(),
                settings.list_timeout,
                settings.page_timeout,
            )
            .context("Failed to build HTTP client")?,
        )),
        None => None,
    };

    let mut scheduler = Scheduler::new(registry);
    for (kind, interval) in &settings.jobs {
        let job: Arc<dyn SourceJob> = match (kind, &api) {
            (JobKind::Entitlement, _) => Arc::new(EntitlementJob::new(
                settings.entitlement_dir.clone(),
                *interval,
                settings.list_timeout,
            )),
            (JobKind::Assets, Some(api)) => {
                Arc::new(AssetsJob::new(api.clone(), *interval, settings.max_pages))
            }
            (JobKind::Blobstores, Some(api)) => Arc::new(BlobstoresJob::new(api.clone(), *interval)),
            (JobKind::Status, Some(api)) => Arc::new(StatusJob::new(api.clone(), *interval)),
            (kind, None) => anyhow::bail!("job {} needs Nexus settings", kind.as_str()),
        };
        scheduler.add_job(job);
    }
    Ok(scheduler)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = match cli.validate() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e.to_string().red());
            return Err(e.into());
        }
    };

    let registry = Arc::new(MetricRegistry::new());
    let scheduler = build_scheduler(&settings, registry.clone())?;
    info!("Enabled jobs: {}", scheduler.job_names().join(", "));

    let shutdown = CancellationToken::new();
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("Failed to bind {}", settings.listen))?;
    println!(
        "{}",
        format!("Nexus exporter running on http://{}/metrics", settings.listen).green()
    );

    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down");
                signal.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let stopped = shutdown.clone();
    axum::serve(listener, server::router(registry))
        .with_graceful_shutdown(async move { stopped.cancelled().await })
        .await
        .context("HTTP server failed")?;

    shutdown.cancel();
    if let Err(e) = scheduler_handle.await {
        error!("Scheduler task failed: {}", e);
    }
    Ok(())
}
