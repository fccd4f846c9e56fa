//! Runs every source job on its own fixed interval until shutdown.
//!
//! Each job loops `Idle -> Running -> (Success | Failed) -> Idle`. Ticks are
//! spaced start-to-start; a cycle that overruns its interval delays the next
//! one (runs of the same job never overlap) and missed ticks are skipped.
//! Jobs never wait on one another.

use crate::aggregate::indicator;
use crate::error::ExporterError;
use crate::jobs::{CycleReport, SourceJob};
use crate::registry::MetricRegistry;
use crate::types::labels;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const JOB_UP: &str = "nexus_exporter_job_up";
pub const JOB_LAST_RUN: &str = "nexus_exporter_job_last_run_timestamp_seconds";
pub const JOB_DURATION: &str = "nexus_exporter_job_duration_seconds";
pub const JOB_FAILURES: &str = "nexus_exporter_job_failures";
pub const FIELD_ERRORS: &str = "nexus_exporter_field_errors";

/// Per-job bookkeeping carried across cycles.
#[derive(Debug, Default, Clone)]
pub struct JobStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub runs: u64,
    pub failures: u64,
}

impl JobStatus {
    pub fn record(&mut self, started: DateTime<Utc>, report: &CycleReport) {
        self.runs += 1;
        self.last_run = Some(started);
        match &report.failure {
            Some(e) => {
                self.failures += 1;
                self.last_error = Some(e.to_string());
            }
            None => self.last_error = None,
        }
    }

    fn publish(&self, registry: &MetricRegistry, job: &str, elapsed_secs: f64, report: &CycleReport) {
        let series = labels([("job", job)]);
        registry.set(JOB_UP, series.clone(), indicator(report.is_success()));
        registry.set(
            JOB_LAST_RUN,
            series.clone(),
            crate::aggregate::epoch_seconds(self.last_run),
        );
        registry.set(JOB_DURATION, series.clone(), elapsed_secs);
        registry.set(JOB_FAILURES, series.clone(), self.failures as f64);
        registry.set(FIELD_ERRORS, series, report.soft_errors as f64);
    }
}

pub struct Scheduler {
    registry: Arc<MetricRegistry>,
    jobs: Vec<Arc<dyn SourceJob>>,
}

impl Scheduler {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self {
            registry,
            jobs: Vec::new(),
        }
    }

    pub fn add_job(&mut self, job: Arc<dyn SourceJob>) {
        self.jobs.push(job);
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|job| job.name()).collect()
    }

    /// Runs until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        describe_job_metrics(&self.registry);

        let handles: Vec<_> = self
            .jobs
            .into_iter()
            .map(|job| {
                job.describe(&self.registry);
                info!("Scheduling job {} every {:?}", job.name(), job.interval());
                tokio::spawn(job_loop(job, self.registry.clone(), shutdown.clone()))
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!("Job loop terminated abnormally: {}", e);
            }
        }
        info!("Scheduler stopped");
    }
}

fn describe_job_metrics(registry: &MetricRegistry) {
    let job = &["job"];
    registry.describe(JOB_UP, "1 if the last cycle of the job succeeded, else 0", job);
    registry.describe(JOB_LAST_RUN, "Start time of the last cycle (epoch seconds)", job);
    registry.describe(JOB_DURATION, "Duration of the last cycle in seconds", job);
    registry.describe(JOB_FAILURES, "Failed cycles since the exporter started", job);
    registry.describe(FIELD_ERRORS, "Malformed fields ignored during the last cycle", job);
}

async fn job_loop(job: Arc<dyn SourceJob>, registry: Arc<MetricRegistry>, shutdown: CancellationToken) {
    let mut tick = tokio::time::interval(job.interval());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut status = JobStatus::default();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tick.tick() => {}
        }

        let started_at = Utc::now();
        let t0 = Instant::now();
        let mut cycle = spawn_cycle(&job, &registry);
        let report = tokio::select! {
            _ = shutdown.cancelled() => {
                cycle.abort();
                break;
            }
            joined = &mut cycle => cycle_report(joined),
        };
        let elapsed = t0.elapsed();

        let previous_error = status.last_error.clone();
        status.record(started_at, &report);
        status.publish(&registry, job.name(), elapsed.as_secs_f64(), &report);

        match (&report.failure, previous_error) {
            (None, Some(previous)) => info!(
                "Job {} recovered on run {} (last error: {})",
                job.name(),
                status.runs,
                previous
            ),
            (None, None) => debug!("Job {} run {} finished in {:?}", job.name(), status.runs, elapsed),
            (Some(e), _) if e.is_transport() => warn!(
                "Job {} could not reach Nexus after {:?} ({} failures so far): {}",
                job.name(),
                elapsed,
                status.failures,
                e
            ),
            (Some(e), _) => error!(
                "Job {} failed after {:?} ({} failures so far): {}",
                job.name(),
                elapsed,
                status.failures,
                e
            ),
        }
        if elapsed > job.interval() {
            warn!(
                "Job {} took {:?}, longer than its {:?} interval",
                job.name(),
                elapsed,
                job.interval()
            );
        }
    }
    debug!("Job {} stopped", job.name());
}

/// Runs one cycle in its own task so a panic only fails that cycle.
pub async fn run_cycle(job: &Arc<dyn SourceJob>, registry: &Arc<MetricRegistry>) -> CycleReport {
    cycle_report(spawn_cycle(job, registry).await)
}

fn spawn_cycle(job: &Arc<dyn SourceJob>, registry: &Arc<MetricRegistry>) -> JoinHandle<CycleReport> {
    let job = job.clone();
    let registry = registry.clone();
    tokio::spawn(async move { job.run(&registry).await })
}

fn cycle_report(joined: Result<CycleReport, JoinError>) -> CycleReport {
    match joined {
        Ok(report) => report,
        Err(e) => {
            error!("Job cycle aborted: {}", e);
            CycleReport::failed(0, ExporterError::Aborted(e.to_string()))
        }
    }
}
