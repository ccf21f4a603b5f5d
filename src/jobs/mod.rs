//! Asynchronous background jobs.
//!
//! Handlers enqueue serializable job payloads; a worker task drains the
//! queue and runs each job with at-least-once semantics: up to
//! [`MAX_ATTEMPTS`] tries, then a terminal `failed` hook. Jobs re-fetch
//! whatever data they need rather than trusting request-time snapshots,
//! with one deliberate exception: the acting user's identity is captured
//! at enqueue time and authorization is re-checked against that capture,
//! never against a live session.

pub mod bulk_update;
pub mod notify;
pub mod report;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::mailer::Mailer;
use crate::storage::{LocalStorage, StorageError};

pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Other(String),
}

/// Everything a job may touch while running.
#[derive(Clone)]
pub struct JobContext {
    pub pool: SqlitePool,
    pub storage: LocalStorage,
    pub mailer: Mailer,
    pub queue: JobQueue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum Job {
    Notify(notify::NotifyTask),
    BulkUpdate(bulk_update::BulkUpdateTasks),
    GenerateReport(report::GenerateTaskReport),
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::Notify(_) => "notify",
            Job::BulkUpdate(_) => "bulk_update",
            Job::GenerateReport(_) => "generate_report",
        }
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), JobError> {
        match self {
            Job::Notify(job) => job.run(ctx).await,
            Job::BulkUpdate(job) => job.run(ctx).await,
            Job::GenerateReport(job) => job.run(ctx).await,
        }
    }

    /// Terminal hook, fired once after the last failed attempt.
    async fn failed(&self, ctx: &JobContext, error: &JobError) {
        match self {
            Job::Notify(job) => job.failed(error),
            Job::BulkUpdate(job) => job.failed(error),
            Job::GenerateReport(job) => job.failed(ctx, error).await,
        }
    }
}

/// Handle used to enqueue jobs. Cloneable; the receiving end lives in the
/// worker spawned by [`spawn_worker`].
#[derive(Clone)]
pub struct JobQueue {
    tx: UnboundedSender<Job>,
}

impl JobQueue {
    pub fn new() -> (Self, UnboundedReceiver<Job>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue failures are logged and never surfaced to the caller.
    pub fn dispatch(&self, job: Job) {
        let name = job.name();
        if let Err(e) = self.tx.send(job) {
            error!("Failed to enqueue {} job: {}", name, e);
        }
    }
}

pub fn spawn_worker(mut rx: UnboundedReceiver<Job>, ctx: JobContext) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            run_with_retries(&job, &ctx).await;
        }
    })
}

async fn run_with_retries(job: &Job, ctx: &JobContext) {
    let mut attempt = 1;
    loop {
        match job.run(ctx).await {
            Ok(()) => {
                info!("{} job finished on attempt {}", job.name(), attempt);
                return;
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!("{} job attempt {} failed: {}", job.name(), attempt, e);
                attempt += 1;
            }
            Err(e) => {
                error!("{} job failed after {} attempts: {}", job.name(), attempt, e);
                job.failed(ctx, &e).await;
                return;
            }
        }
    }
}
