use async_trait::async_trait;
use imago_model::ids::JobId;

use crate::error::Result;

/// Cron engine contract (§4.10). A `ScheduledJobRepository` persists job
/// definitions and history; this trait is the runtime surface that keeps
/// the in-process cron registrations in sync with that storage.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Load all enabled jobs from storage and register them with the cron
    /// engine. Called once at process startup.
    async fn load_all(&self) -> Result<()>;

    /// Register (or replace) a single job's cron registration.
    async fn register(&self, id: JobId, cron_expression: &str) -> Result<()>;

    /// Pause or resume a job's cron registration without deleting history.
    async fn set_enabled(&self, id: JobId, enabled: bool) -> Result<()>;

    /// Unregister a job entirely (its repository row is deleted separately).
    async fn unregister(&self, id: JobId) -> Result<()>;

    /// Enqueue an immediate out-of-cycle run.
    async fn trigger(&self, id: JobId) -> Result<()>;

    /// Execute the handler registered for the job's `jobType` and record
    /// the outcome via `ScheduledJobRepository::record_run`.
    async fn run(&self, id: JobId) -> Result<()>;
}
