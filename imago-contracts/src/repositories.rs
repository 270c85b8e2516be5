use async_trait::async_trait;
use imago_model::ids::{JobId, LibraryId};
use imago_model::library::Library;
use imago_model::scheduled_job::{JobRunStatus, ScheduledJob, ScheduledJobRun};

use crate::error::Result;

/// Repository port for library management (§3, §4.10). Implementations live
/// in infra adapters; must not leak infra types into orchestration code.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn create(&self, library: Library) -> Result<LibraryId>;

    async fn get(&self, id: LibraryId) -> Result<Option<Library>>;

    async fn list(&self) -> Result<Vec<Library>>;

    async fn update(&self, id: LibraryId, library: Library) -> Result<()>;

    /// Deletes the library; cascades removal of its paired scheduled job,
    /// never its collections (§3).
    async fn delete(&self, id: LibraryId) -> Result<()>;
}

/// Repository port for cron-registered jobs and their append-only run
/// history (§4.10).
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ScheduledJobRepository: Send + Sync {
    async fn create(&self, job: ScheduledJob) -> Result<JobId>;

    async fn get(&self, id: JobId) -> Result<Option<ScheduledJob>>;

    async fn get_by_library(
        &self,
        library_id: LibraryId,
    ) -> Result<Option<ScheduledJob>>;

    async fn list_enabled(&self) -> Result<Vec<ScheduledJob>>;

    async fn set_enabled(&self, id: JobId, enabled: bool) -> Result<()>;

    async fn delete(&self, id: JobId) -> Result<()>;

    /// Appends a [`ScheduledJobRun`] and bumps the job's rolled-up counters
    /// in the same write.
    async fn record_run(
        &self,
        id: JobId,
        status: JobRunStatus,
        duration_ms: u64,
        error_message: Option<String>,
    ) -> Result<()>;

    async fn list_runs(
        &self,
        id: JobId,
        limit: u64,
    ) -> Result<Vec<ScheduledJobRun>>;
}
