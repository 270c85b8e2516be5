//! Library-linked scheduled job lifecycle (§4.10, "Library-linked jobs"):
//! creating a library with `settings.auto_scan == true` materializes a
//! paired `library-scan` job, toggling `auto_scan` enables/disables it, and
//! deleting the library deletes it. Not a port in its own right — this is
//! prose-level glue between `LibraryRepository` and `ScheduledJobRepository`
//! that the `setup`/API layer calls directly.

use std::sync::Arc;

use imago_contracts::repositories::{LibraryRepository, ScheduledJobRepository};
use imago_contracts::scheduler::Scheduler;
use imago_model::ids::LibraryId;
use imago_model::library::{Library, DEFAULT_AUTO_SCAN_CRON};
use imago_model::scheduled_job::ScheduledJob;

use crate::error::Result;

pub struct LibraryJobService {
    libraries: Arc<dyn LibraryRepository>,
    jobs: Arc<dyn ScheduledJobRepository>,
    scheduler: Arc<dyn Scheduler>,
}

impl std::fmt::Debug for LibraryJobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryJobService").finish()
    }
}

impl LibraryJobService {
    pub fn new(
        libraries: Arc<dyn LibraryRepository>,
        jobs: Arc<dyn ScheduledJobRepository>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        LibraryJobService {
            libraries,
            jobs,
            scheduler,
        }
    }

    pub async fn create_library(&self, library: Library) -> Result<LibraryId> {
        let auto_scan = library.settings.auto_scan;
        let id = self.libraries.create(library).await?;
        if auto_scan {
            self.materialize_job(id).await?;
        }
        Ok(id)
    }

    async fn materialize_job(&self, library_id: LibraryId) -> Result<()> {
        let job = ScheduledJob::new_library_scan(library_id, DEFAULT_AUTO_SCAN_CRON.to_string());
        let job_id = job.id;
        let cron_expression = job.cron_expression.clone();
        self.jobs.create(job).await?;
        self.scheduler.register(job_id, &cron_expression).await
    }

    /// Called when `settings.auto_scan` flips on an existing library.
    pub async fn set_auto_scan(&self, library_id: LibraryId, enabled: bool) -> Result<()> {
        match self.jobs.get_by_library(library_id).await? {
            Some(job) => self.scheduler.set_enabled(job.id, enabled).await,
            None if enabled => self.materialize_job(library_id).await,
            None => Ok(()),
        }
    }

    pub async fn delete_library(&self, library_id: LibraryId) -> Result<()> {
        if let Some(job) = self.jobs.get_by_library(library_id).await? {
            self.scheduler.unregister(job.id).await?;
            self.jobs.delete(job.id).await?;
        }
        self.libraries.delete(library_id).await
    }
}
