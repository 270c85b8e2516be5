//! `CronScheduler` (§4.10): keeps an in-process `croner` registration in
//! sync with the `ScheduledJobRepository`, and runs the single `job_type`
//! handler that exists today (`library-scan`).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use croner::Cron;
use dashmap::DashMap;
use imago_contracts::message_bus::MessageBus;
use imago_contracts::repositories::ScheduledJobRepository;
use imago_contracts::scheduler::Scheduler;
use imago_model::ids::JobId;
use imago_model::messages::{BusMessage, LibraryScanMessage};
use imago_model::scheduled_job::{JobRunStatus, JobType};
use tracing::{error, info, warn};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
struct Registration {
    cron_expression: String,
    enabled: bool,
    /// Watermark for `due_jobs`: the last instant this job was checked (or
    /// registered). A job is due when its cron expression has an occurrence
    /// between this watermark and the current tick, exclusive/inclusive as
    /// `croner::find_next_occurrence`'s `inclusive=false` contract dictates.
    last_checked: DateTime<Utc>,
}

pub struct CronScheduler {
    repository: Arc<dyn ScheduledJobRepository>,
    bus: Arc<dyn MessageBus>,
    registrations: DashMap<JobId, Registration>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("registered", &self.registrations.len())
            .finish()
    }
}

impl CronScheduler {
    pub fn new(repository: Arc<dyn ScheduledJobRepository>, bus: Arc<dyn MessageBus>) -> Self {
        CronScheduler {
            repository,
            bus,
            registrations: DashMap::new(),
        }
    }

    /// Jobs with a cron occurrence between their last check and `now`.
    /// Called by the scheduler process's tick loop; not part of the
    /// `Scheduler` port because it has no storage side effect of its own.
    /// Advances each checked job's watermark to `now` so a tick never fires
    /// the same occurrence twice.
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Vec<JobId> {
        let mut due = Vec::new();
        for mut entry in self.registrations.iter_mut() {
            if !entry.enabled {
                continue;
            }
            let Ok(cron) = Cron::from_str(&entry.cron_expression) else {
                continue;
            };
            if let Ok(next) = cron.find_next_occurrence(&entry.last_checked, false) {
                if next <= now {
                    due.push(*entry.key());
                }
            }
            entry.last_checked = now;
        }
        due
    }

    fn parse(cron_expression: &str) -> Result<Cron> {
        Cron::from_str(cron_expression)
            .map_err(|e| CoreError::Validation(format!("invalid cron expression: {e}")))
    }
}

#[async_trait]
impl Scheduler for CronScheduler {
    async fn load_all(&self) -> Result<()> {
        let jobs = self.repository.list_enabled().await?;
        for job in jobs {
            Self::parse(&job.cron_expression)?;
            self.registrations.insert(
                job.id,
                Registration {
                    cron_expression: job.cron_expression,
                    enabled: job.is_enabled,
                    last_checked: Utc::now(),
                },
            );
        }
        info!(count = self.registrations.len(), "loaded scheduled jobs");
        Ok(())
    }

    async fn register(&self, id: JobId, cron_expression: &str) -> Result<()> {
        Self::parse(cron_expression)?;
        self.registrations.insert(
            id,
            Registration {
                cron_expression: cron_expression.to_string(),
                enabled: true,
                last_checked: Utc::now(),
            },
        );
        Ok(())
    }

    async fn set_enabled(&self, id: JobId, enabled: bool) -> Result<()> {
        self.repository.set_enabled(id, enabled).await?;
        if let Some(mut entry) = self.registrations.get_mut(&id) {
            entry.enabled = enabled;
        } else if enabled {
            if let Some(job) = self.repository.get(id).await? {
                self.register(id, &job.cron_expression).await?;
            }
        }
        Ok(())
    }

    async fn unregister(&self, id: JobId) -> Result<()> {
        self.registrations.remove(&id);
        Ok(())
    }

    async fn trigger(&self, id: JobId) -> Result<()> {
        self.run(id).await
    }

    async fn run(&self, id: JobId) -> Result<()> {
        let Some(job) = self.repository.get(id).await? else {
            return Err(CoreError::NotFound(id.to_string()));
        };

        let started = Instant::now();
        let result = match job.job_type {
            JobType::LibraryScan => self.run_library_scan(&job).await,
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let (status, error_message) = match &result {
            Ok(()) => (JobRunStatus::Succeeded, None),
            Err(e) => {
                error!(job_id = %id, error = %e, "scheduled job run failed");
                (JobRunStatus::Failed, Some(e.to_string()))
            }
        };

        self.repository
            .record_run(id, status, duration_ms, error_message)
            .await?;

        result
    }
}

impl CronScheduler {
    async fn run_library_scan(&self, job: &imago_model::scheduled_job::ScheduledJob) -> Result<()> {
        let Some(library_id) = job.parameters.library_id else {
            warn!(job_id = %job.id, "library-scan job missing libraryId");
            return Err(CoreError::Validation(
                "library-scan job has no libraryId".to_string(),
            ));
        };
        self.bus
            .publish(BusMessage::LibraryScan(LibraryScanMessage { library_id }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imago_contracts::message_bus::MockMessageBus;
    use imago_contracts::repositories::MockScheduledJobRepository;
    use imago_model::ids::LibraryId;
    use imago_model::scheduled_job::ScheduledJob;

    fn scheduler_with(
        repository: MockScheduledJobRepository,
        bus: MockMessageBus,
    ) -> CronScheduler {
        CronScheduler::new(Arc::new(repository), Arc::new(bus))
    }

    #[tokio::test]
    async fn register_rejects_invalid_cron_expression() {
        let scheduler = scheduler_with(MockScheduledJobRepository::new(), MockMessageBus::new());
        let err = scheduler
            .register(JobId::new(), "not a cron expression")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn due_jobs_only_reports_enabled_jobs_whose_time_has_passed() {
        let scheduler = scheduler_with(MockScheduledJobRepository::new(), MockMessageBus::new());
        let due_id = JobId::new();
        let disabled_id = JobId::new();

        scheduler.register(due_id, "* * * * *").await.unwrap();
        scheduler.register(disabled_id, "* * * * *").await.unwrap();
        scheduler.set_enabled_for_test(disabled_id, false);

        let now = Utc::now() + chrono::Duration::minutes(2);
        let due = scheduler.due_jobs(now);

        assert!(due.contains(&due_id));
        assert!(!due.contains(&disabled_id));
    }

    #[tokio::test]
    async fn run_library_scan_publishes_library_scan_message() {
        let mut repository = MockScheduledJobRepository::new();
        let library_id = LibraryId::new();
        let job = ScheduledJob::new_library_scan(library_id, "0 2 * * *".to_string());
        let job_id = job.id;
        let job_for_get = job.clone();

        repository
            .expect_get()
            .returning(move |_| Ok(Some(job_for_get.clone())));
        repository
            .expect_record_run()
            .withf(move |id, status, _, _| *id == job_id && *status == JobRunStatus::Succeeded)
            .returning(|_, _, _, _| Ok(()));

        let mut bus = MockMessageBus::new();
        bus.expect_publish()
            .withf(move |message| {
                matches!(message, BusMessage::LibraryScan(m) if m.library_id == library_id)
            })
            .returning(|_| Ok(()));

        let scheduler = scheduler_with(repository, bus);
        scheduler.run(job_id).await.unwrap();
    }

    #[tokio::test]
    async fn run_library_scan_fails_without_library_id() {
        let mut repository = MockScheduledJobRepository::new();
        let mut job = ScheduledJob::new_library_scan(LibraryId::new(), "0 2 * * *".to_string());
        job.parameters.library_id = None;
        let job_id = job.id;
        let job_for_get = job.clone();

        repository
            .expect_get()
            .returning(move |_| Ok(Some(job_for_get.clone())));
        repository
            .expect_record_run()
            .withf(|_, status, _, _| *status == JobRunStatus::Failed)
            .returning(|_, _, _, _| Ok(()));

        let scheduler = scheduler_with(repository, MockMessageBus::new());
        let err = scheduler.run(job_id).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    impl CronScheduler {
        fn set_enabled_for_test(&self, id: JobId, enabled: bool) {
            if let Some(mut entry) = self.registrations.get_mut(&id) {
                entry.enabled = enabled;
            }
        }
    }
}
