use std::collections::HashMap;

use chrono::{DateTime, Utc};
use crate::ids::{JobId, LibraryId};

/// The handler a [`ScheduledJob`] dispatches to on `Run`. Only one variant
/// exists today (§4.10); modeled as an enum rather than a free-form string
/// so unknown job types fail to deserialize instead of silently no-op'ing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum JobType {
    LibraryScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JobRunStatus {
    Succeeded,
    Failed,
    Running,
}

/// A cron-registered recurring job with execution history. Append-only
/// [`ScheduledJobRun`]s are owned separately; the job document itself only
/// carries the rolled-up counters (§3).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduledJob {
    pub id: JobId,
    pub job_type: JobType,
    pub cron_expression: String,
    pub parameters: JobParameters,
    pub is_enabled: bool,
    pub run_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_status: Option<JobRunStatus>,
    pub last_run_duration_ms: Option<u64>,
    pub last_error_message: Option<String>,
    pub next_run_at: Option<DateTime<Utc>>,
}

/// Parameters a job handler needs. `library_id` is the only field the
/// current `library-scan` handler reads; `extra` carries forward anything a
/// future job type might need without a schema migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobParameters {
    pub library_id: Option<LibraryId>,
    pub extra: HashMap<String, String>,
}

impl ScheduledJob {
    pub fn new_library_scan(library_id: LibraryId, cron_expression: String) -> Self {
        ScheduledJob {
            id: JobId::new(),
            job_type: JobType::LibraryScan,
            cron_expression,
            parameters: JobParameters {
                library_id: Some(library_id),
                extra: HashMap::new(),
            },
            is_enabled: true,
            run_count: 0,
            success_count: 0,
            failure_count: 0,
            last_run_at: None,
            last_run_status: None,
            last_run_duration_ms: None,
            last_error_message: None,
            next_run_at: None,
        }
    }

    /// Record the outcome of a run: exactly one of `Succeeded | Failed` is
    /// final, duration is never negative.
    pub fn record_run(
        &mut self,
        status: JobRunStatus,
        duration_ms: u64,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.run_count += 1;
        match status {
            JobRunStatus::Succeeded => self.success_count += 1,
            JobRunStatus::Failed => self.failure_count += 1,
            JobRunStatus::Running => {}
        }
        self.last_run_at = Some(now);
        self.last_run_status = Some(status);
        self.last_run_duration_ms = Some(duration_ms);
        self.last_error_message = error_message;
    }
}

/// One append-only row in a job's run history.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduledJobRun {
    pub job_id: JobId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: JobRunStatus,
    pub duration_ms: u64,
    pub error_message: Option<String>,
}
