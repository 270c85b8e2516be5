//! `croner`-backed `Scheduler` and library-linked job lifecycle (§4.10).

mod cron;
mod library_jobs;

pub use self::cron::CronScheduler;
pub use library_jobs::LibraryJobService;
