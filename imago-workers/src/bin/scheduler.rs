//! Long-running `scheduler` process (§6): on startup, loads every enabled
//! `ScheduledJob` and registers it with the cron engine; every tick, runs
//! whatever jobs are due. No arguments for the scheduled jobs themselves —
//! they live in the database (§4.10).

use std::time::Duration;

use clap::Parser;
use imago_contracts::scheduler::Scheduler;
use imago_workers::cli::{init_tracing, CommonArgs};
use imago_workers::Runtime;
use tracing::{error, info};

const TICK_INTERVAL: Duration = Duration::from_secs(30);
const CONNECT_RETRY_BUDGET: u32 = 5;
const CONNECT_RETRY_BASE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "scheduler", about = "Runs cron-driven library scans")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(&args.common.log_level);

    let runtime = match connect_with_retry(&args.common).await {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "broker unreachable after retry budget");
            std::process::exit(3);
        }
    };

    if let Err(err) = runtime.scheduler.load_all().await {
        error!(error = %err, "failed to load scheduled jobs");
        std::process::exit(2);
    }

    info!("scheduler started");

    let mut shutdown = std::pin::pin!(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            _ = tokio::time::sleep(TICK_INTERVAL) => {
                run_due_jobs(&runtime).await;
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }
}

async fn run_due_jobs(runtime: &Runtime) {
    let due = runtime.scheduler.due_jobs(chrono::Utc::now());
    for job_id in due {
        if let Err(err) = runtime.scheduler.run(job_id).await {
            error!(job_id = %job_id, error = %err, "scheduled job run failed");
        }
    }
}

async fn connect_with_retry(args: &CommonArgs) -> anyhow::Result<Runtime> {
    let mut attempt = 0;
    loop {
        match Runtime::connect(args).await {
            Ok(runtime) => return Ok(runtime),
            Err(err) if attempt + 1 >= CONNECT_RETRY_BUDGET => return Err(err),
            Err(err) => {
                attempt += 1;
                error!(attempt, error = %err, "connect failed, retrying");
                tokio::time::sleep(CONNECT_RETRY_BASE * attempt).await;
            }
        }
    }
}
