//! One-shot `setup` process (§6): declares exchanges/queues with canonical
//! arguments. Safe to run repeatedly — `declare_topology` is idempotent.

use clap::Parser;
use imago_workers::cli::{init_tracing, CommonArgs};
use imago_workers::Runtime;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "setup", about = "Declare the Imago broker topology")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.common.log_level);

    let runtime = Runtime::connect(&args.common).await?;
    runtime.topology.declare_topology().await?;
    info!("broker topology declared");
    Ok(())
}
