//! `worker` process (§6): N-way concurrent consumers over the queues that
//! carry per-item scan/render work. Idempotent restarts — every handler is
//! safe to run twice over the same message.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use futures::StreamExt;
use imago_contracts::message_bus::QueueName;
use imago_core::ProcessOutcome;
use imago_model::messages::BusMessage;
use imago_model::scan::ScanRequest;
use imago_workers::cli::{init_tracing, CommonArgs};
use imago_workers::Runtime;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
};
use lapin::types::FieldTable;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum WorkerQueue {
    CollectionScan,
    ImageProcessing,
    ThumbnailGeneration,
    CacheGeneration,
    LibraryScan,
}

impl WorkerQueue {
    fn queue_name(self) -> QueueName {
        match self {
            WorkerQueue::CollectionScan => QueueName::CollectionScan,
            WorkerQueue::ImageProcessing => QueueName::ImageProcessing,
            WorkerQueue::ThumbnailGeneration => QueueName::ThumbnailGeneration,
            WorkerQueue::CacheGeneration => QueueName::CacheGeneration,
            WorkerQueue::LibraryScan => QueueName::LibraryScan,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "worker", about = "Consumes scan and rendition queues")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Queues to consume; defaults to all of them.
    #[arg(long, value_enum, num_args = 1..)]
    queues: Option<Vec<WorkerQueue>>,

    /// Concurrent in-flight messages per queue.
    #[arg(long, env = "IMAGO_WORKER_COUNT")]
    concurrency: Option<usize>,

    /// Overrides every message's `forceRegenerate` flag to true.
    #[arg(long)]
    force_regenerate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.common.log_level);

    let runtime = Arc::new(Runtime::connect(&args.common).await?);
    let concurrency = args.concurrency.unwrap_or(runtime.config.workers.count);
    let queues = args.queues.unwrap_or_else(|| {
        vec![
            WorkerQueue::CollectionScan,
            WorkerQueue::ImageProcessing,
            WorkerQueue::ThumbnailGeneration,
            WorkerQueue::CacheGeneration,
            WorkerQueue::LibraryScan,
        ]
    });

    let amqp_conn = lapin::Connection::connect(
        &runtime.config.broker.url,
        lapin::ConnectionProperties::default(),
    )
    .await?;

    let mut handles = Vec::new();
    for queue in queues {
        let channel = amqp_conn.create_channel().await?;
        channel
            .basic_qos(concurrency as u16, BasicQosOptions::default())
            .await?;
        let runtime = runtime.clone();
        let force_regenerate = args.force_regenerate;
        handles.push(tokio::spawn(async move {
            if let Err(err) = consume(channel, queue, runtime, force_regenerate, concurrency).await
            {
                error!(queue = ?queue, error = %err, "consumer loop exited");
            }
        }));
    }

    info!(count = handles.len(), "worker consumers started");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    Ok(())
}

async fn consume(
    channel: lapin::Channel,
    queue: WorkerQueue,
    runtime: Arc<Runtime>,
    force_regenerate: bool,
    concurrency: usize,
) -> anyhow::Result<()> {
    let mut consumer = channel
        .basic_consume(
            queue.queue_name().queue_name(),
            "imago-worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(err) => {
                warn!(error = %err, "delivery error");
                continue;
            }
        };
        let permits = permits.clone();
        let runtime = runtime.clone();
        tokio::spawn(async move {
            let _permit = permits.acquire_owned().await;
            let redelivered = delivery.redelivered;
            let outcome = handle_message(&runtime, queue, &delivery.data, force_regenerate).await;
            match outcome {
                Ok(ProcessOutcome::Ack) => {
                    let _ = delivery.ack(BasicAckOptions::default()).await;
                }
                Ok(ProcessOutcome::AckFailed { reason }) => {
                    warn!(reason, "processing failed, acking without requeue");
                    let _ = delivery.ack(BasicAckOptions::default()).await;
                }
                Ok(ProcessOutcome::NackRequeue { reason }) => {
                    let requeue = !redelivered;
                    warn!(reason, requeue, "nacking for retry");
                    let _ = delivery
                        .nack(BasicNackOptions {
                            requeue,
                            ..Default::default()
                        })
                        .await;
                }
                Err(err) => {
                    error!(error = %err, "unhandled error processing message");
                    let _ = delivery
                        .nack(BasicNackOptions {
                            requeue: false,
                            ..Default::default()
                        })
                        .await;
                }
            }
        });
    }
    Ok(())
}

async fn handle_message(
    runtime: &Runtime,
    queue: WorkerQueue,
    body: &[u8],
    force_regenerate: bool,
) -> anyhow::Result<ProcessOutcome> {
    let message: BusMessage = serde_json::from_slice(body)?;
    let outcome = match (queue, message) {
        (WorkerQueue::CollectionScan, BusMessage::CollectionScan(mut m)) => {
            if force_regenerate {
                m.force_regenerate = true;
            }
            let request = ScanRequest {
                collection_id: Some(m.collection_id),
                library_id: None,
                overwrite_existing: m.overwrite_existing,
                force_regenerate: m.force_regenerate,
            };
            runtime.orchestrator.handle(request).await?;
            ProcessOutcome::Ack
        }
        (WorkerQueue::LibraryScan, BusMessage::LibraryScan(m)) => {
            let request = ScanRequest::for_library(m.library_id);
            runtime.orchestrator.handle(request).await?;
            ProcessOutcome::Ack
        }
        (WorkerQueue::ImageProcessing, BusMessage::ImageProcessing(m)) => {
            runtime.image_processing_worker.process(&m).await?
        }
        (WorkerQueue::ThumbnailGeneration, BusMessage::ThumbnailGeneration(m)) => {
            runtime.thumbnail_worker.process(&m).await?
        }
        (WorkerQueue::CacheGeneration, BusMessage::CacheGeneration(m)) => {
            runtime.cache_worker.process(&m).await?
        }
        (queue, message) => {
            warn!(?queue, ?message, "message routed to unexpected queue");
            ProcessOutcome::AckFailed {
                reason: "message type does not match queue".to_string(),
            }
        }
    };
    Ok(outcome)
}
