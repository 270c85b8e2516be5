//! Wires an [`ImagoConfig`] into live broker/database/index connections and
//! the concrete `imago-core` adapters. Every binary (`scheduler`, `worker`,
//! `setup`) starts from the same [`Runtime::connect`].

use std::sync::Arc;

use imago_config::{ConfigLoader, ConfigLoaderOptions, ImagoConfig};
use imago_contracts::collection_store::CollectionStore;
use imago_contracts::message_bus::{BrokerTopology, MessageBus};
use imago_contracts::navigation_index::NavigationIndex;
use imago_contracts::repositories::{LibraryRepository, ScheduledJobRepository};
use imago_core::{
    CacheWorker, CompositeArchiveReader, CronScheduler, ImageProcessingWorker, LapinMessageBus,
    LapinTopology, LibraryJobService, MongoCollectionStore, MongoLibraryRepository,
    MongoScheduledJobRepository, RedisNavigationIndex, ScanOrchestrator, StdImageCodec,
    ThumbnailWorker, WalkingFileScanner,
};
use mongodb::Client as MongoClient;
use redis::aio::ConnectionManager as RedisConnectionManager;

use crate::cli::CommonArgs;

pub struct Runtime {
    pub config: ImagoConfig,
    pub collection_store: Arc<dyn CollectionStore>,
    pub library_repository: Arc<dyn LibraryRepository>,
    pub scheduled_job_repository: Arc<dyn ScheduledJobRepository>,
    pub navigation_index: Arc<dyn NavigationIndex>,
    pub message_bus: Arc<dyn MessageBus>,
    pub topology: Arc<dyn BrokerTopology>,
    pub orchestrator: Arc<ScanOrchestrator>,
    pub scheduler: Arc<CronScheduler>,
    pub library_jobs: Arc<LibraryJobService>,
    pub image_processing_worker: Arc<ImageProcessingWorker>,
    pub thumbnail_worker: Arc<ThumbnailWorker>,
    pub cache_worker: Arc<CacheWorker>,
}

impl Runtime {
    pub async fn connect(args: &CommonArgs) -> anyhow::Result<Self> {
        let mut options = ConfigLoaderOptions::default();
        options.config_path = args.config.clone();
        options.env_file = args.env_file.clone();
        let mut config = ConfigLoader::with_options(options).load()?;

        if let Some(url) = &args.broker_url {
            config.broker.url = url.clone();
        }
        if let Some(url) = &args.db_url {
            config.database.url = url.clone();
        }
        if let Some(url) = &args.index_url {
            config.index.url = url.clone();
        }

        let mongo_client = MongoClient::with_uri_str(&config.database.url).await?;
        let db = mongo_client
            .default_database()
            .unwrap_or_else(|| mongo_client.database("imago"));

        let redis_client = redis::Client::open(config.index.url.as_str())?;
        let redis_conn = RedisConnectionManager::new(redis_client).await?;

        let amqp_conn = lapin::Connection::connect(
            &config.broker.url,
            lapin::ConnectionProperties::default(),
        )
        .await?;
        let publish_channel = amqp_conn.create_channel().await?;
        let topology_channel = amqp_conn.create_channel().await?;

        let collection_store: Arc<dyn CollectionStore> =
            Arc::new(MongoCollectionStore::new(&db));
        let library_repository: Arc<dyn LibraryRepository> =
            Arc::new(MongoLibraryRepository::new(&db));
        let scheduled_job_repository: Arc<dyn ScheduledJobRepository> =
            Arc::new(MongoScheduledJobRepository::new(&db));
        let navigation_index: Arc<dyn NavigationIndex> = Arc::new(RedisNavigationIndex::new(
            redis_conn,
            collection_store.clone(),
        ));
        let message_bus: Arc<dyn MessageBus> = Arc::new(LapinMessageBus::new(
            publish_channel,
            config.messages.ttl,
        ));
        let topology: Arc<dyn BrokerTopology> = Arc::new(LapinTopology::new(
            topology_channel,
            config.messages.ttl.as_millis() as u64,
        ));

        let archive_reader = Arc::new(CompositeArchiveReader::new());
        let codec = Arc::new(StdImageCodec::new());
        let scanner = Arc::new(WalkingFileScanner::new(codec.clone(), archive_reader));

        let orchestrator = Arc::new(ScanOrchestrator::new(
            collection_store.clone(),
            scanner,
            message_bus.clone(),
        ));

        let scheduler = Arc::new(CronScheduler::new(
            scheduled_job_repository.clone(),
            message_bus.clone(),
        ));
        let library_jobs = Arc::new(LibraryJobService::new(
            library_repository.clone(),
            scheduled_job_repository.clone(),
            scheduler.clone(),
        ));

        let image_processing_worker = Arc::new(ImageProcessingWorker::new(
            collection_store.clone(),
            codec.clone(),
            message_bus.clone(),
            config.images,
        ));
        let thumbnail_worker = Arc::new(ThumbnailWorker::new(
            collection_store.clone(),
            codec.clone(),
        ));
        let cache_worker = Arc::new(CacheWorker::new(collection_store.clone(), codec));

        Ok(Runtime {
            config,
            collection_store,
            library_repository,
            scheduled_job_repository,
            navigation_index,
            message_bus,
            topology,
            orchestrator,
            scheduler,
            library_jobs,
            image_processing_worker,
            thumbnail_worker,
            cache_worker,
        })
    }
}
