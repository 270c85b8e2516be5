use serde::Deserialize;

/// Layered on top of [`EnvConfig`]; every field optional so a partial
/// `imago.toml` is valid.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub broker: FileBrokerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub index: FileIndexConfig,
    #[serde(default)]
    pub workers: FileWorkerConfig,
    #[serde(default)]
    pub messages: FileMessageConfig,
    #[serde(default)]
    pub images: FileImageConfig,
    #[serde(default)]
    pub cache: FileCacheConfig,
    #[serde(default)]
    pub scheduler: FileSchedulerConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileBrokerConfig {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileDatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileIndexConfig {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileWorkerConfig {
    pub count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileMessageConfig {
    pub ttl_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileImageConfig {
    pub default_quality: Option<u8>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
    pub thumbnail_quality: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileCacheConfig {
    pub expiration_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileSchedulerConfig {
    pub auto_scan_cron: Option<String>,
}

/// Gathered from `std::env`; `ConfigLoader::load` calls this after applying
/// `.env`/`--env-file`, so values set there are already visible here.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub broker_url: Option<String>,
    pub database_url: Option<String>,
    pub index_url: Option<String>,
    pub worker_count: Option<usize>,
    pub message_ttl_ms: Option<u64>,
    pub default_quality: Option<u8>,
    pub thumbnail_width: Option<u32>,
    pub thumbnail_height: Option<u32>,
    pub thumbnail_quality: Option<u8>,
    pub cache_expiration_days: Option<u32>,
    pub auto_scan_cron: Option<String>,
    pub config_path: Option<std::path::PathBuf>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        EnvConfig {
            broker_url: env_string("IMAGO_BROKER_URL"),
            database_url: env_string("IMAGO_DB_URL"),
            index_url: env_string("IMAGO_INDEX_URL"),
            worker_count: env_parsed("IMAGO_WORKER_COUNT"),
            message_ttl_ms: env_parsed("IMAGO_MESSAGE_TTL_MS"),
            default_quality: env_parsed("IMAGO_DEFAULT_QUALITY"),
            thumbnail_width: env_parsed("IMAGO_THUMBNAIL_WIDTH"),
            thumbnail_height: env_parsed("IMAGO_THUMBNAIL_HEIGHT"),
            thumbnail_quality: env_parsed("IMAGO_THUMBNAIL_QUALITY"),
            cache_expiration_days: env_parsed("IMAGO_CACHE_EXPIRATION_DAYS"),
            auto_scan_cron: env_string("IMAGO_AUTO_SCAN_CRON"),
            config_path: env_string("IMAGO_CONFIG_PATH").map(Into::into),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}
