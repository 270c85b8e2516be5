use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use url::Url;

use crate::error::ConfigLoadError;
use crate::models::{
    BrokerConfig, CacheConfig, DatabaseConfig, ImageDefaults, ImagoConfig,
    IndexConfig, MessageConfig, SchedulerConfig, WorkerConfig,
};
use crate::sources::{EnvConfig, FileConfig};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("imago.toml"),
        PathBuf::from("config/imago.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

/// Composes environment variables over an optional `imago.toml` over hard
/// defaults (§6). Environment always wins; this mirrors the 12-factor
/// convention of letting orchestration environments override a checked-in
/// file without editing it.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        ConfigLoader { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ImagoConfig, ConfigLoadError> {
        match &self.options.env_file {
            Some(path) => {
                dotenvy::from_path(path).map(|_| ()).or_else(|err| {
                    match err {
                        dotenvy::Error::Io(_) => Ok(()),
                        other => Err(other),
                    }
                })?;
            }
            None => {
                dotenvy::dotenv().map(|_| ()).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(()),
                    other => Err(other),
                })?;
            }
        }

        let env = EnvConfig::gather();
        let file = self.load_file_config(&env)?;
        self.compose(file, env)
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<FileConfig, ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) => Some(path),
            None => DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned(),
        };

        let Some(path) = path else {
            return Ok(FileConfig::default());
        };

        if !path.exists() {
            if self.options.config_path.is_some() || env.config_path.is_some()
            {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok(FileConfig::default());
        }

        self.read_file(&path)
    }

    fn read_file(&self, path: &Path) -> Result<FileConfig, ConfigLoadError> {
        let contents =
            fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn compose(
        &self,
        file: FileConfig,
        env: EnvConfig,
    ) -> Result<ImagoConfig, ConfigLoadError> {
        let defaults = ImagoConfig::default();

        let broker_url = env
            .broker_url
            .or(file.broker.url)
            .unwrap_or(defaults.broker.url);
        Url::parse(&broker_url)
            .map_err(ConfigLoadError::InvalidBrokerUrl)?;

        Ok(ImagoConfig {
            broker: BrokerConfig { url: broker_url },
            database: DatabaseConfig {
                url: env
                    .database_url
                    .or(file.database.url)
                    .unwrap_or(defaults.database.url),
            },
            index: IndexConfig {
                url: env
                    .index_url
                    .or(file.index.url)
                    .unwrap_or(defaults.index.url),
            },
            workers: WorkerConfig {
                count: env
                    .worker_count
                    .or(file.workers.count)
                    .unwrap_or(defaults.workers.count),
            },
            messages: MessageConfig {
                ttl: Duration::from_millis(
                    env.message_ttl_ms
                        .or(file.messages.ttl_ms)
                        .unwrap_or(defaults.messages.ttl.as_millis() as u64),
                ),
            },
            images: ImageDefaults {
                default_quality: env
                    .default_quality
                    .or(file.images.default_quality)
                    .unwrap_or(defaults.images.default_quality),
                thumbnail_width: env
                    .thumbnail_width
                    .or(file.images.thumbnail_width)
                    .unwrap_or(defaults.images.thumbnail_width),
                thumbnail_height: env
                    .thumbnail_height
                    .or(file.images.thumbnail_height)
                    .unwrap_or(defaults.images.thumbnail_height),
                thumbnail_quality: env
                    .thumbnail_quality
                    .or(file.images.thumbnail_quality)
                    .unwrap_or(defaults.images.thumbnail_quality),
            },
            cache: CacheConfig {
                expiration_days: env
                    .cache_expiration_days
                    .or(file.cache.expiration_days)
                    .unwrap_or(defaults.cache.expiration_days),
            },
            scheduler: SchedulerConfig {
                auto_scan_cron: env
                    .auto_scan_cron
                    .or(file.scheduler.auto_scan_cron)
                    .unwrap_or(defaults.scheduler.auto_scan_cron),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_present() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let config = ConfigLoader::new().load();
        std::env::set_current_dir(cwd).unwrap();

        let config = config.unwrap();
        assert_eq!(config.workers.count, 4);
        assert_eq!(config.images.default_quality, 85);
    }

    #[test]
    fn explicit_missing_config_path_is_an_error() {
        let config = ConfigLoader::new()
            .with_config_path(PathBuf::from("/nonexistent/definitely.toml"))
            .load();
        assert!(matches!(config, Err(ConfigLoadError::MissingConfig { .. })));
    }
}
