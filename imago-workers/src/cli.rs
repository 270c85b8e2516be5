//! Flags shared across binaries: broker/database/index URLs and log level
//! all override the loaded [`imago_config::ImagoConfig`] the same way the
//! original config loader layers env over file over defaults (§6).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// Path to an `imago.toml`; falls back to `IMAGO_CONFIG_PATH`/discovery.
    #[arg(long, env = "IMAGO_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Path to a `.env` file to load before resolving configuration.
    #[arg(long, env = "IMAGO_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Broker URL override.
    #[arg(long, env = "IMAGO_BROKER_URL")]
    pub broker_url: Option<String>,

    /// Document store URL override.
    #[arg(long, env = "IMAGO_DB_URL")]
    pub db_url: Option<String>,

    /// Navigation index (key-value store) URL override.
    #[arg(long, env = "IMAGO_INDEX_URL")]
    pub index_url: Option<String>,

    /// Log level, e.g. `info`, `imago_core=debug,imago_workers=info`.
    #[arg(long, env = "IMAGO_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
