//! pipecard server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store shared with the execution engine, and serves the card API
//! over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use pipecard_server::{ServerConfig, app, expand_tilde};
use pipecard_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Pipeline step card server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("PIPECARD")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("schemas"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let schemas = server_cfg
    .schema_registry()
    .context("invalid schema configuration")?;
  tracing::info!(
    schemas = ?schemas.names().collect::<Vec<_>>(),
    max_card_bytes = schemas.max_bytes(),
    "card schemas enabled"
  );

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let router = app(Arc::new(store), schemas, &server_cfg);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, router).await.context("server error")?;

  Ok(())
}
