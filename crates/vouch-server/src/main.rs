//! vouch-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, builds the configured social graph source, and serves the
//! JSON API over HTTP.
//!
//! Every setting can be overridden from the environment, e.g.
//! `VOUCH_PORT=9000` or `VOUCH_ENGINE__MAX_ITERATIONS=25`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vouch_core::engine::TrustEngine;
use vouch_server::{ServerConfig, expand_tilde, source::AnySource};
use vouch_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Vouch trust ranking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Recompute depths and scores once at startup.
  #[arg(long)]
  recompute: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("VOUCH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let source = AnySource::from_config(&server_cfg.source)
    .context("failed to set up the social graph source")?;

  let engine = Arc::new(
    TrustEngine::new(store, source, server_cfg.engine.clone()).context("invalid [engine] settings")?,
  );

  if cli.recompute {
    let report = engine.recompute().await.context("startup recompute failed")?;
    tracing::info!(
      depths_changed = report.depths_changed,
      iterations = report.convergence.iterations_run,
      converged = report.convergence.converged,
      "startup recompute finished"
    );
  }

  let app = vouch_server::router(engine);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
