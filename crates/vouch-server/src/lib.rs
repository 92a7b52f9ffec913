//! HTTP server wiring for Vouch.
//!
//! Holds the server configuration, the configurable social graph sources,
//! and the top-level [`Router`] that mounts the JSON API under `/api`.

pub mod error;
pub mod source;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use vouch_core::{
  config::EngineConfig, engine::TrustEngine, source::SocialGraphSource, store::GraphStore,
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub engine:     EngineConfig,
  pub source:     SourceConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

/// Where follow lists come from.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
  Http {
    base_url:     String,
    #[serde(default)]
    token:        Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
  },
  Fixture {
    path: PathBuf,
  },
}

fn default_timeout_secs() -> u64 { 30 }

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server [`Router`]: the API under `/api`, with request tracing.
pub fn router<S, G>(engine: Arc<TrustEngine<S, G>>) -> Router
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  Router::new()
    .nest("/api", vouch_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
