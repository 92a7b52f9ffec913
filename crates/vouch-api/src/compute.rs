//! Compute triggers: discovery, depth classification and score convergence.
//!
//! Each request runs its pass to completion before responding.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use vouch_core::{
  engine::DiscoverySummary, score::ConvergeReport, source::SocialGraphSource, store::GraphStore,
};

use crate::{Engine, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DiscoverBody {
  /// Handles to expand; empty means every current seed.
  pub seed_handles: Vec<String>,
  pub max_fanout:   Option<usize>,
}

/// `POST /discover`
pub async fn discover<S, G>(
  State(engine): State<Engine<S, G>>,
  Json(body): Json<DiscoverBody>,
) -> Result<Json<DiscoverySummary>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  Ok(Json(engine.discover_from(body.seed_handles, body.max_fanout).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepthsResponse {
  pub depths_changed: usize,
}

/// `POST /recompute/depths`
pub async fn recompute_depths<S, G>(
  State(engine): State<Engine<S, G>>,
) -> Result<Json<DepthsResponse>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  let depths_changed = engine.recompute_depths().await?;
  Ok(Json(DepthsResponse { depths_changed }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConvergeBody {
  pub max_iterations: Option<u32>,
  pub epsilon:        Option<f64>,
}

/// `POST /converge`
pub async fn converge<S, G>(
  State(engine): State<Engine<S, G>>,
  Json(body): Json<ConvergeBody>,
) -> Result<Json<ConvergeReport>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  Ok(Json(engine.converge(body.max_iterations, body.epsilon).await?))
}
