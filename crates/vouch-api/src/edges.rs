//! Handlers for `/edges` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/edges` | Body: `{"truster":"a","trustee":"b","weight":1.0}`; 201 if created, 200 if already present |
//! | `PUT`    | `/edges/{truster}/{trustee}` | Body: `{"weight":0.5}`; 404 if no such edge |
//! | `DELETE` | `/edges/{truster}/{trustee}` | 204, or 404 if no such edge |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use vouch_core::{
  edge::{DEFAULT_WEIGHT, EdgeOutcome, TrustEdge},
  source::SocialGraphSource,
  store::GraphStore,
};

use crate::{Engine, error::ApiError};

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub truster: String,
  pub trustee: String,
  pub weight:  Option<f64>,
}

/// `POST /edges`
pub async fn create<S, G>(
  State(engine): State<Engine<S, G>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  let weight = body.weight.unwrap_or(DEFAULT_WEIGHT);
  let outcome = engine.add_trust(&body.truster, &body.trustee, weight).await?;
  let status = match outcome {
    EdgeOutcome::Created(_) => StatusCode::CREATED,
    EdgeOutcome::Unchanged(_) => StatusCode::OK,
  };
  Ok((status, Json(outcome)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WeightBody {
  pub weight: f64,
}

/// `PUT /edges/{truster}/{trustee}`
pub async fn set_weight<S, G>(
  State(engine): State<Engine<S, G>>,
  Path((truster, trustee)): Path<(String, String)>,
  Json(body): Json<WeightBody>,
) -> Result<Json<TrustEdge>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  let edge = engine
    .set_trust_weight(&truster, &trustee, body.weight)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("no edge {truster} -> {trustee}")))?;
  Ok(Json(edge))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /edges/{truster}/{trustee}`
pub async fn remove<S, G>(
  State(engine): State<Engine<S, G>>,
  Path((truster, trustee)): Path<(String, String)>,
) -> Result<StatusCode, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  if engine.remove_trust(&truster, &trustee).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("no edge {truster} -> {trustee}")))
  }
}
