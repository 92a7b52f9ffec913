//! Handlers for `/profiles/{handle}` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/profiles/{handle}` | Creates a zero-state profile for an unknown handle |
//! | `GET`  | `/profiles/{handle}/metadata` | 404 if nothing was fetched yet |
//! | `GET`  | `/profiles/{handle}/percentile` | 404 for an unknown handle |
//! | `GET`  | `/profiles/{handle}/trusters` | Edges pointing at the profile |
//! | `GET`  | `/profiles/{handle}/trustees` | Edges leaving the profile |
//! | `POST` | `/profiles/{handle}/seed` | Body: `{"is_seed":true}` |
//! | `POST` | `/profiles/{handle}/rank` | Recompute and return the profile |

use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use vouch_core::{
  edge::TrustEdge,
  profile::{Profile, ProfileMetadata},
  source::SocialGraphSource,
  store::GraphStore,
};

use crate::{Engine, error::ApiError};

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /profiles/{handle}`
pub async fn get_one<S, G>(
  State(engine): State<Engine<S, G>>,
  Path(handle): Path<String>,
) -> Result<Json<Profile>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  Ok(Json(engine.get_profile(&handle).await?))
}

/// `GET /profiles/{handle}/metadata`
pub async fn metadata<S, G>(
  State(engine): State<Engine<S, G>>,
  Path(handle): Path<String>,
) -> Result<Json<ProfileMetadata>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  let meta = engine
    .metadata(&handle)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("no metadata for {handle}")))?;
  Ok(Json(meta))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PercentileResponse {
  pub handle:     String,
  pub rank_score: f64,
  pub percentile: f64,
}

/// `GET /profiles/{handle}/percentile`
pub async fn percentile<S, G>(
  State(engine): State<Engine<S, G>>,
  Path(handle): Path<String>,
) -> Result<Json<PercentileResponse>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  let profile = engine.find_profile(&handle).await?;
  let percentile = engine.percentile(profile.profile_id).await?;
  Ok(Json(PercentileResponse {
    handle: profile.handle,
    rank_score: profile.rank_score,
    percentile,
  }))
}

/// `GET /profiles/{handle}/trusters`
pub async fn trusters<S, G>(
  State(engine): State<Engine<S, G>>,
  Path(handle): Path<String>,
) -> Result<Json<Vec<TrustEdge>>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  Ok(Json(engine.trusters(&handle).await?))
}

/// `GET /profiles/{handle}/trustees`
pub async fn trustees<S, G>(
  State(engine): State<Engine<S, G>>,
  Path(handle): Path<String>,
) -> Result<Json<Vec<TrustEdge>>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  Ok(Json(engine.trustees(&handle).await?))
}

// ─── Writes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SeedBody {
  pub is_seed: bool,
}

/// `POST /profiles/{handle}/seed`
pub async fn seed<S, G>(
  State(engine): State<Engine<S, G>>,
  Path(handle): Path<String>,
  Json(body): Json<SeedBody>,
) -> Result<Json<Profile>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  Ok(Json(engine.mark_seed(&handle, body.is_seed).await?))
}

/// `POST /profiles/{handle}/rank`
pub async fn rank<S, G>(
  State(engine): State<Engine<S, G>>,
  Path(handle): Path<String>,
) -> Result<Json<Profile>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  Ok(Json(engine.rank_handle(&handle).await?))
}
