//! Handler for `GET /leaderboard`.
//!
//! Query parameters: `page` (1-based, default 1), `page_size` (1..=500,
//! default 50), `is_seed` (optional filter).

use axum::{
  Json,
  extract::{Query, State},
};
use vouch_core::{
  profile::Profile, ranking::LeaderboardQuery, source::SocialGraphSource, store::GraphStore,
};

use crate::{Engine, error::ApiError};

/// `GET /leaderboard[?page=&page_size=&is_seed=]`
pub async fn handler<S, G>(
  State(engine): State<Engine<S, G>>,
  Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<Profile>>, ApiError>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  Ok(Json(engine.leaderboard(&query).await?))
}
