//! JSON REST API for Vouch.
//!
//! Exposes an axum [`Router`] over a [`TrustEngine`] backed by any
//! [`GraphStore`] and [`SocialGraphSource`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", vouch_api::api_router(engine.clone()))
//! ```

pub mod compute;
pub mod edges;
pub mod error;
pub mod leaderboard;
pub mod profiles;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use vouch_core::{engine::TrustEngine, source::SocialGraphSource, store::GraphStore};

pub use error::ApiError;

/// Shared handler state.
pub type Engine<S, G> = Arc<TrustEngine<S, G>>;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(engine: Engine<S, G>) -> Router<()>
where
  S: GraphStore + 'static,
  G: SocialGraphSource + 'static,
{
  Router::new()
    // Profiles
    .route("/profiles/{handle}", get(profiles::get_one::<S, G>))
    .route("/profiles/{handle}/metadata", get(profiles::metadata::<S, G>))
    .route("/profiles/{handle}/percentile", get(profiles::percentile::<S, G>))
    .route("/profiles/{handle}/trusters", get(profiles::trusters::<S, G>))
    .route("/profiles/{handle}/trustees", get(profiles::trustees::<S, G>))
    .route("/profiles/{handle}/seed", post(profiles::seed::<S, G>))
    .route("/profiles/{handle}/rank", post(profiles::rank::<S, G>))
    // Leaderboard
    .route("/leaderboard", get(leaderboard::handler::<S, G>))
    // Edges
    .route("/edges", post(edges::create::<S, G>))
    .route(
      "/edges/{truster}/{trustee}",
      put(edges::set_weight::<S, G>).delete(edges::remove::<S, G>),
    )
    // Compute
    .route("/discover", post(compute::discover::<S, G>))
    .route("/recompute/depths", post(compute::recompute_depths::<S, G>))
    .route("/converge", post(compute::converge::<S, G>))
    .with_state(engine)
}

// ─── Router tests ────────────────────────────────────────────────────────────
