//! The `GraphStore` trait and the write-back records of compute passes.
//!
//! The trait is implemented by storage backends ([`MemoryStore`] here,
//! `vouch-store-sqlite` for persistence). The engine, builder and API depend
//! on this abstraction, never on a concrete backend.
//!
//! [`MemoryStore`]: crate::memory::MemoryStore

use std::future::Future;

use uuid::Uuid;

use crate::{
  edge::{EdgeOutcome, TrustEdge},
  profile::{Profile, ProfileFilter, ProfileMetadata, ProfileUpsert},
  snapshot::GraphSnapshot,
};

// ─── Write-back records ──────────────────────────────────────────────────────

/// New depth for one profile, produced by the depth classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthUpdate {
  pub profile_id:  Uuid,
  pub trust_depth: Option<u32>,
}

/// New derived fields for one profile, produced by the convergence engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreUpdate {
  pub profile_id:              Uuid,
  pub rank_score:              f64,
  pub trusted_by_count:        u32,
  pub trust_received_sum:      f64,
  pub following_trusted_count: u32,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a trust graph backend.
///
/// The store is the single source of truth for profiles, edges and seeds. It
/// enforces the structural invariants (unique handles, one edge per ordered
/// pair, no self-loops, seed depth/score pinning); derived fields are written
/// only through [`apply_depths`](Self::apply_depths) and
/// [`apply_scores`](Self::apply_scores).
///
/// Backend errors must convert into [`crate::Error`] so that validation
/// failures keep their meaning when they cross the engine.
pub trait GraphStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Return the profile for `handle`, creating a zero-state one if the
  /// normalised handle is unknown.
  fn upsert_profile(
    &self,
    handle: String,
  ) -> impl Future<Output = Result<ProfileUpsert, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Look up by handle; the handle is normalised first. Never creates.
  fn get_profile_by_handle(
    &self,
    handle: String,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  fn list_profiles(
    &self,
    filter: ProfileFilter,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + '_;

  /// Set or clear the seed flag. Promotion sets depth 0 and score 100 in the
  /// same write.
  fn mark_seed(
    &self,
    id: Uuid,
    is_seed: bool,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  // ── Edges ─────────────────────────────────────────────────────────────

  /// Add `truster → trustee`. Re-adding an identical edge is a no-op;
  /// re-adding with a different weight is rejected.
  fn add_edge(
    &self,
    truster: Uuid,
    trustee: Uuid,
    weight: f64,
  ) -> impl Future<Output = Result<EdgeOutcome, Self::Error>> + Send + '_;

  /// Change the weight of an existing edge. Returns `None` if absent.
  fn set_edge_weight(
    &self,
    truster: Uuid,
    trustee: Uuid,
    weight: f64,
  ) -> impl Future<Output = Result<Option<TrustEdge>, Self::Error>> + Send + '_;

  /// Remove `truster → trustee`. Returns whether an edge was deleted.
  fn remove_edge(
    &self,
    truster: Uuid,
    trustee: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn edges_into(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<TrustEdge>, Self::Error>> + Send + '_;

  fn edges_out_of(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<TrustEdge>, Self::Error>> + Send + '_;

  // ── Compute passes ────────────────────────────────────────────────────

  /// A consistent copy of every profile and edge.
  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<GraphSnapshot, Self::Error>> + Send + '_;

  /// Write a batch of depths atomically. Unknown ids are ignored.
  fn apply_depths(
    &self,
    updates: Vec<DepthUpdate>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Write a batch of scores and counters atomically. Unknown ids are
  /// ignored; seeds keep their pinned score.
  fn apply_scores(
    &self,
    updates: Vec<ScoreUpdate>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Metadata ──────────────────────────────────────────────────────────

  fn upsert_metadata(
    &self,
    metadata: ProfileMetadata,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_metadata(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ProfileMetadata>, Self::Error>> + Send + '_;
}
