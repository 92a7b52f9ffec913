//! [`TrustEngine`], the write/compute and read paths over one store.
//!
//! Structural writes and compute passes are serialised through a single async
//! write gate, so no depth or score pass ever runs against a graph that is
//! changing underneath it. Reads never take the gate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::{
  Error, Result,
  builder::{self, DiscoveryReport},
  config::EngineConfig,
  depth,
  edge::{EdgeOutcome, TrustEdge},
  profile::{Profile, ProfileFilter, ProfileMetadata, normalize_handle},
  ranking::{self, LeaderboardQuery},
  score::{self, ConvergeReport},
  source::SocialGraphSource,
  store::GraphStore,
};

/// Outcome of a full recomputation: depths, then scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecomputeReport {
  pub depths_changed: usize,
  pub convergence:    ConvergeReport,
}

/// Outcome of [`TrustEngine::discover_from`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySummary {
  pub discovery: DiscoveryReport,
  pub recompute: RecomputeReport,
}

/// Ranks profiles held in `S`, discovering follow lists through `G`.
pub struct TrustEngine<S, G> {
  store:  S,
  source: Arc<G>,
  config: EngineConfig,
  gate:   Mutex<()>,
}

impl<S, G> TrustEngine<S, G>
where
  S: GraphStore,
  G: SocialGraphSource + 'static,
{
  /// Fails with [`Error::InvalidQuery`] when `config` is out of range.
  pub fn new(store: S, source: G, config: EngineConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { store, source: Arc::new(source), config, gate: Mutex::new(()) })
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  // ── Read path ─────────────────────────────────────────────────────────────

  /// Current standing of `handle`. An unknown handle gets a zero-state
  /// profile; no discovery is triggered.
  pub async fn get_profile(&self, handle: &str) -> Result<Profile> {
    let upsert = self.store.upsert_profile(handle.to_owned()).await.map_err(Into::into)?;
    if upsert.created {
      tracing::debug!(handle = %upsert.profile.handle, "created zero-state profile on read");
    }
    Ok(upsert.profile)
  }

  /// Like [`get_profile`](Self::get_profile) but never creates.
  pub async fn find_profile(&self, handle: &str) -> Result<Profile> {
    let normalized = normalize_handle(handle)?;
    self
      .store
      .get_profile_by_handle(normalized.clone())
      .await
      .map_err(Into::into)?
      .ok_or(Error::HandleNotFound(normalized))
  }

  pub async fn metadata(&self, handle: &str) -> Result<Option<ProfileMetadata>> {
    let profile = self.find_profile(handle).await?;
    self.store.get_metadata(profile.profile_id).await.map_err(Into::into)
  }

  pub async fn leaderboard(&self, query: &LeaderboardQuery) -> Result<Vec<Profile>> {
    query.validate()?;
    let filter = ProfileFilter { is_seed: query.is_seed };
    let profiles = self.store.list_profiles(filter).await.map_err(Into::into)?;
    ranking::leaderboard(profiles, query)
  }

  pub async fn percentile(&self, profile_id: Uuid) -> Result<f64> {
    let target = self
      .store
      .get_profile(profile_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::ProfileNotFound(profile_id))?;
    let population = self
      .store
      .list_profiles(ProfileFilter::default())
      .await
      .map_err(Into::into)?;
    Ok(ranking::percentile(&target, &population))
  }

  pub async fn percentile_of(&self, handle: &str) -> Result<f64> {
    let profile = self.find_profile(handle).await?;
    self.percentile(profile.profile_id).await
  }

  /// Edges pointing at `handle`.
  pub async fn trusters(&self, handle: &str) -> Result<Vec<TrustEdge>> {
    let profile = self.find_profile(handle).await?;
    self.store.edges_into(profile.profile_id).await.map_err(Into::into)
  }

  /// Edges leaving `handle`.
  pub async fn trustees(&self, handle: &str) -> Result<Vec<TrustEdge>> {
    let profile = self.find_profile(handle).await?;
    self.store.edges_out_of(profile.profile_id).await.map_err(Into::into)
  }

  // ── Structural writes ─────────────────────────────────────────────────────

  /// Set or clear the seed flag on `handle`, creating the profile if needed.
  pub async fn mark_seed(&self, handle: &str, is_seed: bool) -> Result<Profile> {
    let gate = self.gate.lock().await;
    let profile = self.get_profile(handle).await?;
    let mut profile = self
      .store
      .mark_seed(profile.profile_id, is_seed)
      .await
      .map_err(Into::into)?;
    tracing::info!(handle = %profile.handle, is_seed, "seed flag changed");

    if self.config.recompute_on_change {
      self.recompute_locked(&gate).await?;
      profile = self.reload(profile.profile_id).await?;
    }
    Ok(profile)
  }

  /// Record that `truster` trusts `trustee`; both are created if unknown.
  pub async fn add_trust(&self, truster: &str, trustee: &str, weight: f64) -> Result<EdgeOutcome> {
    let gate = self.gate.lock().await;
    let from = self.get_profile(truster).await?;
    let to = self.get_profile(trustee).await?;
    let outcome = self
      .store
      .add_edge(from.profile_id, to.profile_id, weight)
      .await
      .map_err(Into::into)?;

    if outcome.is_created() {
      self.after_edge_change(&gate).await?;
    }
    Ok(outcome)
  }

  pub async fn set_trust_weight(&self, truster: &str, trustee: &str, weight: f64) -> Result<Option<TrustEdge>> {
    let gate = self.gate.lock().await;
    let from = self.find_profile(truster).await?;
    let to = self.find_profile(trustee).await?;
    let edge = self
      .store
      .set_edge_weight(from.profile_id, to.profile_id, weight)
      .await
      .map_err(Into::into)?;

    if edge.is_some() {
      self.after_edge_change(&gate).await?;
    }
    Ok(edge)
  }

  /// Explicit "untrust". Returns whether an edge was removed.
  pub async fn remove_trust(&self, truster: &str, trustee: &str) -> Result<bool> {
    let gate = self.gate.lock().await;
    let from = self.find_profile(truster).await?;
    let to = self.find_profile(trustee).await?;
    let removed = self
      .store
      .remove_edge(from.profile_id, to.profile_id)
      .await
      .map_err(Into::into)?;

    if removed {
      self.after_edge_change(&gate).await?;
    }
    Ok(removed)
  }

  // ── Compute path ──────────────────────────────────────────────────────────

  /// Reassign every depth by BFS from the seeds. Returns how many changed.
  pub async fn recompute_depths(&self) -> Result<usize> {
    let gate = self.gate.lock().await;
    self.recompute_depths_locked(&gate).await
  }

  /// Iterate scores to a fixed point. `None` falls back to the configured
  /// iteration cap and threshold.
  pub async fn converge(&self, max_iterations: Option<u32>, epsilon: Option<f64>) -> Result<ConvergeReport> {
    let epsilon = epsilon.unwrap_or(self.config.epsilon);
    if !(epsilon.is_finite() && epsilon > 0.0) {
      return Err(Error::InvalidQuery(format!("epsilon must be positive, got {epsilon}")));
    }
    let max_iterations = max_iterations.unwrap_or(self.config.max_iterations);

    let gate = self.gate.lock().await;
    self.converge_locked(&gate, max_iterations, epsilon).await
  }

  /// Depths then scores, as one gated operation.
  pub async fn recompute(&self) -> Result<RecomputeReport> {
    let gate = self.gate.lock().await;
    self.recompute_locked(&gate).await
  }

  /// On-demand ranking of one handle without a discovery batch.
  pub async fn rank_handle(&self, handle: &str) -> Result<Profile> {
    let gate = self.gate.lock().await;
    let profile = self.get_profile(handle).await?;
    self.recompute_locked(&gate).await?;
    self.reload(profile.profile_id).await
  }

  /// Discover follow lists of `handles` (all current seeds when empty), then
  /// recompute depths and scores.
  ///
  /// Handles are normalised and deduplicated before any fetch; ones that
  /// fail normalisation are reported in `failed_handles`.
  pub async fn discover_from(&self, handles: Vec<String>, max_fanout: Option<usize>) -> Result<DiscoverySummary> {
    let mut invalid = Vec::new();
    let mut handles: Vec<String> = if handles.is_empty() {
      self
        .store
        .list_profiles(ProfileFilter::seeds())
        .await
        .map_err(Into::into)?
        .into_iter()
        .map(|p| p.handle)
        .collect()
    } else {
      handles
        .into_iter()
        .filter_map(|raw| match normalize_handle(&raw) {
          Ok(handle) => Some(handle),
          Err(e) => {
            tracing::warn!(handle = %raw, error = %e, "skipping invalid discovery handle");
            invalid.push(raw);
            None
          }
        })
        .collect()
    };
    handles.sort();
    handles.dedup();
    let max_fanout = max_fanout.unwrap_or(self.config.max_fanout_per_account);

    tracing::info!(handles = handles.len(), max_fanout, "discovery batch started");
    let mut discovery = builder::discover(
      &self.store,
      Arc::clone(&self.source),
      &self.gate,
      handles,
      max_fanout,
      self.config.discovery_concurrency,
    )
    .await;
    if !invalid.is_empty() {
      discovery.failed_handles.extend(invalid);
      discovery.failed_handles.sort();
    }
    tracing::info!(
      edges_created = discovery.edges_created,
      profiles_discovered = discovery.profiles_discovered,
      edges_rejected = discovery.edges_rejected,
      failed = discovery.failed_handles.len(),
      "discovery batch finished"
    );

    let recompute = self.recompute().await?;
    Ok(DiscoverySummary { discovery, recompute })
  }

  // ── Gated internals ───────────────────────────────────────────────────────

  async fn reload(&self, id: Uuid) -> Result<Profile> {
    self
      .store
      .get_profile(id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::ProfileNotFound(id))
  }

  async fn recompute_depths_locked(&self, _gate: &MutexGuard<'_, ()>) -> Result<usize> {
    let snapshot = self.store.snapshot().await.map_err(Into::into)?;
    let updates = depth::changed_depths(&snapshot);
    let changed = updates.len();
    self.store.apply_depths(updates).await.map_err(Into::into)?;
    tracing::info!(profiles = snapshot.profiles.len(), changed, "depths recomputed");
    Ok(changed)
  }

  async fn converge_locked(
    &self,
    _gate: &MutexGuard<'_, ()>,
    max_iterations: u32,
    epsilon: f64,
  ) -> Result<ConvergeReport> {
    let snapshot = self.store.snapshot().await.map_err(Into::into)?;
    let (report, updates) = score::converge(&snapshot, &self.config.policy, max_iterations, epsilon);
    self.store.apply_scores(updates).await.map_err(Into::into)?;

    if max_iterations == 0 {
      tracing::debug!("trust counters refreshed");
    } else if report.converged {
      tracing::info!(iterations = report.iterations_run, "scores converged");
    } else {
      tracing::warn!(
        iterations = report.iterations_run,
        max_delta = report.max_delta,
        "scores did not converge within the iteration cap"
      );
    }
    Ok(report)
  }

  /// Counters always follow the edge set; depths and scores only when
  /// `recompute_on_change` is set.
  async fn after_edge_change(&self, gate: &MutexGuard<'_, ()>) -> Result<()> {
    if self.config.recompute_on_change {
      self.recompute_locked(gate).await?;
    } else {
      self.converge_locked(gate, 0, self.config.epsilon).await?;
    }
    Ok(())
  }

  async fn recompute_locked(&self, gate: &MutexGuard<'_, ()>) -> Result<RecomputeReport> {
    let depths_changed = self.recompute_depths_locked(gate).await?;
    let convergence = self
      .converge_locked(gate, self.config.max_iterations, self.config.epsilon)
      .await?;
    Ok(RecomputeReport { depths_changed, convergence })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{memory::MemoryStore, profile::SEED_SCORE, score::ScorePolicy, source::StaticSource};

  fn engine(source: StaticSource) -> TrustEngine<MemoryStore, StaticSource> {
    TrustEngine::new(MemoryStore::new(), source, EngineConfig::default()).unwrap()
  }

  async fn assert_seed_invariant(e: &TrustEngine<MemoryStore, StaticSource>) {
    for p in e.store().list_profiles(ProfileFilter::seeds()).await.unwrap() {
      assert_eq!(p.trust_depth, Some(0), "{}", p.handle);
      assert_eq!(p.rank_score, SEED_SCORE, "{}", p.handle);
    }
  }

  #[tokio::test]
  async fn unknown_handle_reads_as_zero_state() {
    let e = engine(StaticSource::new());
    let p = e.get_profile("@Nobody").await.unwrap();
    assert_eq!(p.handle, "nobody");
    assert_eq!(p.trust_depth, None);
    assert_eq!(p.rank_score, 0.0);
    assert_eq!(p.trusted_by_count, 0);
    assert!(matches!(e.find_profile("other").await, Err(Error::HandleNotFound(_))));
  }

  #[tokio::test]
  async fn chain_end_to_end() {
    let e = engine(StaticSource::new().with_follows("s", ["a"]).with_follows("a", ["b"]));
    e.mark_seed("s", true).await.unwrap();
    e.discover_from(vec!["s".into(), "a".into()], None).await.unwrap();

    let a = e.find_profile("a").await.unwrap();
    let b = e.find_profile("b").await.unwrap();
    assert_eq!((a.trust_depth, a.rank_score), (Some(1), 75.0));
    assert_eq!((b.trust_depth, b.rank_score), (Some(2), 58.0));
    assert_eq!(a.following_trusted_count, 1);
    assert_seed_invariant(&e).await;

    let again = e.converge(None, None).await.unwrap();
    assert!(again.converged);
    assert!(again.max_delta < 0.01);
  }

  #[tokio::test]
  async fn discovery_defaults_to_current_seeds() {
    let e = engine(StaticSource::new().with_follows("s1", ["x"]).with_follows("s2", ["x"]));
    e.mark_seed("s1", true).await.unwrap();
    e.mark_seed("s2", true).await.unwrap();

    let summary = e.discover_from(Vec::new(), None).await.unwrap();
    assert_eq!(summary.discovery.edges_created, 2);

    let x = e.find_profile("x").await.unwrap();
    assert_eq!(x.trusted_by_count, 2);
    assert_eq!(x.trust_received_sum, 200.0);
    assert_eq!(x.rank_score, 80.0);
    assert_eq!(x.trust_depth, Some(1));
  }

  #[tokio::test]
  async fn untrusted_profile_scores_floor_and_is_unreachable() {
    let e = engine(StaticSource::new());
    e.mark_seed("s", true).await.unwrap();
    let b = e.rank_handle("b").await.unwrap();
    assert_eq!(b.rank_score, 5.0);
    assert_eq!(b.trust_depth, None);
  }

  #[tokio::test]
  async fn unseeding_recomputes_dependents() {
    let e = engine(StaticSource::new());
    e.mark_seed("s", true).await.unwrap();
    e.add_trust("s", "a", 1.0).await.unwrap();
    assert_eq!(e.find_profile("a").await.unwrap().trust_depth, Some(1));

    let s = e.mark_seed("s", false).await.unwrap();
    assert!(!s.is_seed);
    assert_eq!(s.trust_depth, None);
    assert_eq!(s.rank_score, 5.0);
    assert_eq!(e.find_profile("a").await.unwrap().trust_depth, None);
  }

  #[tokio::test]
  async fn removing_trust_refreshes_counters() {
    let e = engine(StaticSource::new());
    e.mark_seed("s", true).await.unwrap();
    e.add_trust("s", "a", 1.0).await.unwrap();
    assert!(e.remove_trust("s", "a").await.unwrap());

    let a = e.find_profile("a").await.unwrap();
    assert_eq!(a.trusted_by_count, 0);
    assert_eq!(a.trust_received_sum, 0.0);
    assert_eq!(a.rank_score, 5.0);
    assert_eq!(e.find_profile("s").await.unwrap().following_trusted_count, 0);
  }

  #[tokio::test]
  async fn leaderboard_and_percentile() {
    let e = engine(StaticSource::new().with_follows("s", ["a", "b"]).with_follows("a", ["b"]));
    e.mark_seed("s", true).await.unwrap();
    e.discover_from(Vec::new(), None).await.unwrap();
    e.discover_from(vec!["a".into()], None).await.unwrap();

    let board = e.leaderboard(&LeaderboardQuery::default()).await.unwrap();
    let handles: Vec<_> = board.iter().map(|p| p.handle.as_str()).collect();
    // b: (100 + 75) / 2 × 0.7 + 10 = 71.25
    assert_eq!(handles, ["s", "a", "b"]);
    assert_eq!(board[2].rank_score, 71.0);

    assert_eq!(e.percentile_of("s").await.unwrap(), 100.0);
    assert_eq!(e.percentile_of("a").await.unwrap(), 67.0);
    let b = e.find_profile("b").await.unwrap();
    assert_eq!(e.percentile(b.profile_id).await.unwrap(), 33.0);
    assert!(matches!(e.percentile(Uuid::new_v4()).await, Err(Error::ProfileNotFound(_))));
  }

  #[tokio::test]
  async fn conflicting_weight_is_a_validation_error() {
    let e = engine(StaticSource::new());
    e.add_trust("a", "b", 1.0).await.unwrap();
    let err = e.add_trust("a", "b", 0.5).await.unwrap_err();
    assert!(err.is_validation());
    assert!(e.add_trust("a", "A", 1.0).await.unwrap_err().is_validation());
  }

  #[tokio::test]
  async fn invalid_epsilon_is_rejected() {
    let e = engine(StaticSource::new());
    assert!(matches!(e.converge(None, Some(0.0)).await, Err(Error::InvalidQuery(_))));
  }

  #[tokio::test]
  async fn out_of_range_policy_fails_construction() {
    let config = EngineConfig {
      policy: ScorePolicy { ceiling: 150.0, untrusted_floor: -3.0, ..ScorePolicy::default() },
      ..EngineConfig::default()
    };
    let built = TrustEngine::new(MemoryStore::new(), StaticSource::new(), config);
    assert!(matches!(built, Err(Error::InvalidQuery(_))));
  }

  #[tokio::test]
  async fn discovery_normalises_and_dedups_handles() {
    let e = engine(StaticSource::new().with_follows("s", ["a"]));
    e.mark_seed("s", true).await.unwrap();

    let summary = e
      .discover_from(vec!["@S".into(), "s".into(), " ".into()], None)
      .await
      .unwrap();
    assert_eq!(summary.discovery.edges_created, 1);
    assert_eq!(summary.discovery.accounts_fetched, 1, "s fetched once");
    assert_eq!(summary.discovery.failed_handles, [" "]);
    assert_eq!(e.find_profile("a").await.unwrap().trust_depth, Some(1));
  }

  #[tokio::test]
  async fn counters_follow_edges_without_recompute() {
    let config = EngineConfig { recompute_on_change: false, ..EngineConfig::default() };
    let e = TrustEngine::new(MemoryStore::new(), StaticSource::new(), config).unwrap();
    e.add_trust("s", "a", 1.0).await.unwrap();

    let a = e.find_profile("a").await.unwrap();
    assert_eq!(a.trusted_by_count, 1);
    assert_eq!(a.rank_score, 0.0, "scores wait for an explicit pass");
    assert_eq!(e.find_profile("s").await.unwrap().following_trusted_count, 1);

    assert!(e.remove_trust("s", "a").await.unwrap());
    assert_eq!(e.find_profile("a").await.unwrap().trusted_by_count, 0);
    assert_eq!(e.find_profile("s").await.unwrap().following_trusted_count, 0);
  }
}
