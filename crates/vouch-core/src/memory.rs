//! [`MemoryStore`], an in-process [`GraphStore`].
//!
//! Profiles live in an arena indexed by insertion position; edges are kept as
//! forward adjacency lists with a mirrored reverse index. Useful for tests and
//! for short-lived batch runs that do not need persistence.

use std::{
  collections::HashMap,
  sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  edge::{self, EdgeOutcome, TrustEdge},
  profile::{
    Profile, ProfileFilter, ProfileMetadata, ProfileUpsert, SEED_SCORE,
    normalize_handle,
  },
  snapshot::GraphSnapshot,
  store::{DepthUpdate, GraphStore, ScoreUpdate},
};

#[derive(Default)]
struct Graph {
  profiles:  Vec<Profile>,
  by_id:     HashMap<Uuid, usize>,
  by_handle: HashMap<String, usize>,
  /// `outgoing[i]`: edges whose truster is `profiles[i]`.
  outgoing:  Vec<Vec<TrustEdge>>,
  /// `incoming[i]`: arena positions of the trusters of `profiles[i]`.
  incoming:  Vec<Vec<usize>>,
  metadata:  HashMap<Uuid, ProfileMetadata>,
}

impl Graph {
  fn position(&self, id: Uuid) -> Result<usize> {
    self.by_id.get(&id).copied().ok_or(Error::ProfileNotFound(id))
  }

  fn edge_slot(&self, from: usize, trustee: Uuid) -> Option<usize> {
    self.outgoing[from].iter().position(|e| e.trustee_id == trustee)
  }
}

/// A [`GraphStore`] held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
  graph: RwLock<Graph>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn read(&self) -> RwLockReadGuard<'_, Graph> {
    self.graph.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, Graph> {
    self.graph.write().unwrap_or_else(PoisonError::into_inner)
  }
}

impl GraphStore for MemoryStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn upsert_profile(&self, handle: String) -> Result<ProfileUpsert> {
    let handle = normalize_handle(&handle)?;
    let mut g = self.write();

    if let Some(&i) = g.by_handle.get(&handle) {
      return Ok(ProfileUpsert { profile: g.profiles[i].clone(), created: false });
    }

    let profile = Profile::zero_state(handle.clone());
    let i = g.profiles.len();
    g.by_id.insert(profile.profile_id, i);
    g.by_handle.insert(handle, i);
    g.profiles.push(profile.clone());
    g.outgoing.push(Vec::new());
    g.incoming.push(Vec::new());

    Ok(ProfileUpsert { profile, created: true })
  }

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
    let g = self.read();
    Ok(g.by_id.get(&id).map(|&i| g.profiles[i].clone()))
  }

  async fn get_profile_by_handle(&self, handle: String) -> Result<Option<Profile>> {
    let handle = normalize_handle(&handle)?;
    let g = self.read();
    Ok(g.by_handle.get(&handle).map(|&i| g.profiles[i].clone()))
  }

  async fn list_profiles(&self, filter: ProfileFilter) -> Result<Vec<Profile>> {
    let g = self.read();
    Ok(g.profiles.iter().filter(|p| filter.matches(p)).cloned().collect())
  }

  async fn mark_seed(&self, id: Uuid, is_seed: bool) -> Result<Profile> {
    let mut g = self.write();
    let i = g.position(id)?;
    g.profiles[i].set_seed(is_seed);
    Ok(g.profiles[i].clone())
  }

  // ── Edges ─────────────────────────────────────────────────────────────────

  async fn add_edge(&self, truster: Uuid, trustee: Uuid, weight: f64) -> Result<EdgeOutcome> {
    edge::validate_edge(truster, trustee, weight)?;
    let mut g = self.write();
    let from = g.position(truster)?;
    let to = g.position(trustee)?;

    if let Some(slot) = g.edge_slot(from, trustee) {
      return edge::reconcile_existing(g.outgoing[from][slot].clone(), weight);
    }

    let created = TrustEdge::new(truster, trustee, weight);
    g.outgoing[from].push(created.clone());
    g.incoming[to].push(from);
    Ok(EdgeOutcome::Created(created))
  }

  async fn set_edge_weight(
    &self,
    truster: Uuid,
    trustee: Uuid,
    weight: f64,
  ) -> Result<Option<TrustEdge>> {
    edge::validate_weight(weight)?;
    let mut g = self.write();
    let from = g.position(truster)?;
    let Some(slot) = g.edge_slot(from, trustee) else {
      return Ok(None);
    };
    let e = &mut g.outgoing[from][slot];
    e.weight = weight;
    Ok(Some(e.clone()))
  }

  async fn remove_edge(&self, truster: Uuid, trustee: Uuid) -> Result<bool> {
    let mut g = self.write();
    let (Some(&from), Some(&to)) = (g.by_id.get(&truster), g.by_id.get(&trustee)) else {
      return Ok(false);
    };
    let Some(slot) = g.edge_slot(from, trustee) else {
      return Ok(false);
    };
    g.outgoing[from].remove(slot);
    g.incoming[to].retain(|&t| t != from);
    Ok(true)
  }

  async fn edges_into(&self, id: Uuid) -> Result<Vec<TrustEdge>> {
    let g = self.read();
    let to = g.position(id)?;
    Ok(
      g.incoming[to]
        .iter()
        .filter_map(|&from| g.outgoing[from].iter().find(|e| e.trustee_id == id))
        .cloned()
        .collect(),
    )
  }

  async fn edges_out_of(&self, id: Uuid) -> Result<Vec<TrustEdge>> {
    let g = self.read();
    let from = g.position(id)?;
    Ok(g.outgoing[from].clone())
  }

  // ── Compute passes ────────────────────────────────────────────────────────

  async fn snapshot(&self) -> Result<GraphSnapshot> {
    let g = self.read();
    Ok(GraphSnapshot {
      profiles: g.profiles.clone(),
      edges:    g.outgoing.iter().flatten().cloned().collect(),
    })
  }

  async fn apply_depths(&self, updates: Vec<DepthUpdate>) -> Result<()> {
    let mut g = self.write();
    let now = Utc::now();
    for u in updates {
      if let Some(&i) = g.by_id.get(&u.profile_id) {
        let p = &mut g.profiles[i];
        p.trust_depth = if p.is_seed { Some(0) } else { u.trust_depth };
        p.updated_at = now;
      }
    }
    Ok(())
  }

  async fn apply_scores(&self, updates: Vec<ScoreUpdate>) -> Result<()> {
    let mut g = self.write();
    let now = Utc::now();
    for u in updates {
      if let Some(&i) = g.by_id.get(&u.profile_id) {
        let p = &mut g.profiles[i];
        p.rank_score = if p.is_seed { SEED_SCORE } else { u.rank_score };
        p.trusted_by_count = u.trusted_by_count;
        p.trust_received_sum = u.trust_received_sum;
        p.following_trusted_count = u.following_trusted_count;
        p.updated_at = now;
      }
    }
    Ok(())
  }

  // ── Metadata ──────────────────────────────────────────────────────────────

  async fn upsert_metadata(&self, metadata: ProfileMetadata) -> Result<()> {
    let mut g = self.write();
    g.position(metadata.profile_id)?;
    g.metadata.insert(metadata.profile_id, metadata);
    Ok(())
  }

  async fn get_metadata(&self, id: Uuid) -> Result<Option<ProfileMetadata>> {
    Ok(self.read().metadata.get(&id).cloned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn pair(store: &MemoryStore) -> (Profile, Profile) {
    let a = store.upsert_profile("alice".into()).await.unwrap().profile;
    let b = store.upsert_profile("bob".into()).await.unwrap().profile;
    (a, b)
  }

  #[tokio::test]
  async fn upsert_is_case_insensitive() {
    let s = MemoryStore::new();
    let first = s.upsert_profile("@Alice".into()).await.unwrap();
    let second = s.upsert_profile("alice".into()).await.unwrap();
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.profile.profile_id, second.profile.profile_id);
    assert_eq!(s.list_profiles(ProfileFilter::default()).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn add_edge_twice_is_a_noop() {
    let s = MemoryStore::new();
    let (a, b) = pair(&s).await;

    assert!(s.add_edge(a.profile_id, b.profile_id, 1.0).await.unwrap().is_created());
    assert!(!s.add_edge(a.profile_id, b.profile_id, 1.0).await.unwrap().is_created());

    assert_eq!(s.edges_out_of(a.profile_id).await.unwrap().len(), 1);
    assert_eq!(s.edges_into(b.profile_id).await.unwrap().len(), 1);
    assert_eq!(s.snapshot().await.unwrap().edges.len(), 1);
  }

  #[tokio::test]
  async fn edges_to_unknown_profiles_are_rejected() {
    let s = MemoryStore::new();
    let (a, _) = pair(&s).await;
    let err = s.add_edge(a.profile_id, Uuid::new_v4(), 1.0).await.unwrap_err();
    assert!(matches!(err, Error::ProfileNotFound(_)));
  }

  #[tokio::test]
  async fn remove_edge_updates_both_directions() {
    let s = MemoryStore::new();
    let (a, b) = pair(&s).await;
    s.add_edge(a.profile_id, b.profile_id, 1.0).await.unwrap();

    assert!(s.remove_edge(a.profile_id, b.profile_id).await.unwrap());
    assert!(!s.remove_edge(a.profile_id, b.profile_id).await.unwrap());
    assert!(s.edges_into(b.profile_id).await.unwrap().is_empty());
    assert!(s.edges_out_of(a.profile_id).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn weight_can_be_updated_in_place() {
    let s = MemoryStore::new();
    let (a, b) = pair(&s).await;
    let created = s.add_edge(a.profile_id, b.profile_id, 1.0).await.unwrap();

    let updated = s
      .set_edge_weight(a.profile_id, b.profile_id, 0.5)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(updated.edge_id, created.edge().edge_id);
    assert_eq!(updated.weight, 0.5);
    assert!(s.set_edge_weight(b.profile_id, a.profile_id, 0.5).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn seeds_keep_pinned_values_through_write_back() {
    let s = MemoryStore::new();
    let (a, _) = pair(&s).await;
    s.mark_seed(a.profile_id, true).await.unwrap();

    s.apply_depths(vec![DepthUpdate { profile_id: a.profile_id, trust_depth: None }])
      .await
      .unwrap();
    s.apply_scores(vec![ScoreUpdate {
      profile_id:              a.profile_id,
      rank_score:              5.0,
      trusted_by_count:        0,
      trust_received_sum:      0.0,
      following_trusted_count: 0,
    }])
    .await
    .unwrap();

    let a = s.get_profile(a.profile_id).await.unwrap().unwrap();
    assert_eq!(a.trust_depth, Some(0));
    assert_eq!(a.rank_score, SEED_SCORE);
  }
}
