//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Utc;
use uuid::Uuid;
use vouch_core::{
  config::EngineConfig,
  edge::EdgeOutcome,
  engine::TrustEngine,
  profile::{Profile, ProfileFilter, ProfileMetadata, SEED_SCORE},
  source::StaticSource,
  store::{DepthUpdate, GraphStore, ScoreUpdate},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn pair(s: &SqliteStore) -> (Profile, Profile) {
  let a = s.upsert_profile("alice".into()).await.unwrap().profile;
  let b = s.upsert_profile("bob".into()).await.unwrap().profile;
  (a, b)
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_creates_zero_state_once() {
  let s = store().await;

  let first = s.upsert_profile("@Alice".into()).await.unwrap();
  assert!(first.created);
  assert_eq!(first.profile.handle, "alice");
  assert_eq!(first.profile.trust_depth, None);
  assert_eq!(first.profile.rank_score, 0.0);

  let second = s.upsert_profile("ALICE".into()).await.unwrap();
  assert!(!second.created);
  assert_eq!(second.profile.profile_id, first.profile.profile_id);
  assert_eq!(s.list_profiles(ProfileFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_handle_is_a_core_error() {
  let s = store().await;
  let err = s.upsert_profile("   ".into()).await.unwrap_err();
  assert!(matches!(err, Error::Core(vouch_core::Error::InvalidHandle(_))));
}

#[tokio::test]
async fn lookups_never_create() {
  let s = store().await;
  assert!(s.get_profile_by_handle("ghost".into()).await.unwrap().is_none());
  assert!(s.get_profile(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.list_profiles(ProfileFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn mark_seed_pins_depth_and_score() {
  let s = store().await;
  let (a, _) = pair(&s).await;

  let seeded = s.mark_seed(a.profile_id, true).await.unwrap();
  assert!(seeded.is_seed);
  assert_eq!(seeded.trust_depth, Some(0));
  assert_eq!(seeded.rank_score, SEED_SCORE);

  let seeds = s.list_profiles(ProfileFilter::seeds()).await.unwrap();
  assert_eq!(seeds.len(), 1);
  assert_eq!(seeds[0].handle, "alice");

  let unseeded = s.mark_seed(a.profile_id, false).await.unwrap();
  assert!(!unseeded.is_seed);
  assert!(s.list_profiles(ProfileFilter::seeds()).await.unwrap().is_empty());
}

#[tokio::test]
async fn mark_seed_unknown_profile() {
  let s = store().await;
  let err = s.mark_seed(Uuid::new_v4(), true).await.unwrap_err();
  assert!(matches!(err, Error::Core(vouch_core::Error::ProfileNotFound(_))));
}

// ─── Edges ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_edge_is_idempotent() {
  let s = store().await;
  let (a, b) = pair(&s).await;

  let first = s.add_edge(a.profile_id, b.profile_id, 1.0).await.unwrap();
  assert!(first.is_created());
  let second = s.add_edge(a.profile_id, b.profile_id, 1.0).await.unwrap();
  assert!(matches!(second, EdgeOutcome::Unchanged(_)));
  assert_eq!(second.edge().edge_id, first.edge().edge_id);

  assert_eq!(s.edges_out_of(a.profile_id).await.unwrap().len(), 1);
  assert_eq!(s.edges_into(b.profile_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn self_loop_is_rejected() {
  let s = store().await;
  let (a, _) = pair(&s).await;
  let err = s.add_edge(a.profile_id, a.profile_id, 1.0).await.unwrap_err();
  assert!(matches!(err, Error::Core(vouch_core::Error::SelfLoop(_))));
}

#[tokio::test]
async fn conflicting_weight_is_rejected() {
  let s = store().await;
  let (a, b) = pair(&s).await;
  s.add_edge(a.profile_id, b.profile_id, 1.0).await.unwrap();

  let err = s.add_edge(a.profile_id, b.profile_id, 0.5).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(vouch_core::Error::ConflictingWeight { .. })
  ));
  let edges = s.edges_out_of(a.profile_id).await.unwrap();
  assert_eq!(edges[0].weight, 1.0);
}

#[tokio::test]
async fn edge_to_unknown_profile_is_rejected() {
  let s = store().await;
  let (a, _) = pair(&s).await;
  let err = s.add_edge(a.profile_id, Uuid::new_v4(), 1.0).await.unwrap_err();
  assert!(matches!(err, Error::Core(vouch_core::Error::ProfileNotFound(_))));
  assert!(s.snapshot().await.unwrap().edges.is_empty());
}

#[tokio::test]
async fn out_of_range_weight_is_rejected() {
  let s = store().await;
  let (a, b) = pair(&s).await;
  for w in [0.0, -1.0, 1.5, f64::NAN] {
    let err = s.add_edge(a.profile_id, b.profile_id, w).await.unwrap_err();
    assert!(matches!(err, Error::Core(vouch_core::Error::InvalidWeight(_))));
  }
}

#[tokio::test]
async fn set_weight_and_remove() {
  let s = store().await;
  let (a, b) = pair(&s).await;
  let created = s.add_edge(a.profile_id, b.profile_id, 1.0).await.unwrap();

  let updated = s
    .set_edge_weight(a.profile_id, b.profile_id, 0.25)
    .await
    .unwrap()
    .expect("edge exists");
  assert_eq!(updated.edge_id, created.edge().edge_id);
  assert_eq!(updated.weight, 0.25);
  assert!(s.set_edge_weight(b.profile_id, a.profile_id, 0.5).await.unwrap().is_none());

  assert!(s.remove_edge(a.profile_id, b.profile_id).await.unwrap());
  assert!(!s.remove_edge(a.profile_id, b.profile_id).await.unwrap());
  assert!(s.edges_into(b.profile_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn edge_listing_for_unknown_profile() {
  let s = store().await;
  let err = s.edges_into(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::Core(vouch_core::Error::ProfileNotFound(_))));
}

// ─── Compute write-back ──────────────────────────────────────────────────────

#[tokio::test]
async fn apply_batches_keep_seeds_pinned() {
  let s = store().await;
  let (a, b) = pair(&s).await;
  s.mark_seed(a.profile_id, true).await.unwrap();

  s.apply_depths(vec![
    DepthUpdate { profile_id: a.profile_id, trust_depth: None },
    DepthUpdate { profile_id: b.profile_id, trust_depth: Some(3) },
    DepthUpdate { profile_id: Uuid::new_v4(), trust_depth: Some(1) },
  ])
  .await
  .unwrap();

  s.apply_scores(vec![
    ScoreUpdate {
      profile_id:              a.profile_id,
      rank_score:              12.0,
      trusted_by_count:        0,
      trust_received_sum:      0.0,
      following_trusted_count: 1,
    },
    ScoreUpdate {
      profile_id:              b.profile_id,
      rank_score:              75.0,
      trusted_by_count:        1,
      trust_received_sum:      100.0,
      following_trusted_count: 0,
    },
  ])
  .await
  .unwrap();

  let a = s.get_profile(a.profile_id).await.unwrap().unwrap();
  assert_eq!((a.trust_depth, a.rank_score), (Some(0), SEED_SCORE));
  assert_eq!(a.following_trusted_count, 1);

  let b = s.get_profile(b.profile_id).await.unwrap().unwrap();
  assert_eq!((b.trust_depth, b.rank_score), (Some(3), 75.0));
  assert_eq!(b.trusted_by_count, 1);
  assert_eq!(b.trust_received_sum, 100.0);
}

#[tokio::test]
async fn snapshot_sees_every_profile_and_edge() {
  let s = store().await;
  let (a, b) = pair(&s).await;
  let c = s.upsert_profile("carol".into()).await.unwrap().profile;
  s.add_edge(a.profile_id, b.profile_id, 1.0).await.unwrap();
  s.add_edge(b.profile_id, c.profile_id, 0.5).await.unwrap();

  let snap = s.snapshot().await.unwrap();
  let handles: Vec<_> = snap.profiles.iter().map(|p| p.handle.as_str()).collect();
  assert_eq!(handles, ["alice", "bob", "carol"]);
  assert_eq!(snap.edges.len(), 2);
  assert_eq!(snap.edges[1].weight, 0.5);
}

// ─── Metadata ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn metadata_round_trip_and_overwrite() {
  let s = store().await;
  let (a, _) = pair(&s).await;

  let mut extra = serde_json::Map::new();
  extra.insert("verified".into(), serde_json::Value::Bool(true));
  let meta = ProfileMetadata {
    profile_id:      a.profile_id,
    display_name:    Some("Alice".into()),
    avatar_url:      None,
    followers_count: Some(1200),
    following_count: Some(80),
    extra,
    fetched_at:      Utc::now(),
  };
  s.upsert_metadata(meta.clone()).await.unwrap();

  let stored = s.get_metadata(a.profile_id).await.unwrap().unwrap();
  assert_eq!(stored.display_name.as_deref(), Some("Alice"));
  assert_eq!(stored.followers_count, Some(1200));
  assert_eq!(stored.extra.get("verified"), Some(&serde_json::Value::Bool(true)));

  s.upsert_metadata(ProfileMetadata { display_name: Some("Al".into()), ..meta })
    .await
    .unwrap();
  let stored = s.get_metadata(a.profile_id).await.unwrap().unwrap();
  assert_eq!(stored.display_name.as_deref(), Some("Al"));
}

#[tokio::test]
async fn metadata_for_unknown_profile_is_rejected() {
  let s = store().await;
  let meta = ProfileMetadata {
    profile_id:      Uuid::new_v4(),
    display_name:    None,
    avatar_url:      None,
    followers_count: None,
    following_count: None,
    extra:           serde_json::Map::new(),
    fetched_at:      Utc::now(),
  };
  assert!(s.upsert_metadata(meta).await.is_err());
  assert!(s.get_metadata(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Engine over SQLite ──────────────────────────────────────────────────────

#[tokio::test]
async fn engine_ranks_a_chain_persisted_in_sqlite() {
  let source = StaticSource::new().with_follows("s", ["a"]).with_follows("a", ["b"]);
  let e = TrustEngine::new(store().await, source, EngineConfig::default()).unwrap();

  e.mark_seed("s", true).await.unwrap();
  let summary = e.discover_from(vec!["s".into(), "a".into()], None).await.unwrap();
  assert_eq!(summary.discovery.edges_created, 2);
  assert!(summary.recompute.convergence.converged);

  let a = e.find_profile("a").await.unwrap();
  let b = e.find_profile("b").await.unwrap();
  assert_eq!((a.trust_depth, a.rank_score), (Some(1), 75.0));
  assert_eq!((b.trust_depth, b.rank_score), (Some(2), 58.0));

  let s = e.find_profile("s").await.unwrap();
  assert_eq!((s.trust_depth, s.rank_score), (Some(0), SEED_SCORE));
}
