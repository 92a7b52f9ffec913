//! Graph building: turn follow lists into profiles and trust edges.
//!
//! Discovery is a best-effort batch. Follow lists are fetched concurrently
//! (bounded), but each result is applied to the store under the engine's
//! write gate, one at a time. A handle whose fetch fails, or an edge the store
//! rejects, is logged and skipped; the rest of the batch carries on.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::{
  sync::{Mutex, Semaphore},
  task::JoinSet,
};

use crate::{
  Error, Result,
  edge::{DEFAULT_WEIGHT, EdgeOutcome},
  source::{DiscoveredAccount, SocialGraphSource},
  store::GraphStore,
};

/// Totals for one discovery batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryReport {
  /// Followed accounts returned by the source, after the fan-out cap.
  pub accounts_fetched:    usize,
  pub edges_created:       usize,
  /// Profiles that did not exist before this batch.
  pub profiles_discovered: usize,
  /// Edges the store refused (self-loops, weight conflicts, bad handles).
  pub edges_rejected:      usize,
  /// Handles whose follow list could not be fetched.
  pub failed_handles:      Vec<String>,
}

/// Walk the pages of `handle`'s follow list until the source runs out or
/// `max_fanout` accounts have been collected.
pub async fn fetch_following_capped<G>(
  source: &G,
  handle: &str,
  max_fanout: usize,
) -> Result<Vec<DiscoveredAccount>, G::Error>
where
  G: SocialGraphSource,
{
  let mut accounts = Vec::new();
  let mut cursor = None;

  while accounts.len() < max_fanout {
    let page = source.fetch_following(handle.to_owned(), cursor).await?;
    tracing::debug!(handle, fetched = page.accounts.len(), has_more = page.has_more, "follow page");
    accounts.extend(page.accounts);

    match page.next_cursor {
      Some(next) if page.has_more => cursor = Some(next),
      _ => break,
    }
  }

  accounts.truncate(max_fanout);
  Ok(accounts)
}

/// Record that `origin` follows every account in `accounts`.
///
/// Only a failure to resolve `origin` itself is returned; per-account
/// failures are logged and counted in `report`.
pub async fn apply_follows<S>(
  store: &S,
  origin: &str,
  accounts: Vec<DiscoveredAccount>,
  report: &mut DiscoveryReport,
) -> Result<()>
where
  S: GraphStore,
{
  let origin = store.upsert_profile(origin.to_owned()).await.map_err(Into::into)?;
  if origin.created {
    report.profiles_discovered += 1;
  }
  let origin_id = origin.profile.profile_id;

  for account in accounts {
    let followed = match store.upsert_profile(account.handle.clone()).await {
      Ok(u) => u,
      Err(e) => {
        let e: Error = e.into();
        tracing::warn!(origin = %origin.profile.handle, handle = %account.handle, error = %e, "skipping followed account");
        report.edges_rejected += 1;
        continue;
      }
    };
    if followed.created {
      report.profiles_discovered += 1;
    }
    let followed_id = followed.profile.profile_id;

    if account.has_metadata()
      && let Err(e) = store.upsert_metadata(account.to_metadata(followed_id)).await
    {
      let e: Error = e.into();
      tracing::warn!(handle = %followed.profile.handle, error = %e, "metadata not stored");
    }

    match store.add_edge(origin_id, followed_id, DEFAULT_WEIGHT).await {
      Ok(EdgeOutcome::Created(_)) => report.edges_created += 1,
      Ok(EdgeOutcome::Unchanged(_)) => {}
      Err(e) => {
        let e: Error = e.into();
        tracing::warn!(
          truster = %origin.profile.handle,
          trustee = %followed.profile.handle,
          error = %e,
          "trust edge rejected"
        );
        report.edges_rejected += 1;
      }
    }
  }

  Ok(())
}

/// Fetch the follow lists of `handles` with at most `concurrency` requests
/// in flight and apply each one under `gate` as it arrives.
pub async fn discover<S, G>(
  store: &S,
  source: Arc<G>,
  gate: &Mutex<()>,
  handles: Vec<String>,
  max_fanout: usize,
  concurrency: usize,
) -> DiscoveryReport
where
  S: GraphStore,
  G: SocialGraphSource + 'static,
{
  let permits = Arc::new(Semaphore::new(concurrency.max(1)));
  let mut tasks = JoinSet::new();

  for handle in handles {
    let source = Arc::clone(&source);
    let permits = Arc::clone(&permits);
    tasks.spawn(async move {
      let _permit = permits.acquire_owned().await;
      let fetched = fetch_following_capped(source.as_ref(), &handle, max_fanout).await;
      (handle, fetched)
    });
  }

  let mut report = DiscoveryReport::default();

  while let Some(joined) = tasks.join_next().await {
    let (handle, fetched) = match joined {
      Ok(done) => done,
      Err(e) => {
        tracing::warn!(error = %e, "follow-list fetch task aborted");
        continue;
      }
    };

    let accounts = match fetched {
      Ok(accounts) => accounts,
      Err(e) => {
        tracing::warn!(handle = %handle, error = %e, "follow list unavailable, skipping");
        report.failed_handles.push(handle);
        continue;
      }
    };
    report.accounts_fetched += accounts.len();

    let _write = gate.lock().await;
    if let Err(e) = apply_follows(store, &handle, accounts, &mut report).await {
      tracing::warn!(handle = %handle, error = %e, "could not record follow list");
      report.failed_handles.push(handle);
    }
  }

  report.failed_handles.sort();
  report
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    memory::MemoryStore,
    profile::ProfileFilter,
    source::StaticSource,
  };

  async fn run(store: &MemoryStore, source: StaticSource, handles: &[&str], fanout: usize) -> DiscoveryReport {
    let gate = Mutex::new(());
    discover(
      store,
      Arc::new(source),
      &gate,
      handles.iter().map(|h| (*h).to_owned()).collect(),
      fanout,
      2,
    )
    .await
  }

  #[tokio::test]
  async fn discovery_creates_profiles_and_edges() {
    let store = MemoryStore::new();
    let source = StaticSource::new()
      .with_follows("s1", ["a", "b"])
      .with_follows("s2", ["b", "c"]);

    let report = run(&store, source, &["s1", "s2"], 10).await;
    assert_eq!(report.edges_created, 4);
    assert_eq!(report.profiles_discovered, 5);
    assert!(report.failed_handles.is_empty());

    let b = store.get_profile_by_handle("b".into()).await.unwrap().unwrap();
    assert_eq!(store.edges_into(b.profile_id).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn rediscovery_is_idempotent() {
    let store = MemoryStore::new();
    let source = StaticSource::new().with_follows("s", ["a", "b"]);

    run(&store, source.clone(), &["s"], 10).await;
    let before = store.snapshot().await.unwrap();
    let again = run(&store, source, &["s"], 10).await;
    let after = store.snapshot().await.unwrap();

    assert_eq!(again.edges_created, 0);
    assert_eq!(again.profiles_discovered, 0);
    assert_eq!(before.edges, after.edges);
    assert_eq!(before.profiles.len(), after.profiles.len());
  }

  #[tokio::test]
  async fn failed_fetch_does_not_abort_the_batch() {
    let store = MemoryStore::new();
    let source = StaticSource::new()
      .with_follows("good", ["a"])
      .with_follows("bad", ["b"])
      .failing("bad");

    let report = run(&store, source, &["bad", "good", "missing"], 10).await;
    assert_eq!(report.failed_handles, ["bad", "missing"]);
    assert_eq!(report.edges_created, 1);
    assert!(store.get_profile_by_handle("b".into()).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn fanout_cap_spans_pages() {
    let store = MemoryStore::new();
    let source = StaticSource::new()
      .with_follows("s", ["a", "b", "c", "d", "e"])
      .page_size(2);

    let report = run(&store, source, &["s"], 3).await;
    assert_eq!(report.accounts_fetched, 3);
    assert_eq!(report.edges_created, 3);
    assert!(store.get_profile_by_handle("d".into()).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn self_follows_and_bad_handles_are_rejected_per_edge() {
    let store = MemoryStore::new();
    let source = StaticSource::new().with_follows("s", ["S", "a", "not valid"]);

    let report = run(&store, source, &["s"], 10).await;
    assert_eq!(report.edges_created, 1);
    assert_eq!(report.edges_rejected, 2);
    assert_eq!(store.list_profiles(ProfileFilter::default()).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn metadata_is_stored_alongside() {
    let store = MemoryStore::new();
    let account = DiscoveredAccount {
      display_name: Some("Ada".into()),
      followers_count: Some(42),
      ..DiscoveredAccount::new("ada")
    };
    let source = StaticSource::new().with_account("s", account);

    run(&store, source, &["s"], 10).await;
    let ada = store.get_profile_by_handle("ada".into()).await.unwrap().unwrap();
    let meta = store.get_metadata(ada.profile_id).await.unwrap().unwrap();
    assert_eq!(meta.display_name.as_deref(), Some("Ada"));
    assert_eq!(meta.followers_count, Some(42));
  }
}
