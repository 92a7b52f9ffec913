//! The social graph source: who does an account follow?
//!
//! Discovery consumes follow lists through [`SocialGraphSource`]. Real
//! backends are paginated and unreliable; every call may fail independently.
//! [`StaticSource`] serves a fixed follow map and backs tests and offline
//! fixture runs.

use std::{
  collections::{HashMap, HashSet},
  future::Future,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::profile::ProfileMetadata;

// ─── Wire types ──────────────────────────────────────────────────────────────

/// One followed account as reported by the source. Only `handle` is
/// required; everything else is opportunistic metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredAccount {
  pub handle:          String,
  #[serde(default)]
  pub display_name:    Option<String>,
  #[serde(default)]
  pub avatar_url:      Option<String>,
  #[serde(default)]
  pub followers_count: Option<u64>,
  #[serde(default)]
  pub following_count: Option<u64>,
  #[serde(flatten)]
  pub extra:           serde_json::Map<String, serde_json::Value>,
}

impl DiscoveredAccount {
  pub fn new(handle: impl Into<String>) -> Self {
    Self { handle: handle.into(), ..Self::default() }
  }

  /// Whether the source sent anything beyond the handle.
  pub fn has_metadata(&self) -> bool {
    self.display_name.is_some()
      || self.avatar_url.is_some()
      || self.followers_count.is_some()
      || self.following_count.is_some()
      || !self.extra.is_empty()
  }

  pub fn to_metadata(&self, profile_id: Uuid) -> ProfileMetadata {
    ProfileMetadata {
      profile_id,
      display_name: self.display_name.clone(),
      avatar_url: self.avatar_url.clone(),
      followers_count: self.followers_count,
      following_count: self.following_count,
      extra: self.extra.clone(),
      fetched_at: Utc::now(),
    }
  }
}

/// One page of a follow list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowingPage {
  pub accounts:    Vec<DiscoveredAccount>,
  #[serde(default)]
  pub next_cursor: Option<String>,
  #[serde(default)]
  pub has_more:    bool,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the external "who does X follow" service.
pub trait SocialGraphSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch one page of the accounts `handle` follows, starting at `cursor`
  /// (`None` for the first page).
  fn fetch_following(
    &self,
    handle: String,
    cursor: Option<String>,
  ) -> impl Future<Output = Result<FollowingPage, Self::Error>> + Send + '_;
}

// ─── Static source ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SourceError {
  #[error("unknown handle: {0}")]
  UnknownHandle(String),

  #[error("source unavailable for {0}")]
  Unavailable(String),

  #[error("malformed cursor: {0:?}")]
  BadCursor(String),
}

/// A source answering from a fixed follow map, `handle → followed accounts`.
///
/// The map keys are matched case-insensitively. Pages are cut at
/// `page_size` with the offset as cursor.
#[derive(Debug, Clone)]
pub struct StaticSource {
  follows:   HashMap<String, Vec<DiscoveredAccount>>,
  failing:   HashSet<String>,
  page_size: usize,
}

impl Default for StaticSource {
  fn default() -> Self {
    Self { follows: HashMap::new(), failing: HashSet::new(), page_size: 100 }
  }
}

impl StaticSource {
  pub fn new() -> Self { Self::default() }

  /// Build from a map as found in a JSON fixture file.
  pub fn from_map(follows: HashMap<String, Vec<DiscoveredAccount>>) -> Self {
    let follows = follows.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
    Self { follows, ..Self::default() }
  }

  /// Register that `handle` follows `followed`.
  pub fn with_follows<I, H>(mut self, handle: &str, followed: I) -> Self
  where
    I: IntoIterator<Item = H>,
    H: Into<String>,
  {
    self
      .follows
      .entry(handle.to_lowercase())
      .or_default()
      .extend(followed.into_iter().map(DiscoveredAccount::new));
    self
  }

  /// Register a followed account carrying metadata.
  pub fn with_account(mut self, handle: &str, account: DiscoveredAccount) -> Self {
    self.follows.entry(handle.to_lowercase()).or_default().push(account);
    self
  }

  /// Make every fetch for `handle` fail.
  pub fn failing(mut self, handle: &str) -> Self {
    self.failing.insert(handle.to_lowercase());
    self
  }

  pub fn page_size(mut self, page_size: usize) -> Self {
    self.page_size = page_size.max(1);
    self
  }
}

impl SocialGraphSource for StaticSource {
  type Error = SourceError;

  async fn fetch_following(
    &self,
    handle: String,
    cursor: Option<String>,
  ) -> Result<FollowingPage, SourceError> {
    let key = handle.to_lowercase();
    if self.failing.contains(&key) {
      return Err(SourceError::Unavailable(handle));
    }
    let all = self.follows.get(&key).ok_or(SourceError::UnknownHandle(handle))?;

    let start = match cursor {
      Some(c) => c.parse::<usize>().map_err(|_| SourceError::BadCursor(c))?,
      None => 0,
    };
    let end = (start + self.page_size).min(all.len());
    let accounts = all.get(start..end).map(<[_]>::to_vec).unwrap_or_default();
    let has_more = end < all.len();

    Ok(FollowingPage {
      accounts,
      next_cursor: has_more.then(|| end.to_string()),
      has_more,
    })
  }
}
