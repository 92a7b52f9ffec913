//! Profiles: the tracked accounts of the trust graph.
//!
//! A profile carries the structural trust record only. Social metadata
//! (display name, avatar, follower counts) is fetched opportunistically and
//! lives in a separate [`ProfileMetadata`] record keyed by the same id, so no
//! trust computation ever depends on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Score held by every seed profile.
pub const SEED_SCORE: f64 = 100.0;

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Normalise a handle to its stored form: surrounding whitespace and a single
/// leading `@` are removed and the result is lower-cased.
///
/// Fails with [`Error::InvalidHandle`] when nothing usable is left or the
/// handle contains interior whitespace or `/`.
pub fn normalize_handle(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  let bare = trimmed.strip_prefix('@').unwrap_or(trimmed);
  if bare.is_empty()
    || bare.chars().any(|c| c.is_whitespace() || c == '/' || c == '@')
  {
    return Err(Error::InvalidHandle(raw.to_owned()));
  }
  Ok(bare.to_lowercase())
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// A tracked social account and its derived trust standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub profile_id:              Uuid,
  /// Normalised handle; unique across the store.
  pub handle:                  String,
  pub is_seed:                 bool,
  /// Minimum number of trust hops from any seed. `None` means unreachable.
  pub trust_depth:             Option<u32>,
  /// In `[0, 100]`; fixed at [`SEED_SCORE`] for seeds.
  pub rank_score:              f64,
  /// Distinct accounts that directly trust this one.
  pub trusted_by_count:        u32,
  /// Σ (truster score × edge weight) over direct trusters.
  pub trust_received_sum:      f64,
  /// Distinct accounts this one directly trusts.
  pub following_trusted_count: u32,
  pub created_at:              DateTime<Utc>,
  pub updated_at:              DateTime<Utc>,
}

impl Profile {
  /// A freshly discovered profile: unreachable, unscored, no edges.
  pub fn zero_state(handle: String) -> Self {
    let now = Utc::now();
    Self {
      profile_id: Uuid::new_v4(),
      handle,
      is_seed: false,
      trust_depth: None,
      rank_score: 0.0,
      trusted_by_count: 0,
      trust_received_sum: 0.0,
      following_trusted_count: 0,
      created_at: now,
      updated_at: now,
    }
  }

  /// Flip the seed flag. Promotion pins depth and score immediately;
  /// demotion leaves both for the next recomputation.
  pub fn set_seed(&mut self, is_seed: bool) {
    self.is_seed = is_seed;
    if is_seed {
      self.trust_depth = Some(0);
      self.rank_score = SEED_SCORE;
    }
    self.updated_at = Utc::now();
  }

  pub fn is_reachable(&self) -> bool { self.trust_depth.is_some() }
}

/// Result of [`GraphStore::upsert_profile`](crate::store::GraphStore::upsert_profile).
#[derive(Debug, Clone)]
pub struct ProfileUpsert {
  pub profile: Profile,
  /// `true` if the profile did not exist before the call.
  pub created: bool,
}

/// Filter for [`GraphStore::list_profiles`](crate::store::GraphStore::list_profiles).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ProfileFilter {
  pub is_seed: Option<bool>,
}

impl ProfileFilter {
  pub fn seeds() -> Self { Self { is_seed: Some(true) } }

  pub fn matches(&self, profile: &Profile) -> bool {
    self.is_seed.is_none_or(|s| s == profile.is_seed)
  }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Optional social metadata for a profile, as last reported by the social
/// graph source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
  pub profile_id:      Uuid,
  pub display_name:    Option<String>,
  pub avatar_url:      Option<String>,
  pub followers_count: Option<u64>,
  pub following_count: Option<u64>,
  /// Any further fields the source returned, kept verbatim.
  pub extra:           serde_json::Map<String, serde_json::Value>,
  pub fetched_at:      DateTime<Utc>,
}
