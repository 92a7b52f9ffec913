//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! free-form metadata compact JSON.

use chrono::{DateTime, Utc};
use vouch_core::{
  edge::TrustEdge,
  profile::{Profile, ProfileMetadata},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const PROFILE_COLUMNS: &str = "profile_id, handle, is_seed, trust_depth, rank_score, \
   trusted_by_count, trust_received_sum, following_trusted_count, created_at, updated_at";

pub const EDGE_COLUMNS: &str = "edge_id, truster_id, trustee_id, weight, created_at";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub profile_id:              String,
  pub handle:                  String,
  pub is_seed:                 bool,
  pub trust_depth:             Option<u32>,
  pub rank_score:              f64,
  pub trusted_by_count:        u32,
  pub trust_received_sum:      f64,
  pub following_trusted_count: u32,
  pub created_at:              String,
  pub updated_at:              String,
}

impl RawProfile {
  /// Map a row selected with [`PROFILE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      profile_id:              row.get(0)?,
      handle:                  row.get(1)?,
      is_seed:                 row.get(2)?,
      trust_depth:             row.get(3)?,
      rank_score:              row.get(4)?,
      trusted_by_count:        row.get(5)?,
      trust_received_sum:      row.get(6)?,
      following_trusted_count: row.get(7)?,
      created_at:              row.get(8)?,
      updated_at:              row.get(9)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      profile_id:              decode_uuid(&self.profile_id)?,
      handle:                  self.handle,
      is_seed:                 self.is_seed,
      trust_depth:             self.trust_depth,
      rank_score:              self.rank_score,
      trusted_by_count:        self.trusted_by_count,
      trust_received_sum:      self.trust_received_sum,
      following_trusted_count: self.following_trusted_count,
      created_at:              decode_dt(&self.created_at)?,
      updated_at:              decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `trust_edges` row.
pub struct RawEdge {
  pub edge_id:    String,
  pub truster_id: String,
  pub trustee_id: String,
  pub weight:     f64,
  pub created_at: String,
}

impl RawEdge {
  /// Map a row selected with [`EDGE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      edge_id:    row.get(0)?,
      truster_id: row.get(1)?,
      trustee_id: row.get(2)?,
      weight:     row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_edge(self) -> Result<TrustEdge> {
    Ok(TrustEdge {
      edge_id:    decode_uuid(&self.edge_id)?,
      truster_id: decode_uuid(&self.truster_id)?,
      trustee_id: decode_uuid(&self.trustee_id)?,
      weight:     self.weight,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `profile_metadata` row.
pub struct RawMetadata {
  pub profile_id:      String,
  pub display_name:    Option<String>,
  pub avatar_url:      Option<String>,
  pub followers_count: Option<i64>,
  pub following_count: Option<i64>,
  pub extra_json:      String,
  pub fetched_at:      String,
}

impl RawMetadata {
  pub fn into_metadata(self) -> Result<ProfileMetadata> {
    Ok(ProfileMetadata {
      profile_id:      decode_uuid(&self.profile_id)?,
      display_name:    self.display_name,
      avatar_url:      self.avatar_url,
      followers_count: self.followers_count.map(|n| n.max(0) as u64),
      following_count: self.following_count.map(|n| n.max(0) as u64),
      extra:           serde_json::from_str(&self.extra_json)?,
      fetched_at:      decode_dt(&self.fetched_at)?,
    })
  }
}

/// Counts are stored as signed integers; clamp anything SQLite cannot hold.
pub fn encode_count(n: Option<u64>) -> Option<i64> {
  n.map(|n| i64::try_from(n).unwrap_or(i64::MAX))
}
