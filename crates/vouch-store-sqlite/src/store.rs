//! [`SqliteStore`], the SQLite implementation of [`GraphStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use vouch_core::{
  edge::{self, EdgeOutcome, TrustEdge},
  profile::{Profile, ProfileFilter, ProfileMetadata, ProfileUpsert, SEED_SCORE, normalize_handle},
  snapshot::GraphSnapshot,
  store::{DepthUpdate, GraphStore, ScoreUpdate},
};

use crate::{
  Error, Result,
  encode::{
    EDGE_COLUMNS, PROFILE_COLUMNS, RawEdge, RawMetadata, RawProfile, encode_count, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Vouch trust graph backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch one profile by id, or fail with `ProfileNotFound`.
  async fn require_profile(&self, id: Uuid) -> Result<Profile> {
    self
      .get_profile(id)
      .await?
      .ok_or(Error::Core(vouch_core::Error::ProfileNotFound(id)))
  }

  async fn select_edges(&self, column: &'static str, id: Uuid) -> Result<Vec<TrustEdge>> {
    let id_str = encode_uuid(id);

    let raws: Option<Vec<RawEdge>> = self
      .conn
      .call(move |conn| {
        if !profile_exists(conn, &id_str)? {
          return Ok(None);
        }
        let mut stmt = conn.prepare(&format!(
          "SELECT {EDGE_COLUMNS} FROM trust_edges WHERE {column} = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawEdge::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(rows))
      })
      .await?;

    let raws = raws.ok_or(Error::Core(vouch_core::Error::ProfileNotFound(id)))?;
    raws.into_iter().map(RawEdge::into_edge).collect()
  }
}

fn profile_exists(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM profiles WHERE profile_id = ?1",
        rusqlite::params![id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn select_edge(
  conn: &rusqlite::Connection,
  truster: &str,
  trustee: &str,
) -> rusqlite::Result<Option<RawEdge>> {
  conn
    .query_row(
      &format!("SELECT {EDGE_COLUMNS} FROM trust_edges WHERE truster_id = ?1 AND trustee_id = ?2"),
      rusqlite::params![truster, trustee],
      RawEdge::from_row,
    )
    .optional()
}

/// What `add_edge` found inside its transaction.
enum EdgeInsert {
  MissingProfile(Uuid),
  Existing(RawEdge),
  Inserted,
}

// ─── GraphStore impl ─────────────────────────────────────────────────────────

impl GraphStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn upsert_profile(&self, handle: String) -> Result<ProfileUpsert> {
    let fresh = Profile::zero_state(normalize_handle(&handle)?);

    let id_str     = encode_uuid(fresh.profile_id);
    let handle_str = fresh.handle.clone();
    let at_str     = encode_dt(fresh.created_at);

    let (created, raw): (bool, RawProfile) = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO profiles (profile_id, handle, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?3)
           ON CONFLICT (handle) DO NOTHING",
          rusqlite::params![id_str, handle_str, at_str],
        )?;
        let raw = conn.query_row(
          &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE handle = ?1"),
          rusqlite::params![handle_str],
          RawProfile::from_row,
        )?;
        Ok((inserted == 1, raw))
      })
      .await?;

    Ok(ProfileUpsert { profile: raw.into_profile()?, created })
  }

  async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE profile_id = ?1"),
              rusqlite::params![id_str],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn get_profile_by_handle(&self, handle: String) -> Result<Option<Profile>> {
    let handle = normalize_handle(&handle)?;

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE handle = ?1"),
              rusqlite::params![handle],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_profiles(&self, filter: ProfileFilter) -> Result<Vec<Profile>> {
    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles
           WHERE (?1 IS NULL OR is_seed = ?1)
           ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![filter.is_seed], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn mark_seed(&self, id: Uuid, is_seed: bool) -> Result<Profile> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        // Promotion pins depth and score in the same statement so the seed
        // CHECK constraint holds; demotion leaves both for the next pass.
        let n = if is_seed {
          conn.execute(
            "UPDATE profiles
             SET is_seed = 1, trust_depth = 0, rank_score = ?2, updated_at = ?3
             WHERE profile_id = ?1",
            rusqlite::params![id_str, SEED_SCORE, at_str],
          )?
        } else {
          conn.execute(
            "UPDATE profiles SET is_seed = 0, updated_at = ?2 WHERE profile_id = ?1",
            rusqlite::params![id_str, at_str],
          )?
        };
        Ok(n)
      })
      .await?;

    if changed == 0 {
      return Err(Error::Core(vouch_core::Error::ProfileNotFound(id)));
    }
    self.require_profile(id).await
  }

  // ── Edges ─────────────────────────────────────────────────────────────────

  async fn add_edge(&self, truster: Uuid, trustee: Uuid, weight: f64) -> Result<EdgeOutcome> {
    edge::validate_edge(truster, trustee, weight)?;
    let candidate = TrustEdge::new(truster, trustee, weight);

    let edge_str    = encode_uuid(candidate.edge_id);
    let truster_str = encode_uuid(truster);
    let trustee_str = encode_uuid(trustee);
    let at_str      = encode_dt(candidate.created_at);

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (id, id_str) in [(truster, &truster_str), (trustee, &trustee_str)] {
          if !profile_exists(&tx, id_str)? {
            return Ok(EdgeInsert::MissingProfile(id));
          }
        }
        if let Some(existing) = select_edge(&tx, &truster_str, &trustee_str)? {
          return Ok(EdgeInsert::Existing(existing));
        }
        tx.execute(
          "INSERT INTO trust_edges (edge_id, truster_id, trustee_id, weight, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![edge_str, truster_str, trustee_str, weight, at_str],
        )?;
        tx.commit()?;
        Ok(EdgeInsert::Inserted)
      })
      .await?;

    match found {
      EdgeInsert::MissingProfile(id) => Err(Error::Core(vouch_core::Error::ProfileNotFound(id))),
      EdgeInsert::Existing(raw) => Ok(edge::reconcile_existing(raw.into_edge()?, weight)?),
      EdgeInsert::Inserted => Ok(EdgeOutcome::Created(candidate)),
    }
  }

  async fn set_edge_weight(
    &self,
    truster: Uuid,
    trustee: Uuid,
    weight: f64,
  ) -> Result<Option<TrustEdge>> {
    edge::validate_weight(weight)?;
    let truster_str = encode_uuid(truster);
    let trustee_str = encode_uuid(trustee);

    let raw: Option<RawEdge> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE trust_edges SET weight = ?3 WHERE truster_id = ?1 AND trustee_id = ?2",
          rusqlite::params![truster_str, trustee_str, weight],
        )?;
        Ok(select_edge(conn, &truster_str, &trustee_str)?)
      })
      .await?;

    raw.map(RawEdge::into_edge).transpose()
  }

  async fn remove_edge(&self, truster: Uuid, trustee: Uuid) -> Result<bool> {
    let truster_str = encode_uuid(truster);
    let trustee_str = encode_uuid(trustee);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM trust_edges WHERE truster_id = ?1 AND trustee_id = ?2",
          rusqlite::params![truster_str, trustee_str],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn edges_into(&self, id: Uuid) -> Result<Vec<TrustEdge>> {
    self.select_edges("trustee_id", id).await
  }

  async fn edges_out_of(&self, id: Uuid) -> Result<Vec<TrustEdge>> {
    self.select_edges("truster_id", id).await
  }

  // ── Compute passes ────────────────────────────────────────────────────────

  async fn snapshot(&self) -> Result<GraphSnapshot> {
    let (profiles, edges): (Vec<RawProfile>, Vec<RawEdge>) = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let profiles = tx
          .prepare(&format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY rowid"))?
          .query_map([], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let edges = tx
          .prepare(&format!("SELECT {EDGE_COLUMNS} FROM trust_edges ORDER BY rowid"))?
          .query_map([], RawEdge::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        tx.commit()?;
        Ok((profiles, edges))
      })
      .await?;

    Ok(GraphSnapshot {
      profiles: profiles.into_iter().map(RawProfile::into_profile).collect::<Result<_>>()?,
      edges:    edges.into_iter().map(RawEdge::into_edge).collect::<Result<_>>()?,
    })
  }

  async fn apply_depths(&self, updates: Vec<DepthUpdate>) -> Result<()> {
    let rows: Vec<(String, Option<u32>)> = updates
      .into_iter()
      .map(|u| (encode_uuid(u.profile_id), u.trust_depth))
      .collect();
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "UPDATE profiles
             SET trust_depth = CASE WHEN is_seed = 1 THEN 0 ELSE ?2 END, updated_at = ?3
             WHERE profile_id = ?1",
          )?;
          for (id, depth) in &rows {
            stmt.execute(rusqlite::params![id, depth, at_str])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn apply_scores(&self, updates: Vec<ScoreUpdate>) -> Result<()> {
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "UPDATE profiles
             SET rank_score = CASE WHEN is_seed = 1 THEN ?6 ELSE ?2 END,
                 trusted_by_count = ?3,
                 trust_received_sum = ?4,
                 following_trusted_count = ?5,
                 updated_at = ?7
             WHERE profile_id = ?1",
          )?;
          for u in &updates {
            stmt.execute(rusqlite::params![
              encode_uuid(u.profile_id),
              u.rank_score,
              u.trusted_by_count,
              u.trust_received_sum,
              u.following_trusted_count,
              SEED_SCORE,
              at_str,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Metadata ──────────────────────────────────────────────────────────────

  async fn upsert_metadata(&self, metadata: ProfileMetadata) -> Result<()> {
    let id         = metadata.profile_id;
    let id_str     = encode_uuid(id);
    let extra_json = serde_json::Value::Object(metadata.extra).to_string();
    let followers  = encode_count(metadata.followers_count);
    let following  = encode_count(metadata.following_count);
    let at_str     = encode_dt(metadata.fetched_at);
    let name       = metadata.display_name;
    let avatar     = metadata.avatar_url;

    let stored = self
      .conn
      .call(move |conn| {
        if !profile_exists(conn, &id_str)? {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO profile_metadata (
             profile_id, display_name, avatar_url, followers_count,
             following_count, extra_json, fetched_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (profile_id) DO UPDATE SET
             display_name    = excluded.display_name,
             avatar_url      = excluded.avatar_url,
             followers_count = excluded.followers_count,
             following_count = excluded.following_count,
             extra_json      = excluded.extra_json,
             fetched_at      = excluded.fetched_at",
          rusqlite::params![id_str, name, avatar, followers, following, extra_json, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !stored {
      return Err(Error::Core(vouch_core::Error::ProfileNotFound(id)));
    }
    Ok(())
  }

  async fn get_metadata(&self, id: Uuid) -> Result<Option<ProfileMetadata>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawMetadata> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT profile_id, display_name, avatar_url, followers_count,
                      following_count, extra_json, fetched_at
               FROM profile_metadata WHERE profile_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawMetadata {
                  profile_id:      row.get(0)?,
                  display_name:    row.get(1)?,
                  avatar_url:      row.get(2)?,
                  followers_count: row.get(3)?,
                  following_count: row.get(4)?,
                  extra_json:      row.get(5)?,
                  fetched_at:      row.get(6)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMetadata::into_metadata).transpose()
  }
}
