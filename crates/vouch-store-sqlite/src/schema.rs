//! SQL schema for the Vouch SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    profile_id              TEXT PRIMARY KEY,
    handle                  TEXT NOT NULL UNIQUE,  -- normalised
    is_seed                 INTEGER NOT NULL DEFAULT 0,
    trust_depth             INTEGER,               -- NULL = unreachable
    rank_score              REAL NOT NULL DEFAULT 0
                            CHECK (rank_score BETWEEN 0 AND 100),
    trusted_by_count        INTEGER NOT NULL DEFAULT 0,
    trust_received_sum      REAL NOT NULL DEFAULT 0,
    following_trusted_count INTEGER NOT NULL DEFAULT 0,
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL,
    CHECK (is_seed = 0 OR (trust_depth = 0 AND rank_score = 100))
);

-- One edge per ordered pair; only `weight` is ever updated.
CREATE TABLE IF NOT EXISTS trust_edges (
    edge_id    TEXT PRIMARY KEY,
    truster_id TEXT NOT NULL REFERENCES profiles(profile_id),
    trustee_id TEXT NOT NULL REFERENCES profiles(profile_id),
    weight     REAL NOT NULL DEFAULT 1.0 CHECK (weight > 0 AND weight <= 1),
    created_at TEXT NOT NULL,
    UNIQUE (truster_id, trustee_id),
    CHECK  (truster_id != trustee_id)
);

-- Optional social metadata, fetched independently of the trust record.
CREATE TABLE IF NOT EXISTS profile_metadata (
    profile_id      TEXT PRIMARY KEY REFERENCES profiles(profile_id),
    display_name    TEXT,
    avatar_url      TEXT,
    followers_count INTEGER,
    following_count INTEGER,
    extra_json      TEXT NOT NULL DEFAULT '{}',
    fetched_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS profiles_seed_idx    ON profiles(is_seed);
CREATE INDEX IF NOT EXISTS edges_trustee_idx    ON trust_edges(trustee_id);

PRAGMA user_version = 1;
";
