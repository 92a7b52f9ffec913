//! Error types for `vouch-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid handle: {0:?}")]
  InvalidHandle(String),

  #[error("invalid trust weight {0}: must be finite and in (0, 1]")]
  InvalidWeight(f64),

  #[error("profile {0} cannot trust itself")]
  SelfLoop(Uuid),

  #[error(
    "edge {truster} -> {trustee} already exists with weight {existing}, \
     refusing weight {requested}"
  )]
  ConflictingWeight {
    truster:   Uuid,
    trustee:   Uuid,
    existing:  f64,
    requested: f64,
  },

  #[error("profile not found: {0}")]
  ProfileNotFound(Uuid),

  #[error("no profile with handle {0:?}")]
  HandleNotFound(String),

  #[error("invalid query: {0}")]
  InvalidQuery(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error. Used wherever generic code talks to a
  /// [`GraphStore`](crate::store::GraphStore).
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  /// Whether the error is a rejected structural write rather than a backend
  /// failure.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::InvalidHandle(_)
        | Self::InvalidWeight(_)
        | Self::SelfLoop(_)
        | Self::ConflictingWeight { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
