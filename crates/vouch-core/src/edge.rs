//! Trust edges: `truster → trustee`, observed as the truster following the
//! trustee.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Weight given to edges created by discovery.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// A directed, weighted trust relationship. At most one exists per ordered
/// `(truster_id, trustee_id)` pair; only the weight may change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustEdge {
  pub edge_id:    Uuid,
  pub truster_id: Uuid,
  pub trustee_id: Uuid,
  pub weight:     f64,
  pub created_at: DateTime<Utc>,
}

impl TrustEdge {
  pub fn new(truster_id: Uuid, trustee_id: Uuid, weight: f64) -> Self {
    Self {
      edge_id: Uuid::new_v4(),
      truster_id,
      trustee_id,
      weight,
      created_at: Utc::now(),
    }
  }
}

/// What [`GraphStore::add_edge`](crate::store::GraphStore::add_edge) did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "edge", rename_all = "snake_case")]
pub enum EdgeOutcome {
  Created(TrustEdge),
  /// The identical edge was already present.
  Unchanged(TrustEdge),
}

impl EdgeOutcome {
  pub fn edge(&self) -> &TrustEdge {
    match self {
      Self::Created(e) | Self::Unchanged(e) => e,
    }
  }

  pub fn is_created(&self) -> bool { matches!(self, Self::Created(_)) }
}

pub fn validate_weight(weight: f64) -> Result<()> {
  if weight.is_finite() && weight > 0.0 && weight <= 1.0 {
    Ok(())
  } else {
    Err(Error::InvalidWeight(weight))
  }
}

/// Structural checks every backend applies before inserting an edge.
pub fn validate_edge(truster: Uuid, trustee: Uuid, weight: f64) -> Result<()> {
  if truster == trustee {
    return Err(Error::SelfLoop(truster));
  }
  validate_weight(weight)
}

/// Decide what re-adding an edge that already exists means.
pub fn reconcile_existing(existing: TrustEdge, requested: f64) -> Result<EdgeOutcome> {
  if existing.weight == requested {
    Ok(EdgeOutcome::Unchanged(existing))
  } else {
    Err(Error::ConflictingWeight {
      truster: existing.truster_id,
      trustee: existing.trustee_id,
      existing: existing.weight,
      requested,
    })
  }
}
