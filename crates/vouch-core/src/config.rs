//! Engine tuning, deserialised from the server's configuration file.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, score::ScorePolicy};

/// Runtime parameters of a [`TrustEngine`](crate::engine::TrustEngine).
/// Every field has a default, so an empty `[engine]` table is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Cap on convergence passes.
  pub max_iterations:         u32,
  /// Convergence threshold on the largest per-pass score change.
  pub epsilon:                f64,
  /// Cap on followed accounts taken from one follow list.
  pub max_fanout_per_account: usize,
  /// Follow lists fetched at the same time during discovery.
  pub discovery_concurrency:  usize,
  /// Recompute depths and scores right after a seed toggle or a manual edge
  /// change. Discovery always recomputes.
  pub recompute_on_change:    bool,
  pub policy:                 ScorePolicy,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      max_iterations:         10,
      epsilon:                0.01,
      max_fanout_per_account: 500,
      discovery_concurrency:  4,
      recompute_on_change:    true,
      policy:                 ScorePolicy::default(),
    }
  }
}

impl EngineConfig {
  /// Checked once when an engine is built.
  pub fn validate(&self) -> Result<()> {
    if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
      return Err(Error::InvalidQuery(format!("epsilon must be positive, got {}", self.epsilon)));
    }
    if self.discovery_concurrency == 0 {
      return Err(Error::InvalidQuery("discovery_concurrency must be at least 1".into()));
    }
    self.policy.validate()
  }
}
