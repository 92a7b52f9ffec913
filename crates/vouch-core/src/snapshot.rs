//! Point-in-time copies of the trust graph.
//!
//! Every compute pass works on a [`GraphSnapshot`] and writes its results back
//! in one batch, so no pass ever observes a half-applied change.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{edge::TrustEdge, profile::Profile};

/// All profiles and edges as of one read.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
  pub profiles: Vec<Profile>,
  pub edges:    Vec<TrustEdge>,
}

/// An inbound or outbound edge resolved to arena positions.
#[derive(Debug, Clone, Copy)]
pub struct Link {
  pub peer:   usize,
  pub weight: f64,
}

/// Arena view of a snapshot: profiles addressed by their position in
/// `GraphSnapshot::profiles`, with forward and reverse adjacency lists.
#[derive(Debug)]
pub struct Adjacency {
  /// `outgoing[i]` lists the profiles `i` trusts.
  pub outgoing: Vec<Vec<Link>>,
  /// `incoming[i]` lists the profiles that trust `i`.
  pub incoming: Vec<Vec<Link>>,
}

impl GraphSnapshot {
  /// Build the arena view. Edges whose endpoints are missing from the
  /// snapshot are ignored.
  pub fn adjacency(&self) -> Adjacency {
    let index: HashMap<Uuid, usize> = self
      .profiles
      .iter()
      .enumerate()
      .map(|(i, p)| (p.profile_id, i))
      .collect();

    let mut outgoing = vec![Vec::new(); self.profiles.len()];
    let mut incoming = vec![Vec::new(); self.profiles.len()];

    for edge in &self.edges {
      let (Some(&from), Some(&to)) =
        (index.get(&edge.truster_id), index.get(&edge.trustee_id))
      else {
        continue;
      };
      outgoing[from].push(Link { peer: to, weight: edge.weight });
      incoming[to].push(Link { peer: from, weight: edge.weight });
    }

    Adjacency { outgoing, incoming }
  }
}
