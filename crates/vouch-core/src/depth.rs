//! Depth classification: shortest trust distance from the seed set.
//!
//! A multi-source breadth-first search over outgoing edges. Every seed starts
//! the frontier at depth 0; each wave assigns `d + 1` to the not-yet-visited
//! profiles trusted by the wave at depth `d`. Profiles never reached are
//! unreachable (`None`).

use std::collections::VecDeque;

use crate::{snapshot::GraphSnapshot, store::DepthUpdate};

/// Depth of every profile in `snapshot`, positionally aligned with
/// `snapshot.profiles`. Always computed from scratch.
pub fn classify(snapshot: &GraphSnapshot) -> Vec<Option<u32>> {
  let adj = snapshot.adjacency();
  let mut depths: Vec<Option<u32>> = vec![None; snapshot.profiles.len()];
  let mut queue = VecDeque::new();

  for (i, profile) in snapshot.profiles.iter().enumerate() {
    if profile.is_seed {
      depths[i] = Some(0);
      queue.push_back(i);
    }
  }

  while let Some(current) = queue.pop_front() {
    let Some(d) = depths[current] else { continue };
    for link in &adj.outgoing[current] {
      if depths[link.peer].is_none() {
        depths[link.peer] = Some(d + 1);
        queue.push_back(link.peer);
      }
    }
  }

  depths
}

/// The updates needed to bring the stored depths in line with [`classify`].
/// Profiles whose depth is already correct are omitted.
pub fn changed_depths(snapshot: &GraphSnapshot) -> Vec<DepthUpdate> {
  classify(snapshot)
    .into_iter()
    .zip(&snapshot.profiles)
    .filter(|(depth, p)| *depth != p.trust_depth)
    .map(|(trust_depth, p)| DepthUpdate { profile_id: p.profile_id, trust_depth })
    .collect()
}
