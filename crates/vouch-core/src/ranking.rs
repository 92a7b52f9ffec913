//! Leaderboard ordering and percentiles over converged scores.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, profile::Profile};

/// Largest page a leaderboard request may ask for.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Parameters for a leaderboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardQuery {
  /// 1-based page number.
  pub page:      u32,
  pub page_size: u32,
  /// Restrict to seeds (`Some(true)`) or non-seeds (`Some(false)`).
  pub is_seed:   Option<bool>,
}

impl Default for LeaderboardQuery {
  fn default() -> Self { Self { page: 1, page_size: 50, is_seed: None } }
}

impl LeaderboardQuery {
  pub fn validate(&self) -> Result<()> {
    if self.page == 0 {
      return Err(Error::InvalidQuery("page is 1-based".into()));
    }
    if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
      return Err(Error::InvalidQuery(format!(
        "page_size must be between 1 and {MAX_PAGE_SIZE}"
      )));
    }
    Ok(())
  }

  fn offset(&self) -> usize { (self.page as usize - 1) * self.page_size as usize }
}

/// Leaderboard order: score descending, then received trust descending, then
/// handle ascending so that equal entries always come out the same way.
pub fn leaderboard_order(a: &Profile, b: &Profile) -> Ordering {
  b.rank_score
    .total_cmp(&a.rank_score)
    .then_with(|| b.trust_received_sum.total_cmp(&a.trust_received_sum))
    .then_with(|| a.handle.cmp(&b.handle))
}

/// Sort `profiles` into leaderboard order and cut out the requested page.
/// The seed filter is applied before paging.
pub fn leaderboard(mut profiles: Vec<Profile>, query: &LeaderboardQuery) -> Result<Vec<Profile>> {
  query.validate()?;
  if let Some(is_seed) = query.is_seed {
    profiles.retain(|p| p.is_seed == is_seed);
  }
  profiles.sort_by(leaderboard_order);
  Ok(
    profiles
      .into_iter()
      .skip(query.offset())
      .take(query.page_size as usize)
      .collect(),
  )
}

/// Position of `target` among the scored profiles (score > 0), counted from
/// the bottom, as a whole-number percentage. Ties share the highest position
/// of their group, so the top score is always 100. Unscored profiles sit at 0.
pub fn percentile(target: &Profile, population: &[Profile]) -> f64 {
  if target.rank_score <= 0.0 {
    return 0.0;
  }
  let scored = population.iter().filter(|p| p.rank_score > 0.0);
  let (total, at_or_below) = scored.fold((0u32, 0u32), |(n, k), p| {
    (n + 1, k + u32::from(p.rank_score <= target.rank_score))
  });
  if total == 0 {
    return 0.0;
  }
  (f64::from(at_or_below) / f64::from(total) * 100.0).round()
}
