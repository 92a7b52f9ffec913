//! Score convergence.
//!
//! Each pass recomputes every non-seed score from the previous pass's scores
//! of its trusters (a synchronous update, so visiting order never matters):
//!
//! ```text
//! no trusters:  score = untrusted_floor
//! otherwise:    avg   = Σ(truster score × weight) / trusters
//!               score = round(min(ceiling, avg × base_weight
//!                                 + min(max_network_bonus, trusters × per_truster_bonus)))
//! ```
//!
//! The base term is a damped average of values in `[0, 100]` and the bonus is
//! capped, so scores stay bounded and settle quickly even on cyclic graphs.
//! Passes repeat until the largest change drops below `epsilon` or the
//! iteration cap is reached.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  profile::SEED_SCORE,
  snapshot::{Adjacency, GraphSnapshot},
  store::ScoreUpdate,
};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Constants of the score rule. The defaults are the pinned production
/// policy; override them only deliberately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorePolicy {
  /// Multiplier applied to the average received trust.
  pub base_weight:       f64,
  /// Bonus per direct truster.
  pub per_truster_bonus: f64,
  pub max_network_bonus: f64,
  /// Score of a profile nobody trusts.
  pub untrusted_floor:   f64,
  pub ceiling:           f64,
}

impl Default for ScorePolicy {
  fn default() -> Self {
    Self {
      base_weight:       0.7,
      per_truster_bonus: 5.0,
      max_network_bonus: 20.0,
      untrusted_floor:   5.0,
      ceiling:           100.0,
    }
  }
}

impl ScorePolicy {
  /// Reject constants that could push a score outside `[0, SEED_SCORE]`.
  pub fn validate(&self) -> Result<()> {
    let fields = [
      ("base_weight", self.base_weight),
      ("per_truster_bonus", self.per_truster_bonus),
      ("max_network_bonus", self.max_network_bonus),
      ("untrusted_floor", self.untrusted_floor),
      ("ceiling", self.ceiling),
    ];
    if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
      return Err(Error::InvalidQuery(format!("policy {name} must be finite, got {value}")));
    }
    if !(self.ceiling > 0.0 && self.ceiling <= SEED_SCORE) {
      return Err(Error::InvalidQuery(format!(
        "policy ceiling must be in (0, {SEED_SCORE}], got {}",
        self.ceiling
      )));
    }
    if !(0.0..=SEED_SCORE).contains(&self.untrusted_floor) {
      return Err(Error::InvalidQuery(format!(
        "policy untrusted_floor must be in [0, {SEED_SCORE}], got {}",
        self.untrusted_floor
      )));
    }
    if !(0.0..=1.0).contains(&self.base_weight) {
      return Err(Error::InvalidQuery(format!(
        "policy base_weight must be in [0, 1], got {}",
        self.base_weight
      )));
    }
    if self.per_truster_bonus < 0.0 || self.max_network_bonus < 0.0 {
      return Err(Error::InvalidQuery("policy bonuses must not be negative".into()));
    }
    Ok(())
  }

  /// Score for a profile with `trusters` direct trusters whose weighted
  /// scores add up to `received`.
  pub fn score(&self, trusters: u32, received: f64) -> f64 {
    if trusters == 0 {
      return self.untrusted_floor.min(self.ceiling).max(0.0);
    }
    let average = received / f64::from(trusters);
    let base = average * self.base_weight;
    let bonus = (f64::from(trusters) * self.per_truster_bonus).min(self.max_network_bonus);
    (base + bonus).min(self.ceiling).max(0.0).round()
  }
}

// ─── Passes ──────────────────────────────────────────────────────────────────

/// Outcome of [`converge`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergeReport {
  pub iterations_run: u32,
  pub converged:      bool,
  /// Largest absolute score change in the final pass.
  pub max_delta:      f64,
}

/// Everything one pass derives for one profile.
#[derive(Debug, Clone, Copy)]
struct Derived {
  score:     f64,
  trusters:  u32,
  received:  f64,
  following: u32,
}

fn pass(snapshot: &GraphSnapshot, adj: &Adjacency, policy: &ScorePolicy, prev: &[f64]) -> Vec<Derived> {
  snapshot
    .profiles
    .iter()
    .enumerate()
    .map(|(i, profile)| {
      let trusters = adj.incoming[i].len() as u32;
      let received: f64 = adj.incoming[i]
        .iter()
        .map(|link| prev[link.peer] * link.weight)
        .sum();
      let score = if profile.is_seed {
        SEED_SCORE
      } else {
        policy.score(trusters, received)
      };
      Derived {
        score,
        trusters,
        received,
        following: adj.outgoing[i].len() as u32,
      }
    })
    .collect()
}

/// Iterate the score rule over `snapshot` starting from its stored scores.
///
/// Returns the report and one [`ScoreUpdate`] per profile, aligned with
/// `snapshot.profiles`. With `max_iterations == 0` only the counters are
/// refreshed and scores are returned unchanged.
pub fn converge(
  snapshot: &GraphSnapshot,
  policy: &ScorePolicy,
  max_iterations: u32,
  epsilon: f64,
) -> (ConvergeReport, Vec<ScoreUpdate>) {
  let adj = snapshot.adjacency();
  let mut scores: Vec<f64> = snapshot
    .profiles
    .iter()
    .map(|p| if p.is_seed { SEED_SCORE } else { p.rank_score })
    .collect();

  let mut report = ConvergeReport { iterations_run: 0, converged: false, max_delta: 0.0 };
  let mut derived = pass(snapshot, &adj, policy, &scores);

  while report.iterations_run < max_iterations {
    if report.iterations_run > 0 {
      derived = pass(snapshot, &adj, policy, &scores);
    }
    report.iterations_run += 1;
    report.max_delta = derived
      .iter()
      .zip(&scores)
      .map(|(d, prev)| (d.score - prev).abs())
      .fold(0.0, f64::max);
    scores = derived.iter().map(|d| d.score).collect();

    tracing::debug!(
      iteration = report.iterations_run,
      max_delta = report.max_delta,
      "score pass complete"
    );

    if report.max_delta < epsilon {
      report.converged = true;
      break;
    }
  }

  // Received sums must match the scores written alongside them.
  let counters = if report.iterations_run == 0 {
    derived
  } else {
    pass(snapshot, &adj, policy, &scores)
  };

  let updates = snapshot
    .profiles
    .iter()
    .zip(counters.into_iter().zip(scores))
    .map(|(p, (d, score))| ScoreUpdate {
      profile_id:              p.profile_id,
      rank_score:              score,
      trusted_by_count:        d.trusters,
      trust_received_sum:      d.received,
      following_trusted_count: d.following,
    })
    .collect();

  (report, updates)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{edge::TrustEdge, profile::Profile};

  fn graph(names: &[&str], seeds: &[usize], edges: &[(usize, usize, f64)]) -> GraphSnapshot {
    let mut profiles: Vec<Profile> =
      names.iter().map(|n| Profile::zero_state((*n).to_owned())).collect();
    for &s in seeds {
      profiles[s].set_seed(true);
    }
    let edges = edges
      .iter()
      .map(|&(a, b, w)| TrustEdge::new(profiles[a].profile_id, profiles[b].profile_id, w))
      .collect();
    GraphSnapshot { profiles, edges }
  }

  fn run(g: &GraphSnapshot) -> (ConvergeReport, Vec<ScoreUpdate>) {
    converge(g, &ScorePolicy::default(), 50, 0.01)
  }

  #[test]
  fn policy_matches_pinned_constants() {
    let p = ScorePolicy::default();
    assert_eq!(p.score(0, 0.0), 5.0);
    assert_eq!(p.score(1, 100.0), 75.0);
    assert_eq!(p.score(2, 200.0), 80.0);
    assert_eq!(p.score(1, 75.0), 58.0, "57.5 rounds half away from zero");
    // Bonus saturates at 20; total caps at 100.
    assert_eq!(p.score(10, 1000.0), 90.0);
    let generous = ScorePolicy { base_weight: 1.0, ..ScorePolicy::default() };
    assert_eq!(generous.score(4, 400.0), 100.0);
  }

  #[test]
  fn out_of_range_policies_are_rejected() {
    assert!(ScorePolicy::default().validate().is_ok());
    let bad = [
      ScorePolicy { ceiling: 150.0, ..ScorePolicy::default() },
      ScorePolicy { ceiling: 0.0, ..ScorePolicy::default() },
      ScorePolicy { untrusted_floor: -3.0, ..ScorePolicy::default() },
      ScorePolicy { untrusted_floor: 101.0, ..ScorePolicy::default() },
      ScorePolicy { base_weight: 1.5, ..ScorePolicy::default() },
      ScorePolicy { per_truster_bonus: -1.0, ..ScorePolicy::default() },
      ScorePolicy { max_network_bonus: f64::INFINITY, ..ScorePolicy::default() },
      ScorePolicy { base_weight: f64::NAN, ..ScorePolicy::default() },
    ];
    for policy in bad {
      assert!(
        matches!(policy.validate(), Err(Error::InvalidQuery(_))),
        "{policy:?} should be rejected"
      );
    }
  }

  #[test]
  fn floor_is_held_under_the_ceiling() {
    let low_ceiling = ScorePolicy { ceiling: 3.0, ..ScorePolicy::default() };
    assert_eq!(low_ceiling.score(0, 0.0), 3.0);
    let negative = ScorePolicy { untrusted_floor: -3.0, ..ScorePolicy::default() };
    assert_eq!(negative.score(0, 0.0), 0.0);
  }

  #[test]
  fn single_seed_single_edge() {
    let g = graph(&["s", "a"], &[0], &[(0, 1, 1.0)]);
    let (_, u) = converge(&g, &ScorePolicy::default(), 1, 0.01);
    assert_eq!(u[1].trusted_by_count, 1);
    assert_eq!(u[1].trust_received_sum, 100.0);
    assert_eq!(u[1].rank_score, 75.0);
    assert_eq!(u[0].following_trusted_count, 1);
    assert_eq!(u[0].rank_score, SEED_SCORE);
  }

  #[test]
  fn untrusted_profile_gets_floor() {
    let g = graph(&["s", "b"], &[0], &[]);
    let (report, u) = run(&g);
    assert!(report.converged);
    assert_eq!(u[1].rank_score, 5.0);
    assert_eq!(u[1].trusted_by_count, 0);
  }

  #[test]
  fn two_seeds_trusting_one_profile() {
    let g = graph(&["s1", "s2", "x"], &[0, 1], &[(0, 2, 1.0), (1, 2, 1.0)]);
    let (_, u) = run(&g);
    assert_eq!(u[2].trusted_by_count, 2);
    assert_eq!(u[2].trust_received_sum, 200.0);
    assert_eq!(u[2].rank_score, 80.0);
  }

  #[test]
  fn chain_converges_through_intermediate_score() {
    let g = graph(&["s", "a", "b"], &[0], &[(0, 1, 1.0), (1, 2, 1.0)]);

    let (first, u) = converge(&g, &ScorePolicy::default(), 1, 0.01);
    assert!(!first.converged);
    assert_eq!(u[1].rank_score, 75.0);
    assert_eq!(u[2].rank_score, 5.0, "b still sees a's initial score of 0");

    let (report, u) = run(&g);
    assert!(report.converged);
    assert_eq!(report.iterations_run, 3);
    assert_eq!(u[1].rank_score, 75.0);
    assert_eq!(u[2].rank_score, 58.0);
    assert_eq!(u[2].trust_received_sum, 75.0);
  }

  #[test]
  fn partial_weight_scales_received_trust() {
    let g = graph(&["s", "a"], &[0], &[(0, 1, 0.5)]);
    let (_, u) = run(&g);
    assert_eq!(u[1].trust_received_sum, 50.0);
    assert_eq!(u[1].rank_score, 40.0);
  }

  #[test]
  fn cycles_stay_bounded_and_converge() {
    let g = graph(
      &["s", "a", "b", "c"],
      &[0],
      &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 1, 1.0), (2, 1, 1.0)],
    );
    let (report, u) = converge(&g, &ScorePolicy::default(), 50, 0.01);
    assert!(report.converged);
    assert!(u.iter().all(|x| (0.0..=100.0).contains(&x.rank_score)));
  }

  #[test]
  fn rerunning_after_convergence_is_stable() {
    let mut g = graph(&["s", "a", "b"], &[0], &[(0, 1, 1.0), (1, 2, 1.0), (2, 1, 1.0)]);
    let (report, u) = run(&g);
    assert!(report.converged);

    for (p, upd) in g.profiles.iter_mut().zip(&u) {
      p.rank_score = upd.rank_score;
    }
    let (again, _) = run(&g);
    assert!(again.converged);
    assert!(again.max_delta < 0.01);
    assert_eq!(again.iterations_run, 1);
  }

  #[test]
  fn iteration_cap_reports_non_convergence() {
    let g = graph(&["s", "a", "b", "c"], &[0], &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]);
    let (report, _) = converge(&g, &ScorePolicy::default(), 2, 0.01);
    assert_eq!(report.iterations_run, 2);
    assert!(!report.converged);
  }

  #[test]
  fn capped_run_reports_received_from_final_scores() {
    let g = graph(&["s", "a", "b"], &[0], &[(0, 1, 1.0), (1, 2, 1.0)]);
    let (report, u) = converge(&g, &ScorePolicy::default(), 1, 0.01);
    assert!(!report.converged);
    assert_eq!(u[1].rank_score, 75.0);
    assert_eq!(u[2].rank_score, 5.0);
    assert_eq!(u[2].trust_received_sum, u[1].rank_score);
  }

  #[test]
  fn zero_iterations_only_refreshes_counters() {
    let mut g = graph(&["s", "a"], &[0], &[(0, 1, 1.0)]);
    g.profiles[1].rank_score = 12.0;
    let (report, u) = converge(&g, &ScorePolicy::default(), 0, 0.01);
    assert_eq!(report.iterations_run, 0);
    assert_eq!(u[1].rank_score, 12.0);
    assert_eq!(u[1].trusted_by_count, 1);
  }
}
