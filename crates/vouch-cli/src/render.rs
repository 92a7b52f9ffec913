//! Plain-text rendering of API responses for the terminal.

use std::fmt::Write as _;

use vouch_core::{
  engine::DiscoverySummary,
  profile::{Profile, ProfileMetadata},
  score::ConvergeReport,
};

use crate::client::Percentile;

fn depth(p: &Profile) -> String {
  p.trust_depth.map_or_else(|| "-".to_owned(), |d| d.to_string())
}

/// One leaderboard table; `first_rank` is the position of the first row.
pub fn leaderboard(rows: &[Profile], first_rank: usize) -> String {
  let width = rows.iter().map(|p| p.handle.len()).max().unwrap_or(6).max(6);
  let mut out = format!(
    "{:>5}  {:<width$}  {:>5}  {:>5}  {:>8}  {:>9}\n",
    "#", "handle", "score", "depth", "trusters", "received"
  );
  for (i, p) in rows.iter().enumerate() {
    let seed = if p.is_seed { " *" } else { "" };
    let _ = writeln!(
      out,
      "{:>5}  {:<width$}  {:>5.0}  {:>5}  {:>8}  {:>9.1}{seed}",
      first_rank + i,
      p.handle,
      p.rank_score,
      depth(p),
      p.trusted_by_count,
      p.trust_received_sum,
    );
  }
  out
}

pub fn profile(p: &Profile, meta: Option<&ProfileMetadata>) -> String {
  let mut out = format!("@{}{}\n", p.handle, if p.is_seed { " (seed)" } else { "" });
  let _ = writeln!(out, "  score      {:.0}", p.rank_score);
  let _ = writeln!(out, "  depth      {}", depth(p));
  let _ = writeln!(out, "  trusted by {} (received {:.1})", p.trusted_by_count, p.trust_received_sum);
  let _ = writeln!(out, "  trusts     {}", p.following_trusted_count);
  if let Some(m) = meta {
    if let Some(name) = &m.display_name {
      let _ = writeln!(out, "  name       {name}");
    }
    if let Some(n) = m.followers_count {
      let _ = writeln!(out, "  followers  {n}");
    }
  }
  out
}

pub fn percentile(p: &Percentile) -> String {
  format!("@{}  score {:.0}  percentile {:.0}\n", p.handle, p.rank_score, p.percentile)
}

pub fn converge(r: &ConvergeReport) -> String {
  let state = if r.converged { "converged" } else { "NOT converged" };
  format!("{state} after {} iteration(s), max delta {:.4}\n", r.iterations_run, r.max_delta)
}

pub fn discovery(s: &DiscoverySummary) -> String {
  let d = &s.discovery;
  let mut out = format!(
    "fetched {} account(s): {} new profile(s), {} new edge(s), {} rejected\n",
    d.accounts_fetched, d.profiles_discovered, d.edges_created, d.edges_rejected
  );
  if !d.failed_handles.is_empty() {
    let _ = writeln!(out, "failed: {}", d.failed_handles.join(", "));
  }
  let _ = write!(out, "{} depth(s) changed; ", s.recompute.depths_changed);
  out.push_str(&converge(&s.recompute.convergence));
  out
}
