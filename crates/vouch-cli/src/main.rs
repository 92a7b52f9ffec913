//! `vouch`: operator CLI for a running vouch server.
//!
//! # Usage
//!
//! ```
//! vouch --url http://localhost:8080 leaderboard --page 2
//! vouch seed alice
//! vouch discover
//! vouch --config ~/.config/vouch/config.toml profile bob
//! ```

mod client;
mod render;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "vouch", about = "Operator CLI for the vouch trust ranking server")]
struct Args {
  /// Path to a TOML config file (url, timeout_secs).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the vouch server (default: http://localhost:8080).
  #[arg(long, env = "VOUCH_URL")]
  url: Option<String>,

  /// Print raw JSON instead of tables.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show a profile (created in zero state if unknown).
  Profile { handle: String },
  /// Show where a profile sits among all scored profiles.
  Percentile { handle: String },
  /// List the accounts that trust a profile.
  Trusters { handle: String },
  /// List the accounts a profile trusts.
  Trustees { handle: String },
  /// Page through the leaderboard.
  Leaderboard {
    #[arg(long, default_value_t = 1)]
    page:      u32,
    #[arg(long, default_value_t = 50)]
    page_size: u32,
    /// Only seeds (`true`) or only non-seeds (`false`).
    #[arg(long)]
    seeds:     Option<bool>,
  },
  /// Mark a profile as a seed.
  Seed { handle: String },
  /// Remove a profile from the seed set.
  Unseed { handle: String },
  /// Recompute depths and scores, then show one profile.
  Rank { handle: String },
  /// Record that TRUSTER trusts TRUSTEE.
  Trust {
    truster: String,
    trustee: String,
    #[arg(long)]
    weight:  Option<f64>,
  },
  /// Change the weight of an existing trust edge.
  Reweight {
    truster: String,
    trustee: String,
    weight:  f64,
  },
  /// Remove a trust edge.
  Untrust { truster: String, trustee: String },
  /// Expand follow lists into the graph (all seeds when none are given).
  Discover {
    handles:    Vec<String>,
    #[arg(long)]
    max_fanout: Option<usize>,
  },
  /// Reassign every depth from the current seeds.
  RecomputeDepths,
  /// Iterate scores to a fixed point.
  Converge {
    #[arg(long)]
    max_iterations: Option<u32>,
    #[arg(long)]
    epsilon:        Option<f64>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:          String,
  #[serde(default)]
  timeout_secs: Option<u64>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| "http://localhost:8080".to_string()),
    timeout:  Duration::from_secs(file_cfg.timeout_secs.unwrap_or(60)),
  };

  let client = ApiClient::new(api_config)?;
  run(&client, args.command, args.json).await
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(value)?);
  } else {
    print!("{}", text(value));
  }
  Ok(())
}

fn edge_line(e: &vouch_core::edge::TrustEdge) -> String {
  format!("{} -> {}  weight {}\n", e.truster_id, e.trustee_id, e.weight)
}

async fn run(client: &ApiClient, command: Command, json: bool) -> Result<()> {
  match command {
    Command::Profile { handle } => {
      let profile = client.profile(&handle).await?;
      let meta = client.metadata(&handle).await?;
      emit(json, &profile, |p| render::profile(p, meta.as_ref()))
    }
    Command::Percentile { handle } => {
      emit(json, &client.percentile(&handle).await?, render::percentile)
    }
    Command::Trusters { handle } => emit(json, &client.trusters(&handle).await?, |edges| {
      edges.iter().map(edge_line).collect()
    }),
    Command::Trustees { handle } => emit(json, &client.trustees(&handle).await?, |edges| {
      edges.iter().map(edge_line).collect()
    }),
    Command::Leaderboard { page, page_size, seeds } => {
      let rows = client.leaderboard(page, page_size, seeds).await?;
      let first = (page.max(1) as usize - 1) * page_size as usize + 1;
      emit(json, &rows, |rows| render::leaderboard(rows, first))
    }
    Command::Seed { handle } => {
      emit(json, &client.set_seed(&handle, true).await?, |p| render::profile(p, None))
    }
    Command::Unseed { handle } => {
      emit(json, &client.set_seed(&handle, false).await?, |p| render::profile(p, None))
    }
    Command::Rank { handle } => {
      emit(json, &client.rank(&handle).await?, |p| render::profile(p, None))
    }
    Command::Trust { truster, trustee, weight } => {
      let outcome = client.trust(&truster, &trustee, weight).await?;
      emit(json, &outcome, |o| {
        let verb = if o.is_created() { "created" } else { "already present" };
        format!("{truster} -> {trustee} {verb} (weight {})\n", o.edge().weight)
      })
    }
    Command::Reweight { truster, trustee, weight } => {
      emit(json, &client.set_weight(&truster, &trustee, weight).await?, edge_line)
    }
    Command::Untrust { truster, trustee } => {
      client.untrust(&truster, &trustee).await?;
      if !json {
        println!("{truster} -> {trustee} removed");
      }
      Ok(())
    }
    Command::Discover { handles, max_fanout } => {
      emit(json, &client.discover(handles, max_fanout).await?, render::discovery)
    }
    Command::RecomputeDepths => {
      let changed = client.recompute_depths().await?;
      emit(json, &changed, |n| format!("{n} depth(s) changed\n"))
    }
    Command::Converge { max_iterations, epsilon } => {
      emit(json, &client.converge(max_iterations, epsilon).await?, render::converge)
    }
  }
}
