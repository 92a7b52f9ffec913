//! Async HTTP client wrapping the vouch JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use vouch_core::{
  edge::{EdgeOutcome, TrustEdge},
  engine::DiscoverySummary,
  profile::{Profile, ProfileMetadata},
  score::ConvergeReport,
};

/// Connection settings for the vouch API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Percentile {
  pub handle:     String,
  pub rank_score: f64,
  pub percentile: f64,
}

#[derive(Debug, Deserialize)]
struct DepthsResponse {
  depths_changed: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for the vouch JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Turn a non-2xx response into an error carrying the server's message.
  async fn check(what: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = match resp.json::<ErrorBody>().await {
      Ok(body) => body.error,
      Err(_) => status.canonical_reason().unwrap_or("no details").to_owned(),
    };
    Err(anyhow!("{what} → {status}: {message}"))
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    tracing::debug!(path, "GET");
    let resp = self
      .client
      .get(self.url(path))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    let resp = Self::check(&format!("GET {path}"), resp).await?;
    resp.json().await.with_context(|| format!("deserialising GET {path}"))
  }

  async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
    tracing::debug!(path, %body, "POST");
    let resp = self
      .client
      .post(self.url(path))
      .json(&body)
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    let resp = Self::check(&format!("POST {path}"), resp).await?;
    resp.json().await.with_context(|| format!("deserialising POST {path}"))
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  /// `GET /api/profiles/{handle}`
  pub async fn profile(&self, handle: &str) -> Result<Profile> {
    self.get(&format!("/profiles/{handle}")).await
  }

  /// `GET /api/profiles/{handle}/metadata`; `None` when nothing was fetched.
  pub async fn metadata(&self, handle: &str) -> Result<Option<ProfileMetadata>> {
    let path = format!("/profiles/{handle}/metadata");
    let resp = self
      .client
      .get(self.url(&path))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let resp = Self::check(&format!("GET {path}"), resp).await?;
    resp.json().await.context("deserialising metadata").map(Some)
  }

  /// `GET /api/profiles/{handle}/percentile`
  pub async fn percentile(&self, handle: &str) -> Result<Percentile> {
    self.get(&format!("/profiles/{handle}/percentile")).await
  }

  /// `GET /api/profiles/{handle}/trusters`
  pub async fn trusters(&self, handle: &str) -> Result<Vec<TrustEdge>> {
    self.get(&format!("/profiles/{handle}/trusters")).await
  }

  /// `GET /api/profiles/{handle}/trustees`
  pub async fn trustees(&self, handle: &str) -> Result<Vec<TrustEdge>> {
    self.get(&format!("/profiles/{handle}/trustees")).await
  }

  /// `POST /api/profiles/{handle}/seed`
  pub async fn set_seed(&self, handle: &str, is_seed: bool) -> Result<Profile> {
    self
      .post(&format!("/profiles/{handle}/seed"), json!({ "is_seed": is_seed }))
      .await
  }

  /// `POST /api/profiles/{handle}/rank`
  pub async fn rank(&self, handle: &str) -> Result<Profile> {
    self.post(&format!("/profiles/{handle}/rank"), json!({})).await
  }

  /// `GET /api/leaderboard?page=&page_size=[&is_seed=]`
  pub async fn leaderboard(
    &self,
    page: u32,
    page_size: u32,
    is_seed: Option<bool>,
  ) -> Result<Vec<Profile>> {
    let mut query = format!("/leaderboard?page={page}&page_size={page_size}");
    if let Some(is_seed) = is_seed {
      query.push_str(&format!("&is_seed={is_seed}"));
    }
    self.get(&query).await
  }

  // ── Edges ─────────────────────────────────────────────────────────────────

  /// `POST /api/edges`
  pub async fn trust(&self, truster: &str, trustee: &str, weight: Option<f64>) -> Result<EdgeOutcome> {
    self
      .post(
        "/edges",
        json!({ "truster": truster, "trustee": trustee, "weight": weight }),
      )
      .await
  }

  /// `PUT /api/edges/{truster}/{trustee}`
  pub async fn set_weight(&self, truster: &str, trustee: &str, weight: f64) -> Result<TrustEdge> {
    let path = format!("/edges/{truster}/{trustee}");
    let resp = self
      .client
      .put(self.url(&path))
      .json(&json!({ "weight": weight }))
      .send()
      .await
      .with_context(|| format!("PUT {path} failed"))?;
    let resp = Self::check(&format!("PUT {path}"), resp).await?;
    resp.json().await.context("deserialising edge")
  }

  /// `DELETE /api/edges/{truster}/{trustee}`
  pub async fn untrust(&self, truster: &str, trustee: &str) -> Result<()> {
    let path = format!("/edges/{truster}/{trustee}");
    let resp = self
      .client
      .delete(self.url(&path))
      .send()
      .await
      .with_context(|| format!("DELETE {path} failed"))?;
    Self::check(&format!("DELETE {path}"), resp).await?;
    Ok(())
  }

  // ── Compute ───────────────────────────────────────────────────────────────

  /// `POST /api/discover`
  pub async fn discover(&self, handles: Vec<String>, max_fanout: Option<usize>) -> Result<DiscoverySummary> {
    self
      .post(
        "/discover",
        json!({ "seed_handles": handles, "max_fanout": max_fanout }),
      )
      .await
  }

  /// `POST /api/recompute/depths`
  pub async fn recompute_depths(&self) -> Result<usize> {
    let resp: DepthsResponse = self.post("/recompute/depths", json!({})).await?;
    Ok(resp.depths_changed)
  }

  /// `POST /api/converge`
  pub async fn converge(&self, max_iterations: Option<u32>, epsilon: Option<f64>) -> Result<ConvergeReport> {
    self
      .post(
        "/converge",
        json!({ "max_iterations": max_iterations, "epsilon": epsilon }),
      )
      .await
  }
}
