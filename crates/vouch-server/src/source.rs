//! Social graph sources selectable from `config.toml`.
//!
//! [`HttpSource`] asks a remote follow-list service,
//! `GET {base_url}/accounts/{handle}/following[?cursor=…]`, which answers with
//! a [`FollowingPage`] as JSON. Fixture files feed a [`StaticSource`] for
//! offline runs.

use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::Context as _;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use vouch_core::source::{DiscoveredAccount, FollowingPage, SocialGraphSource, StaticSource};

use crate::{Error, SourceConfig};

// ─── HTTP ────────────────────────────────────────────────────────────────────

/// Follow lists fetched from a remote service over HTTP.
#[derive(Clone)]
pub struct HttpSource {
  client:   Client,
  base_url: Url,
  token:    Option<String>,
}

impl HttpSource {
  pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, Error> {
    let parsed = Url::parse(base_url).map_err(|_| Error::BaseUrl(base_url.to_owned()))?;
    if parsed.cannot_be_a_base() {
      return Err(Error::BaseUrl(base_url.to_owned()));
    }
    let client = Client::builder().timeout(timeout).build().map_err(Error::Client)?;
    Ok(Self { client, base_url: parsed, token })
  }

  /// `{base_url}/accounts/{handle}/following`, with `handle` encoded as a
  /// single path segment.
  fn following_url(&self, handle: &str) -> Result<Url, Error> {
    if matches!(handle, "" | "." | "..") {
      return Err(Error::UnknownHandle(handle.to_owned()));
    }
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|()| Error::BaseUrl(self.base_url.to_string()))?
      .pop_if_empty()
      .extend(["accounts", handle, "following"]);
    Ok(url)
  }
}

impl SocialGraphSource for HttpSource {
  type Error = Error;

  async fn fetch_following(
    &self,
    handle: String,
    cursor: Option<String>,
  ) -> Result<FollowingPage, Error> {
    let mut req = self.client.get(self.following_url(&handle)?);
    if let Some(cursor) = &cursor {
      req = req.query(&[("cursor", cursor)]);
    }
    if let Some(token) = &self.token {
      req = req.bearer_auth(token);
    }

    let resp = req
      .send()
      .await
      .map_err(|source| Error::Request { handle: handle.clone(), source })?;

    match resp.status() {
      StatusCode::NOT_FOUND => Err(Error::UnknownHandle(handle)),
      status if !status.is_success() => Err(Error::Status { handle, status }),
      _ => resp
        .json()
        .await
        .map_err(|source| Error::Request { handle, source }),
    }
  }
}

// ─── Fixture ─────────────────────────────────────────────────────────────────

/// A followed account in a fixture file: a bare handle or a full account
/// object with metadata.
#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureEntry {
  Handle(String),
  Account(DiscoveredAccount),
}

/// Parse a fixture document, `{"handle": ["followed", {...}, …], …}`.
pub fn parse_fixture(json: &str) -> serde_json::Result<StaticSource> {
  let raw: HashMap<String, Vec<FixtureEntry>> = serde_json::from_str(json)?;
  let follows = raw
    .into_iter()
    .map(|(handle, entries)| {
      let accounts = entries
        .into_iter()
        .map(|e| match e {
          FixtureEntry::Handle(h) => DiscoveredAccount::new(h),
          FixtureEntry::Account(a) => a,
        })
        .collect();
      (handle, accounts)
    })
    .collect();
  Ok(StaticSource::from_map(follows))
}

pub fn load_fixture(path: &Path) -> anyhow::Result<StaticSource> {
  let json = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read fixture {path:?}"))?;
  parse_fixture(&json).with_context(|| format!("malformed fixture {path:?}"))
}

// ─── Either ──────────────────────────────────────────────────────────────────

/// Whichever source the configuration selected.
pub enum AnySource {
  Http(HttpSource),
  Fixture(StaticSource),
}

impl AnySource {
  pub fn from_config(config: &SourceConfig) -> anyhow::Result<Self> {
    Ok(match config {
      SourceConfig::Http { base_url, token, timeout_secs } => AnySource::Http(HttpSource::new(
        base_url,
        token.clone(),
        Duration::from_secs(*timeout_secs),
      )?),
      SourceConfig::Fixture { path } => AnySource::Fixture(load_fixture(&crate::expand_tilde(path))?),
    })
  }
}

impl SocialGraphSource for AnySource {
  type Error = Error;

  async fn fetch_following(
    &self,
    handle: String,
    cursor: Option<String>,
  ) -> Result<FollowingPage, Error> {
    match self {
      AnySource::Http(source) => source.fetch_following(handle, cursor).await,
      AnySource::Fixture(source) => Ok(source.fetch_following(handle, cursor).await?),
    }
  }
}
