//! Errors raised by the social graph sources the server can be configured
//! with.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("source base_url {0:?} is not a valid base URL")]
  BaseUrl(String),

  #[error("could not build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("follow list request for {handle} failed: {source}")]
  Request {
    handle: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("social graph source answered {status} for {handle}")]
  Status {
    handle: String,
    status: reqwest::StatusCode,
  },

  #[error("social graph source does not know {0}")]
  UnknownHandle(String),

  #[error(transparent)]
  Fixture(#[from] vouch_core::source::SourceError),
}
