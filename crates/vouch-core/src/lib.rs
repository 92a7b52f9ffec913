//! Core types, traits and algorithms of the Vouch trust ranking engine.
//!
//! Trust propagates outward from a curated seed set along observed "follows"
//! edges. This crate holds the graph model, the [`store::GraphStore`] and
//! [`source::SocialGraphSource`] abstractions, the depth classifier, the score
//! convergence rule, ranking queries, and the [`engine::TrustEngine`] that
//! ties them together.
//!
//! Nothing here depends on HTTP or a database; backends live in their own
//! crates.

// Trait methods spell out `Send` futures; implementations use `async fn`.
#![allow(async_fn_in_trait)]

pub mod builder;
pub mod config;
pub mod depth;
pub mod edge;
pub mod engine;
pub mod error;
pub mod memory;
pub mod profile;
pub mod ranking;
pub mod score;
pub mod snapshot;
pub mod source;
pub mod store;

pub use error::{Error, Result};
