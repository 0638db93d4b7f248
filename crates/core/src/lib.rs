//! Core library for the plangate query gateway
//!
//! This crate contains the gateway's business logic, including:
//! - Request and response envelopes and the dispatch primitive
//! - Query id allocation and relation keys
//! - Artifact storage and the external datastore/compiler commands

pub mod artifact;
pub mod backend;
pub mod dispatch;
pub mod error;
pub mod query;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
