//! Query module
//!
//! Query identifiers and relation keys shared by every request kind.

mod qid;
mod relation;

pub use qid::{QueryId, QueryIdAllocator};
pub use relation::RelationKey;
