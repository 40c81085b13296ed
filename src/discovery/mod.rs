//! Adaptive discovery primitives: find the header, classify its triggers,
//! probe them open, extract what they reveal.

pub mod extract;
pub mod header;
pub mod probe;
pub mod triggers;

use serde::{Deserialize, Serialize};

/// Where a candidate or toggler came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Restored from a cached hint.
    Cache,
    /// Found by fresh discovery.
    Discovery,
}
