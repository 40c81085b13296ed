//! Static site configuration: keyword lists, per-domain quirks, and pattern
//! templates. All tables are embedded at compile time and injected read-only
//! at engine construction.

pub mod keywords;
pub mod patterns;
pub mod quirks;
