// Copyright 2026 Navscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Navscout — adaptive navigation discovery for storefront sites.
//!
//! Drives an already-navigated browser page through a prioritized chain of
//! discovery strategies (pattern templates, mega-menu hover capture, adaptive
//! header/trigger probing, sector templates, plain link collection, mobile
//! drawer fallback) and returns the highest-confidence navigation hierarchy.
//!
//! The browser itself sits behind the [`driver::PageHandle`] /
//! [`driver::BrowserHandle`] traits; a Chromium adapter ships in
//! [`driver::chromium`] and a scripted in-memory driver in
//! [`driver::scripted`] for tests and embedding.

#![allow(clippy::new_without_default)]

pub mod clock;
pub mod confidence;
pub mod config;
pub mod discovery;
pub mod dom;
pub mod driver;
pub mod engine;
pub mod hints;
pub mod site;
pub mod stealth;
pub mod strategies;
pub mod types;
pub mod viewport;

pub use config::EngineConfig;
pub use engine::DiscoveryEngine;
pub use types::{NavigationItem, StrategyKind, StrategyResult};
