//! Browsing session reconstruction from browser history databases.
//!
//! Raw Chromium or Safari visit rows are decoded ([`parsers`]), folded into
//! per-domain sessions ([`sessions`]) and reduced into domain statistics
//! ([`stats`]) and search follow-up views ([`search`]). [`pipeline::analyze`]
//! runs the whole chain.

pub mod cli;
pub mod config;
pub mod logging;
pub mod metadata;
pub mod parsers;
pub mod pipeline;
pub mod search;
pub mod sessions;
pub mod stats;
pub mod util;
