//! Beyonder reporter: cached pathway reporting over HTTP.
//!
//! Layers follow the usual split: `domain` holds plain types, `application`
//! holds the derivation engine and admin commands, `cache` holds the two-tier
//! cache and its refresh scheduling, `infra` wires data sources, files,
//! telemetry and HTTP.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
mod util;
