//! # Octowatt - Octopus Energy consumption and cost reports
//!
//! Fetches a customer's daily gas and electricity consumption from the
//! Octopus Energy API, prices it against the tariff in force on each day and
//! renders a short cost summary with a consumption chart.
//!
//! ## Architecture
//!
//! - `billing`: unit conversion, tariff matching, cost aggregation, report text
//! - `octopus`: GraphQL/REST client behind the `EnergyProvider` trait
//! - `fetch`: per-meter-point concurrent fetches with retry and caching
//! - `retry`: exponential backoff bounded by attempts and total time
//! - `cache`: time- and size-bounded response cache
//! - `store`: per-user credential repository
//! - `service`: request boundary (setup, energy reports)
//! - `chart`: SVG consumption chart
//! - `web`: HTTP API
//! - `config`, `logging`, `error`: ambient plumbing

pub mod billing;
pub mod cache;
pub mod chart;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod octopus;
pub mod retry;
pub mod service;
pub mod store;
pub mod types;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{OctowattError, Result};
pub use service::{EnergyReport, EnergyService};
