//! Nexus repository-manager exporter.
//!
//! Source jobs poll the Nexus REST API and a local certificate directory,
//! fold what they read into gauges, and publish them into a shared
//! [`registry::MetricRegistry`] that is served at `/metrics`.

pub mod aggregate;
pub mod cli;
pub mod client;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod types;
pub mod walker;

pub use error::{ExporterError, Result};
