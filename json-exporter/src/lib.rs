//! Prometheus probe exporter for JSON documents.
//!
//! On each `/probe` request the exporter fetches a JSON document from the
//! requested target, evaluates one or more dotted path expressions against it
//! and returns the extracted values as gauges in the OpenMetrics text format.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   /probe     │────>│   Request    │────>│   Fetcher    │────>│  Extractor   │
//! │  (http.rs)   │     │  validation  │     │  (reqwest)   │     │  (jsonpath)  │
//! └──────────────┘     └──────────────┘     └──────────────┘     └──────┬───────┘
//!        ^                                                              │
//!        └─────────────── per-request MetricSet (registry.rs) <─────────┘
//! ```
//!
//! Every probe builds its own [`registry::MetricSet`]; nothing is shared
//! between concurrent probes except the exporter's own counters.
//!
//! # Usage
//!
//! ```bash
//! json-exporter --listen-address :9116
//! curl 'http://localhost:9116/probe?target=http://host/status.json&jsonpath=$.stats.uptime'
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod jsonpath;
pub mod mapping;
pub mod probe;
pub mod registry;
pub mod request;

pub use config::ExporterConfig;
pub use error::ProbeError;
pub use fetch::TargetFetcher;
pub use http::{AppState, HttpServer, create_router};
pub use probe::{PathOutcome, PathResult, ProbeReport, Prober};
pub use registry::{ExporterMetrics, MetricSet};
pub use request::{PathSpec, ProbeRequest};
