//! Metric registries.
//!
//! [`MetricSet`] is created per probe and dropped once rendered, so
//! concurrent probes never share gauges. [`ExporterMetrics`] is the single
//! process-wide registry behind `/metrics`.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue, LabelValueEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

use crate::error::ProbeError;

/// Aggregate success gauge name.
pub const PROBE_SUCCESS: &str = "probe_success";

/// Probe wall time gauge name.
pub const PROBE_DURATION_SECONDS: &str = "probe_duration_seconds";

/// Names every [`MetricSet`] registers up front.
pub const RESERVED_METRIC_NAMES: [&str; 2] = [PROBE_SUCCESS, PROBE_DURATION_SECONDS];

/// Content type of the rendered registries.
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// A gauge holding an `f64`.
pub type FloatGauge = Gauge<f64, AtomicU64>;

/// Gauges produced by a single probe.
#[derive(Debug)]
pub struct MetricSet {
    registry: Registry,
    names: HashSet<String>,
    success: FloatGauge,
    duration: FloatGauge,
}

impl MetricSet {
    /// Create a set holding `probe_success` and `probe_duration_seconds`.
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let success = FloatGauge::default();
        let duration = FloatGauge::default();

        registry.register(
            PROBE_SUCCESS,
            "Displays whether or not the probe was a success",
            success.clone(),
        );
        registry.register(
            PROBE_DURATION_SECONDS,
            "Returns how long the probe took to complete in seconds",
            duration.clone(),
        );

        Self {
            registry,
            names: RESERVED_METRIC_NAMES.iter().map(|n| n.to_string()).collect(),
            success,
            duration,
        }
    }

    /// Register a gauge for an extracted value.
    ///
    /// The gauge starts at zero. A name already present in this set is an
    /// error rather than a second series.
    pub fn register_path_gauge(&mut self, name: &str) -> Result<FloatGauge, ProbeError> {
        if !self.names.insert(name.to_string()) {
            return Err(ProbeError::DuplicateMetricName(name.to_string()));
        }

        let gauge = FloatGauge::default();
        self.registry
            .register(name, format!("Retrieved value for {}", name), gauge.clone());
        Ok(gauge)
    }

    /// Set `probe_success` to 1 or 0.
    pub fn set_success(&self, success: bool) {
        self.success.set(if success { 1.0 } else { 0.0 });
    }

    /// Set `probe_duration_seconds`.
    pub fn set_duration(&self, elapsed: Duration) {
        self.duration.set(elapsed.as_secs_f64());
    }

    /// Render all gauges in the OpenMetrics text format.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        encode(&mut output, &self.registry)?;
        Ok(output)
    }
}

impl Default for MetricSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Final state of a probe, as counted by [`ExporterMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeOutcome {
    Success,
    PathFailure,
    FetchFailure,
    BodyReadFailure,
    InvalidRequest,
}

impl ProbeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeOutcome::Success => "success",
            ProbeOutcome::PathFailure => "path_failure",
            ProbeOutcome::FetchFailure => "fetch_failure",
            ProbeOutcome::BodyReadFailure => "body_read_failure",
            ProbeOutcome::InvalidRequest => "invalid_request",
        }
    }
}

impl EncodeLabelValue for ProbeOutcome {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), std::fmt::Error> {
        encoder.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
struct ProbeLabels {
    outcome: ProbeOutcome,
}

/// Process-wide exporter self-observability.
#[derive(Debug)]
pub struct ExporterMetrics {
    registry: Registry,
    probes: Family<ProbeLabels, Counter>,
    in_flight: Gauge,
    duration: Histogram,
}

impl ExporterMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("json_exporter");
        let probes = Family::<ProbeLabels, Counter>::default();
        let in_flight = Gauge::default();
        let duration = Histogram::new(exponential_buckets(0.005, 2.0, 12));

        registry.register("probes", "Probes handled, by outcome", probes.clone());
        registry.register(
            "probes_in_flight",
            "Probes currently in progress",
            in_flight.clone(),
        );
        registry.register(
            "probe_duration_seconds",
            "Wall time spent fetching and extracting",
            duration.clone(),
        );

        Self {
            registry,
            probes,
            in_flight,
            duration,
        }
    }

    /// Mark a probe as started; it stops counting as in flight when the
    /// guard drops.
    pub fn start_probe(&self) -> InFlightGuard {
        self.in_flight.inc();
        InFlightGuard {
            gauge: self.in_flight.clone(),
        }
    }

    /// Count a finished probe.
    pub fn record(&self, outcome: ProbeOutcome, elapsed: Option<Duration>) {
        self.probes.get_or_create(&ProbeLabels { outcome }).inc();
        if let Some(elapsed) = elapsed {
            self.duration.observe(elapsed.as_secs_f64());
        }
    }

    /// Number of probes recorded with `outcome`.
    pub fn probe_count(&self, outcome: ProbeOutcome) -> u64 {
        self.probes.get_or_create(&ProbeLabels { outcome }).get()
    }

    /// Probes currently running.
    pub fn in_flight(&self) -> i64 {
        self.in_flight.get()
    }

    /// Render in the OpenMetrics text format.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        encode(&mut output, &self.registry)?;
        Ok(output)
    }
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight gauge on drop, including when a client
/// disconnects mid-probe.
#[derive(Debug)]
pub struct InFlightGuard {
    gauge: Gauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}
