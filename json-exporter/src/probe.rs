//! The probe pipeline: fetch, decode, extract, publish.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProbeError;
use crate::fetch::TargetFetcher;
use crate::jsonpath::{self, LookupError};
use crate::mapping::coerce_to_f64;
use crate::registry::{FloatGauge, MetricSet};
use crate::request::{PathSpec, ProbeRequest};

/// Result of evaluating one path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    /// Resolved and parsed; the gauge holds this value.
    Resolved(f64),
    /// The path does not exist in the document.
    NotFound,
    /// The resolved value could not be parsed as a float.
    NotNumeric,
}

impl PathOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, PathOutcome::Resolved(_))
    }
}

/// Per-path record kept for logging and the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub expression: String,
    pub metric_name: String,
    pub outcome: PathOutcome,
}

/// Everything a finished probe produced.
#[derive(Debug)]
pub struct ProbeReport {
    /// Gauges to render back to the caller.
    pub metrics: MetricSet,
    /// One entry per requested path, in request order. Empty when the fetch
    /// failed.
    pub results: Vec<PathResult>,
    /// Set when the target could not be fetched at all.
    pub fetch_error: Option<ProbeError>,
    /// Wall time from the start of the fetch to the end of extraction.
    pub duration: Duration,
}

impl ProbeReport {
    /// True when the fetch succeeded and every path resolved to a number.
    pub fn success(&self) -> bool {
        self.fetch_error.is_none() && self.results.iter().all(|r| r.outcome.is_resolved())
    }
}

/// Decode a response body as arbitrary JSON.
///
/// Malformed input is not an error: it yields `None`, against which every
/// path is reported as not found.
pub fn decode_document(body: &[u8]) -> Option<Value> {
    match serde_json::from_slice(body) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "Response body is not valid JSON");
            None
        }
    }
}

/// Evaluate `expression` against `document` and coerce the result.
pub fn evaluate_path(document: Option<&Value>, expression: &str) -> PathOutcome {
    let Some(document) = document else {
        return PathOutcome::NotFound;
    };

    match jsonpath::lookup(document, expression) {
        Ok(value) => match coerce_to_f64(value) {
            Some(number) => PathOutcome::Resolved(number),
            None => PathOutcome::NotNumeric,
        },
        Err(LookupError::Syntax(e)) => {
            debug!(path = %expression, error = %e, "Invalid jsonpath");
            PathOutcome::NotFound
        }
        Err(LookupError::NotFound { .. }) => PathOutcome::NotFound,
    }
}

/// Evaluate every path, setting each gauge that resolves.
///
/// Paths are independent: a failure is recorded and the next path is still
/// evaluated.
pub fn extract(document: Option<&Value>, paths: &[(PathSpec, FloatGauge)]) -> Vec<PathResult> {
    paths
        .iter()
        .map(|(spec, gauge)| {
            let outcome = evaluate_path(document, &spec.expression);
            match &outcome {
                PathOutcome::Resolved(value) => {
                    gauge.set(*value);
                }
                PathOutcome::NotFound => {
                    debug!(path = %spec.expression, "Jsonpath not found");
                }
                PathOutcome::NotNumeric => {
                    debug!(path = %spec.expression, "Value could not be parsed to Float64");
                }
            }
            PathResult {
                expression: spec.expression.clone(),
                metric_name: spec.metric_name.clone(),
                outcome,
            }
        })
        .collect()
}

/// Runs probes. Holds no per-probe state, so one instance serves all
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct Prober {
    fetcher: TargetFetcher,
}

impl Prober {
    pub fn new(fetcher: TargetFetcher) -> Self {
        Self { fetcher }
    }

    /// Probe `request.target` and publish its values into a fresh
    /// [`MetricSet`].
    ///
    /// Only a body read failure is returned as an error. A failed fetch still
    /// produces a report, with `probe_success` at 0.
    pub async fn probe(&self, request: &ProbeRequest) -> Result<ProbeReport, ProbeError> {
        let mut metrics = MetricSet::new();
        let mut paths = Vec::with_capacity(request.paths.len());
        for spec in &request.paths {
            let gauge = metrics.register_path_gauge(&spec.metric_name)?;
            paths.push((spec.clone(), gauge));
        }

        let start = Instant::now();
        let body = match self.fetcher.fetch(&request.target).await {
            Ok(body) => body,
            Err(e @ ProbeError::FetchFailure(_)) => {
                warn!(target_url = %request.target, error = %e, "Probe fetch failed");
                let duration = start.elapsed();
                metrics.set_success(false);
                metrics.set_duration(duration);
                return Ok(ProbeReport {
                    metrics,
                    results: Vec::new(),
                    fetch_error: Some(e),
                    duration,
                });
            }
            Err(e) => return Err(e),
        };

        let document = decode_document(&body);
        let results = extract(document.as_ref(), &paths);
        let duration = start.elapsed();

        let report = ProbeReport {
            metrics,
            results,
            fetch_error: None,
            duration,
        };
        report.metrics.set_success(report.success());
        report.metrics.set_duration(duration);

        debug!(
            target_url = %request.target,
            paths = report.results.len(),
            success = report.success(),
            duration_secs = duration.as_secs_f64(),
            "Probe finished"
        );

        Ok(report)
    }
}
