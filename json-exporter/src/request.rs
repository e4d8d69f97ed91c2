//! Validation of `/probe` query parameters.

use std::collections::HashSet;

use crate::error::ProbeError;
use crate::mapping::{is_valid_metric_name, metric_name_for_path};
use crate::registry::RESERVED_METRIC_NAMES;

/// Query parameter naming the URL to fetch.
pub const TARGET_PARAM: &str = "target";

/// Query parameter holding a path expression; may be repeated.
pub const PATH_PARAM: &str = "jsonpath";

/// A requested extraction and the gauge it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    /// The raw path expression, as supplied.
    pub expression: String,
    /// Gauge name, the final segment of the expression.
    pub metric_name: String,
}

impl PathSpec {
    /// Derive a path spec from an expression, validating its gauge name.
    pub fn new(expression: impl Into<String>) -> Result<Self, ProbeError> {
        let expression = expression.into();
        let metric_name = metric_name_for_path(&expression).to_string();

        if !is_valid_metric_name(&metric_name) {
            return Err(ProbeError::InvalidMetricName {
                path: expression,
                name: metric_name,
            });
        }

        Ok(Self {
            expression,
            metric_name,
        })
    }
}

/// A validated probe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// URL to fetch the JSON document from.
    pub target: String,
    /// Extractions in the order they were supplied.
    pub paths: Vec<PathSpec>,
}

impl ProbeRequest {
    /// Build a request from decoded query parameters.
    ///
    /// The first `target` wins. Every `jsonpath` occurrence is kept in order,
    /// and gauge names must be valid and unique within the request.
    pub fn from_query(params: &[(String, String)]) -> Result<Self, ProbeError> {
        let target = params
            .iter()
            .find(|(k, _)| k == TARGET_PARAM)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default();
        if target.is_empty() {
            return Err(ProbeError::MissingTarget);
        }

        let expressions: Vec<&str> = params
            .iter()
            .filter(|(k, _)| k == PATH_PARAM)
            .map(|(_, v)| v.as_str())
            .collect();
        if expressions.is_empty() {
            return Err(ProbeError::MissingPath);
        }

        Self::new(target, expressions)
    }

    /// Build a request from a target and path expressions.
    pub fn new<I, S>(target: impl Into<String>, expressions: I) -> Result<Self, ProbeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target = target.into();
        if target.is_empty() {
            return Err(ProbeError::MissingTarget);
        }

        let mut seen: HashSet<String> = RESERVED_METRIC_NAMES
            .iter()
            .map(|name| name.to_string())
            .collect();
        let mut paths = Vec::new();

        for expression in expressions {
            let spec = PathSpec::new(expression)?;
            if !seen.insert(spec.metric_name.clone()) {
                return Err(ProbeError::DuplicateMetricName(spec.metric_name));
            }
            paths.push(spec);
        }

        if paths.is_empty() {
            return Err(ProbeError::MissingPath);
        }

        Ok(Self { target, paths })
    }
}
