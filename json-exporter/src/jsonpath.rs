//! Dotted path expressions evaluated against decoded JSON documents.
//!
//! Supported syntax:
//!
//! ```text
//! a.b.c          member access
//! $.a.b          optional `$` root marker
//! items[0].name  bracketed array index
//! items.0.name   digit-only step, an index when applied to an array
//! matrix[1][2]   chained indexes
//! $              the whole document
//! ```
//!
//! A `/probe` request names its gauge after the last `.` segment of the
//! path, and that name must be a valid metric name. A bare `$` and a path
//! whose last segment ends in `[n]` (such as `items[0]`) are therefore
//! rejected there with 400. Both forms still work mid-path, as in
//! `$.items[0].depth`.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

/// Syntax errors in a path expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathSyntaxError {
    #[error("empty step at position {0}")]
    EmptyStep(usize),
    #[error("unclosed bracket in step '{0}'")]
    UnclosedBracket(String),
    #[error("invalid array index '{0}'")]
    InvalidIndex(String),
    #[error("unexpected character '{0}' in step '{1}'")]
    UnexpectedChar(char, String),
}

/// Why a path could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("invalid path: {0}")]
    Syntax(#[from] PathSyntaxError),
    #[error("no value at step '{step}'")]
    NotFound { step: String },
}

/// A single traversal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Object member; digit-only names double as array indexes.
    Member(String),
    /// Bracketed array index.
    Index(usize),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Member(name) => write!(f, "{}", name),
            Step::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    steps: Vec<Step>,
}

impl JsonPath {
    /// The traversal steps, root first.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Resolve this path against `root`.
    pub fn lookup<'a>(&self, root: &'a Value) -> Result<&'a Value, LookupError> {
        let mut current = root;
        for step in &self.steps {
            current = Node::from(current)
                .child(step)
                .ok_or_else(|| LookupError::NotFound {
                    step: step.to_string(),
                })?;
        }
        Ok(current)
    }
}

impl FromStr for JsonPath {
    type Err = PathSyntaxError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let rest = match expr.strip_prefix('$') {
            Some("") => return Ok(Self { steps: Vec::new() }),
            Some(rest) if rest.starts_with('[') => rest,
            Some(rest) => rest
                .strip_prefix('.')
                .ok_or_else(|| PathSyntaxError::UnexpectedChar('$', expr.to_string()))?,
            None => expr,
        };

        let mut steps = Vec::new();
        for (position, segment) in rest.split('.').enumerate() {
            parse_segment(segment, position, &mut steps)?;
        }
        Ok(Self { steps })
    }
}

/// Parse one dot-separated segment such as `items[0][1]` into steps.
fn parse_segment(
    segment: &str,
    position: usize,
    steps: &mut Vec<Step>,
) -> Result<(), PathSyntaxError> {
    let (name, mut brackets) = match segment.find('[') {
        Some(idx) => segment.split_at(idx),
        None => (segment, ""),
    };

    if name.is_empty() && brackets.is_empty() {
        return Err(PathSyntaxError::EmptyStep(position));
    }
    if let Some(c) = name.chars().find(|c| *c == ']') {
        return Err(PathSyntaxError::UnexpectedChar(c, segment.to_string()));
    }
    if !name.is_empty() {
        steps.push(Step::Member(name.to_string()));
    }

    while !brackets.is_empty() {
        let inner = brackets
            .strip_prefix('[')
            .ok_or_else(|| {
                // Only reachable when text trails a closing bracket, e.g. `a[0]b`.
                let c = brackets.chars().next().unwrap_or(']');
                PathSyntaxError::UnexpectedChar(c, segment.to_string())
            })?;
        let close = inner
            .find(']')
            .ok_or_else(|| PathSyntaxError::UnclosedBracket(segment.to_string()))?;
        let digits = &inner[..close];
        let index = digits
            .parse::<usize>()
            .map_err(|_| PathSyntaxError::InvalidIndex(digits.to_string()))?;
        steps.push(Step::Index(index));
        brackets = &inner[close + 1..];
    }

    Ok(())
}

/// JSON node kinds, each with its own lookup rule.
#[derive(Debug, Clone, Copy)]
enum Node<'a> {
    Object(&'a Map<String, Value>),
    Array(&'a [Value]),
    Scalar,
    Null,
}

impl<'a> From<&'a Value> for Node<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Node::Object(map),
            Value::Array(items) => Node::Array(items),
            Value::Null => Node::Null,
            _ => Node::Scalar,
        }
    }
}

impl<'a> Node<'a> {
    fn child(self, step: &Step) -> Option<&'a Value> {
        match (self, step) {
            (Node::Object(map), Step::Member(name)) => map.get(name),
            (Node::Array(items), Step::Index(i)) => items.get(*i),
            (Node::Array(items), Step::Member(name)) => {
                let i = name.parse::<usize>().ok()?;
                items.get(i)
            }
            (Node::Object(_), Step::Index(_)) | (Node::Scalar, _) | (Node::Null, _) => None,
        }
    }
}

/// Parse `expr` and resolve it against `root` in one go.
pub fn lookup<'a>(root: &'a Value, expr: &str) -> Result<&'a Value, LookupError> {
    let path: JsonPath = expr.parse()?;
    path.lookup(root)
}
