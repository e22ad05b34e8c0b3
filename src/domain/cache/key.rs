//! Cache key templates and request-derived key resolution
//!
//! A template such as `teams:$params.id` or `reports:$args[0]:$query.range`
//! is parsed once at registration time. Each request then resolves it into a
//! concrete key plus the invalidation group (the text before the first `:`).

use std::collections::BTreeMap;
use std::fmt;

use axum::http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::DomainError;

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:args\[(\d+)\]|params\.([A-Za-z_][A-Za-z0-9_]*)|query\.([A-Za-z_][A-Za-z0-9_]*))")
        .expect("placeholder pattern is valid")
});

const PLACEHOLDER_PREFIXES: [&str; 3] = ["$args", "$params", "$query"];

/// Separator between the group and the rest of a key
pub const GROUP_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Arg(usize),
    Param(String),
    Query(String),
}

/// Parsed, immutable cache key template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl KeyTemplate {
    /// Parses a template, rejecting empty templates, an empty group and
    /// placeholders that do not follow the `$args[i]` / `$params.NAME` /
    /// `$query.NAME` forms
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();

        if raw.trim().is_empty() {
            return Err(DomainError::key_template("Template cannot be empty"));
        }

        if raw.starts_with(GROUP_SEPARATOR) {
            return Err(DomainError::key_template(format!(
                "Template '{}' has an empty group",
                raw
            )));
        }

        let mut segments = Vec::new();
        let mut cursor = 0;

        for captures in PLACEHOLDER_PATTERN.captures_iter(&raw) {
            let Some(whole) = captures.get(0) else {
                continue;
            };

            if whole.start() > cursor {
                segments.push(Segment::Literal(raw[cursor..whole.start()].to_string()));
            }

            let segment = if let Some(index) = captures.get(1) {
                let index = index.as_str().parse::<usize>().map_err(|_| {
                    DomainError::key_template(format!(
                        "Argument index '{}' in template '{}' is out of range",
                        index.as_str(),
                        raw
                    ))
                })?;
                Segment::Arg(index)
            } else if let Some(name) = captures.get(2) {
                Segment::Param(name.as_str().to_string())
            } else if let Some(name) = captures.get(3) {
                Segment::Query(name.as_str().to_string())
            } else {
                unreachable!("placeholder pattern has exactly three alternatives");
            };

            segments.push(segment);
            cursor = whole.end();
        }

        if cursor < raw.len() {
            segments.push(Segment::Literal(raw[cursor..].to_string()));
        }

        for segment in &segments {
            if let Segment::Literal(text) = segment {
                if let Some(prefix) = PLACEHOLDER_PREFIXES.iter().find(|p| text.contains(*p)) {
                    return Err(DomainError::key_template(format!(
                        "Malformed '{}' placeholder in template '{}'",
                        prefix, raw
                    )));
                }
            }
        }

        Ok(Self { raw, segments })
    }

    /// Returns the template text as registered
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the template references any request-derived value
    pub fn has_placeholders(&self) -> bool {
        self.segments
            .iter()
            .any(|s| !matches!(s, Segment::Literal(_)))
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for KeyTemplate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Read-only view of the request a key is resolved against
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub params: BTreeMap<String, Value>,
    pub query_raw: String,
    pub query: BTreeMap<String, Value>,
    pub args: Vec<Value>,
}

impl RequestContext {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            params: BTreeMap::new(),
            query_raw: String::new(),
            query: BTreeMap::new(),
            args: Vec::new(),
        }
    }

    /// Adds a path parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets the raw query string and its parsed mapping.
    ///
    /// Repeated names collect into an array in order of appearance.
    pub fn with_query(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let raw = raw.trim_start_matches('?').to_string();
        let mut parsed: BTreeMap<String, Value> = BTreeMap::new();

        for (name, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let value = Value::String(value.into_owned());

            match parsed.get_mut(name.as_ref()) {
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    parsed.insert(name.into_owned(), value);
                }
            }
        }

        self.query_raw = raw;
        self.query = parsed;
        self
    }

    /// Appends a positional call argument
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Reads are served from the cache
    pub fn is_read(&self) -> bool {
        self.method == Method::GET
    }

    /// Writes invalidate the group before the handler runs
    pub fn is_write(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }
}

/// Concrete key for one request plus the group it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedKey {
    pub key: String,
    pub group: String,
}

impl ResolvedKey {
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Resolves templates against request contexts
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyResolver;

impl KeyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Substitutes every placeholder and, for reads, appends the raw query
    /// string. Returns `None` when the resolved key has no usable group.
    pub fn resolve(&self, template: &KeyTemplate, ctx: &RequestContext) -> Option<ResolvedKey> {
        let mut key = String::with_capacity(template.raw.len() + ctx.query_raw.len() + 1);

        for segment in &template.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Arg(index) => push_value(&mut key, ctx.args.get(*index)),
                Segment::Param(name) => push_value(&mut key, ctx.params.get(name)),
                Segment::Query(name) => push_value(&mut key, ctx.query.get(name)),
            }
        }

        if ctx.is_read() && !ctx.query_raw.is_empty() {
            key.push(GROUP_SEPARATOR);
            key.push_str(&ctx.query_raw);
        }

        let group = group_of(&key);

        if group.is_empty() {
            debug!(template = %template, key = %key, "Resolved key has an empty group, skipping cache");
            return None;
        }

        let group = group.to_string();
        Some(ResolvedKey { key, group })
    }
}

/// Text before the first separator, or the whole key when there is none
pub fn group_of(key: &str) -> &str {
    key.split(GROUP_SEPARATOR).next().unwrap_or_default()
}

fn push_value(key: &mut String, value: Option<&Value>) {
    if let Some(value) = value {
        key.push_str(&canonical_text(value));
    }
}

/// Textual form used inside keys: strings verbatim, other scalars
/// stringified, objects and arrays as JSON with object keys sorted
pub fn canonical_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => sorted(value).to_string(),
    }
}

/// JSON text with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> String {
    sorted(value).to_string()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            let mut out = Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k.clone(), sorted(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
