// Request-scoped key/value context and the field extractor
// The logger only reads from a context; middleware populates it

use crate::value::LogValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Name of a key expected in a request context, e.g. `X-Request-Id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ContextField(String);

impl ContextField {
    pub fn new(name: impl Into<String>) -> Self {
        ContextField(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key used for this field in a written record.
    pub fn record_key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl From<&str> for ContextField {
    fn from(name: &str) -> Self {
        ContextField::new(name)
    }
}

impl From<String> for ContextField {
    fn from(name: String) -> Self {
        ContextField(name)
    }
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability a request context must offer to be used with the logger.
pub trait ContextStore {
    fn get(&self, key: &str) -> Option<LogValue>;

    fn set(&mut self, key: &str, value: LogValue);
}

/// Plain map-backed context created per request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    values: HashMap<String, LogValue>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<LogValue>) -> Self {
        self.set(key, value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ContextStore for RequestContext {
    fn get(&self, key: &str) -> Option<LogValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: LogValue) {
        self.values.insert(key.to_owned(), value);
    }
}

/// Collect the configured fields present in `ctx`, keyed by lower-cased name.
///
/// Fields missing from the context are skipped. When two names collapse to
/// the same key after lower-casing, the later one wins.
pub fn extract_fields(
    ctx: &dyn ContextStore,
    names: &[ContextField],
) -> BTreeMap<String, LogValue> {
    let mut fields = BTreeMap::new();
    for name in names {
        if let Some(value) = ctx.get(name.as_str()) {
            fields.insert(name.record_key(), value);
        }
    }
    fields
}
