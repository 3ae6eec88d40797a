//! Deterministic cache key generation
//!
//! Wrapped calls are keyed by the operation name plus a canonical JSON form of
//! their arguments: positional arguments keep their order, keyword arguments are
//! sorted by name. The canonical string is digested with SHA-256 and truncated
//! to 128 bits, hex encoded.

use crate::cache::types::CacheKey;
use crate::error::Result;
use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Digest length in bytes (128 bits)
const DIGEST_BYTES: usize = 16;

/// Hash an arbitrary canonical string into a fixed-length key
pub fn digest(input: &str) -> CacheKey {
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..DIGEST_BYTES])
}

/// Arguments of a cacheable call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-serialized values
    pub fn from_values(positional: Vec<Value>, keyword: Map<String, Value>) -> Self {
        Self {
            positional,
            keyword,
        }
    }

    /// Append a positional argument
    pub fn arg<T: Serialize>(mut self, value: T) -> Result<Self> {
        self.positional.push(serde_json::to_value(value)?);
        Ok(self)
    }

    /// Set a keyword argument; a repeated name replaces the earlier value
    pub fn kwarg<T: Serialize>(mut self, name: impl Into<String>, value: T) -> Result<Self> {
        self.keyword.insert(name.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }

    /// Canonical string form: `{"args":[...],"func":name,"kwargs":{...}}`
    /// with every object's keys in sorted order.
    pub fn canonical(&self, func: &str) -> String {
        sort_keys(json!({
            "func": func,
            "args": self.positional,
            "kwargs": self.keyword,
        }))
        .to_string()
    }

    /// Cache key for calling `func` with these arguments
    pub fn cache_key(&self, func: &str) -> CacheKey {
        digest(&self.canonical(func))
    }
}

/// Recursively rebuild objects so their keys serialize in sorted order,
/// regardless of whether serde_json preserves insertion order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Key for a chat/LLM response
///
/// The query is trimmed and lower-cased so trivially different phrasings share
/// an entry. The optional context (model, tools, ...) is part of the key.
pub fn response_key(query: &str, context: Option<&Value>) -> CacheKey {
    let normalized = query.trim().to_lowercase();
    let context = context
        .map(|ctx| sort_keys(ctx.clone()).to_string())
        .unwrap_or_default();

    digest(&format!("{}|{}", normalized, context))
}
