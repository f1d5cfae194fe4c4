//! Per-request view of everything the heuristics look at.

use serde_json::map::Entry;
use serde_json::{Map, Value};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const VIA: &str = "via";

/// Read-only snapshot of one inbound request.
///
/// Built once per request by the HTTP layer and dropped with the response.
#[derive(Debug, Clone, Default)]
pub struct RequestSnapshot {
    pub method: String,
    /// Always starts with `/`.
    pub path: String,
    /// Header name/value pairs in arrival order, one entry per name.
    pub headers: Vec<(String, String)>,
    pub query_parameters: Map<String, Value>,
    pub form_fields: Map<String, Value>,
    pub json_body: Option<Value>,
    /// Address of the immediate peer, which may itself be a proxy.
    pub connecting_address: String,
}

impl RequestSnapshot {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// `X-Forwarded-For`, treating a blank value as absent.
    pub fn forwarded_for(&self) -> Option<&str> {
        self.header(X_FORWARDED_FOR)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn via(&self) -> Option<&str> {
        self.header(VIA)
    }
}

/// Prefix `path` with `/` unless it already has one.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Fold `key=value` pairs into a JSON object. A key seen once maps to a
/// string; a repeated key maps to an array of its values in order.
pub fn collect_pairs<I, K, V>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut map = Map::new();
    for (key, value) in pairs {
        let key: String = key.into();
        let value = Value::String(value.into());
        match map.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(values) => values.push(value),
                existing => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            },
        }
    }
    map
}
