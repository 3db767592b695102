//! Parameter values for step `with` bags.
//!
//! Step parameters are declarative YAML scalars, lists, or mappings. They are
//! kept as a small tagged union rather than raw `serde_yaml::Value` so
//! template rendering has a closed set of shapes to stringify.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single `with` parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Render this value as substitution text. Scalars render bare; lists and
    /// mappings render as compact JSON.
    pub fn as_text(&self) -> String {
        match self {
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Integer(n) => n.to_string(),
            ParamValue::Float(x) => x.to_string(),
            ParamValue::String(s) => s.clone(),
            ParamValue::List(_) | ParamValue::Map(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}
