use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RequirementsError;

/// Attribute name -> expected value. Every entry must be matched exactly by a
/// resource; attributes not listed here are not filtered on.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Requirements(Map<String, Value>);

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses caller-supplied requirements.
    ///
    /// Accepts either a JSON object (`{"zone": "eu"}`) or the flat form
    /// `key=value&key=value`. In the flat form `true`/`false` (any case) become
    /// booleans and every other value stays a string; parts without `=` are
    /// ignored. Blank input yields empty requirements; JSON that is not an
    /// object is rejected.
    pub fn parse(text: &str) -> Result<Self, RequirementsError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::new());
        }

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => return Self::from_map(map),
            Ok(other) => {
                return Err(RequirementsError::Invalid(format!(
                    "expected a JSON object or key=value pairs, got {}",
                    other
                )));
            }
            Err(_) => {}
        }

        let mut map = Map::new();
        for part in text.split('&') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            map.insert(key.to_string(), parse_flat_value(value.trim()));
        }
        Ok(Self(map))
    }

    /// Wraps an already structured mapping. Only scalar values are accepted.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, RequirementsError> {
        for (key, value) in &map {
            check_scalar(key, value)?;
        }
        Ok(Self(map))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), RequirementsError> {
        let key = key.into();
        let value = value.into();
        check_scalar(&key, &value)?;
        self.0.insert(key, value);
        Ok(())
    }

    /// Returns the predicate used for matching: `hostname` and `online: true`
    /// defaults, overridden by any entry the caller supplied.
    pub fn with_host_defaults(&self, hostname: &str) -> Requirements {
        let mut merged = Map::new();
        merged.insert("hostname".to_string(), Value::String(hostname.to_string()));
        merged.insert("online".to_string(), Value::Bool(true));
        for (key, value) in &self.0 {
            merged.insert(key.clone(), value.clone());
        }
        Self(merged)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Requirements {
    type Err = RequirementsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Requirements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

fn parse_flat_value(token: &str) -> Value {
    if token.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if token.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else {
        Value::String(token.to_string())
    }
}

fn check_scalar(key: &str, value: &Value) -> Result<(), RequirementsError> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(RequirementsError::Invalid(format!(
            "value for '{}' must be a string, number, boolean or null",
            key
        ))),
        _ => Ok(()),
    }
}
