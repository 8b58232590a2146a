//! CLI command implementations.

pub mod config;
pub mod data;
pub mod lock;

use rediguard_core::Value;
use serde_json::{Map, Number, Value as Json};

/// Error type shared by the command implementations.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Renders a stored value as JSON for display.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(n) => Json::Number((*n).into()),
        Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(String::from_utf8_lossy(b).into_owned()),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(pairs) => {
            let mut map = Map::new();
            for (k, v) in pairs {
                let key = match k {
                    Value::Text(s) => s.clone(),
                    other => value_to_json(other).to_string(),
                };
                map.insert(key, value_to_json(v));
            }
            Json::Object(map)
        }
    }
}

/// Converts JSON input from the command line into a storable value.
pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Integer)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(json_to_value).collect()),
        Json::Object(map) => Value::map(map.iter().map(|(k, v)| (k.clone(), json_to_value(v)))),
    }
}

/// Human-readable form of a value: text as-is, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        other => value_to_json(other).to_string(),
    }
}
