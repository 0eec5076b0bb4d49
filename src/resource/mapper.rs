//! Field Mapper
//!
//! Turns raw provider JSON into the attribute shape of a typed resource.
//! A [`Mapping`] declares, per target field, the source path and an optional
//! transform. [`Mapper::bend`] applies a mapping and [`Mapper::decode`]
//! deserializes the result into the typed struct.
//!
//! Missing or null source values leave the field absent unless the field
//! declares a `default`.

use crate::api::lookup_path;
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Target field name -> field definition
pub type Mapping = BTreeMap<String, FieldDef>;

/// Pure value transforms applied after extraction
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    Identity,
    /// Empty strings, lists and objects become absent
    EmptyToNone,
    /// Epoch seconds or RFC 3339 text to an RFC 3339 timestamp
    Timestamp,
    /// List of key/value objects to an object
    ToDict {
        #[serde(default = "default_dict_key")]
        key: String,
        #[serde(default = "default_dict_value")]
        value: String,
    },
    /// Apply a named mapping to an object
    Bend(String),
    /// Apply a named mapping to every element of a list
    ForAll(String),
    /// Like `ForAll`, collected into an object keyed by one of the mapped fields
    ForAllKeyed { mapping: String, key: String },
}

fn default_dict_key() -> String {
    "Key".to_string()
}

fn default_dict_value() -> String {
    "Value".to_string()
}

/// How one target field is produced
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "FieldDefRepr")]
pub struct FieldDef {
    pub path: String,
    pub transform: Transform,
    pub default: Option<Value>,
}

/// A bare string is shorthand for `{"path": "..."}`
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldDefRepr {
    Path(String),
    Full {
        path: String,
        #[serde(default)]
        transform: Transform,
        #[serde(default)]
        default: Option<Value>,
    },
}

impl From<FieldDefRepr> for FieldDef {
    fn from(repr: FieldDefRepr) -> Self {
        match repr {
            FieldDefRepr::Path(path) => FieldDef {
                path,
                transform: Transform::Identity,
                default: None,
            },
            FieldDefRepr::Full {
                path,
                transform,
                default,
            } => FieldDef {
                path,
                transform,
                default,
            },
        }
    }
}

/// Applies named mappings
#[derive(Debug, Clone, Copy)]
pub struct Mapper<'a> {
    mappings: &'a HashMap<String, Mapping>,
}

impl<'a> Mapper<'a> {
    pub fn new(mappings: &'a HashMap<String, Mapping>) -> Self {
        Self { mappings }
    }

    fn mapping(&self, name: &str) -> Result<&'a Mapping> {
        self.mappings
            .get(name)
            .with_context(|| format!("Unknown mapping: {}", name))
    }

    /// Apply the named mapping to `source`
    pub fn bend(&self, name: &str, source: &Value) -> Result<Value> {
        let mapping = self.mapping(name)?;
        let mut out = Map::new();

        for (field, def) in mapping {
            let raw = lookup_path(source, &def.path)
                .filter(|v| !v.is_null())
                .cloned()
                .or_else(|| def.default.clone());
            let Some(raw) = raw else {
                continue;
            };

            let value = self
                .apply(&def.transform, raw)
                .with_context(|| format!("Failed to map field {}.{}", name, field))?;
            if let Some(value) = value {
                out.insert(field.clone(), value);
            }
        }

        Ok(Value::Object(out))
    }

    /// Apply the named mapping and deserialize into `T`
    pub fn decode<T: DeserializeOwned>(&self, name: &str, source: &Value) -> Result<T> {
        let bent = self.bend(name, source)?;
        serde_json::from_value(bent).with_context(|| format!("Failed to decode {}", name))
    }

    fn apply(&self, transform: &Transform, value: Value) -> Result<Option<Value>> {
        match transform {
            Transform::Identity => Ok(Some(value)),
            Transform::EmptyToNone => Ok(empty_to_none(value)),
            Transform::Timestamp => Ok(to_timestamp(&value).map(|ts| Value::String(ts.to_rfc3339()))),
            Transform::ToDict { key, value: val } => Ok(Some(to_dict(&value, key, val))),
            Transform::Bend(name) => {
                if value.is_object() {
                    Ok(Some(self.bend(name, &value)?))
                } else {
                    Ok(None)
                }
            }
            Transform::ForAll(name) => {
                let items = as_items(value)
                    .iter()
                    .map(|item| self.bend(name, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Value::Array(items)))
            }
            Transform::ForAllKeyed { mapping, key } => {
                let mut keyed = Map::new();
                for item in as_items(value) {
                    let bent = self.bend(mapping, &item)?;
                    if let Some(k) = bent.get(key).and_then(|v| v.as_str()) {
                        keyed.insert(k.to_string(), bent.clone());
                    }
                }
                Ok(Some(Value::Object(keyed)))
            }
        }
    }
}

fn as_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => vec![],
        other => vec![other],
    }
}

/// Empty strings, lists and objects become absent
pub fn empty_to_none(value: Value) -> Option<Value> {
    match &value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        _ => Some(value),
    }
}

/// Parse epoch seconds (integer or fractional) or RFC 3339 text
pub fn to_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let secs = n.as_f64()?;
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9).round() as u32;
            Utc.timestamp_opt(whole as i64, nanos.min(999_999_999)).single()
        }
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                tracing::debug!("Ignoring unparsable timestamp {:?}: {}", s, e);
                None
            }
        },
        _ => None,
    }
}

/// `[{"Key": "a", "Value": "b"}]` -> `{"a": "b"}`
pub fn to_dict(value: &Value, key: &str, val: &str) -> Value {
    let mut out = Map::new();
    if let Some(items) = value.as_array() {
        for item in items {
            if let Some(k) = item.get(key).and_then(|v| v.as_str()) {
                let v = item.get(val).cloned().unwrap_or(Value::Null);
                out.insert(k.to_string(), v);
            }
        }
    }
    Value::Object(out)
}
