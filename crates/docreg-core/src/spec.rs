//! Document metadata: description, expiry and update policy.
//!
//! The binary form is a canonical CBOR map
//!
//! ```text
//! { 0: description | null, 1: expire_at, 2: option_updatable }
//! ```
//!
//! A CBOR item carries its own length, so records can be packed back to
//! back and read with [`DocumentSpec::from_serialized_data`].

use std::collections::BTreeMap;

use ciborium::value::Value;

use crate::canonical::{encode_canonical, map_get_int};
use crate::error::ValidationError;

/// CBOR map keys of the binary record.
mod keys {
    pub const DESCRIPTION: u64 = 0;
    pub const EXPIRE_AT: u64 = 1;
    pub const OPTION_UPDATABLE: u64 = 2;
}

/// Field names accepted by [`DocumentSpec::from_record`].
pub mod fields {
    pub const DESCRIPTION: &str = "description";
    pub const EXPIRE_AT: &str = "expire_at";
    pub const OPTION_UPDATABLE: &str = "option_updatable";
}

/// A value inside a structured description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DescriptionValue {
    Text(String),
    Bytes(Vec<u8>),
}

/// Free-form document description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    Text(String),
    Bytes(Vec<u8>),
    /// One level of named text/bytes values. Ordered, so insertion order
    /// never affects equality or encoding.
    Record(BTreeMap<String, DescriptionValue>),
}

impl From<&str> for Description {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Description {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for Description {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<BTreeMap<String, DescriptionValue>> for Description {
    fn from(record: BTreeMap<String, DescriptionValue>) -> Self {
        Self::Record(record)
    }
}

impl From<&str> for DescriptionValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<u8>> for DescriptionValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

/// Validated, immutable document metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSpec {
    description: Option<Description>,
    expire_at: u64,
    option_updatable: bool,
}

impl Default for DocumentSpec {
    fn default() -> Self {
        Self {
            description: None,
            expire_at: 0,
            option_updatable: true,
        }
    }
}

impl DocumentSpec {
    pub fn builder() -> DocumentSpecBuilder {
        DocumentSpecBuilder::default()
    }

    /// Build from a loosely typed CBOR map with text keys.
    ///
    /// Omitted fields take their defaults. A `null` description counts as
    /// omitted.
    pub fn from_record(record: &Value) -> Result<Self, ValidationError> {
        let Value::Map(entries) = record else {
            return Err(ValidationError::Malformed(format!(
                "expected a map, found {}",
                kind_name(record)
            )));
        };

        let mut spec = Self::default();
        let mut seen = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let Value::Text(name) = key else {
                return Err(ValidationError::Malformed(format!(
                    "field names must be text, found {}",
                    kind_name(key)
                )));
            };
            if seen.contains(&name.as_str()) {
                return Err(ValidationError::Malformed(format!("duplicate field {name:?}")));
            }
            seen.push(name.as_str());

            match name.as_str() {
                fields::DESCRIPTION => spec.description = description_from_value(value)?,
                fields::EXPIRE_AT => spec.expire_at = expire_at_from_value(value)?,
                fields::OPTION_UPDATABLE => spec.option_updatable = updatable_from_value(value)?,
                other => return Err(ValidationError::UnknownField(other.to_string())),
            }
        }
        Ok(spec)
    }

    /// The loosely typed record form accepted by [`DocumentSpec::from_record`].
    pub fn to_record(&self) -> Value {
        Value::Map(vec![
            (
                Value::Text(fields::DESCRIPTION.into()),
                description_to_value(self.description.as_ref()),
            ),
            (
                Value::Text(fields::EXPIRE_AT.into()),
                Value::Integer(self.expire_at.into()),
            ),
            (
                Value::Text(fields::OPTION_UPDATABLE.into()),
                Value::Bool(self.option_updatable),
            ),
        ])
    }

    pub fn description(&self) -> Option<&Description> {
        self.description.as_ref()
    }

    /// Expiry in epoch seconds; 0 means the document never expires.
    pub fn expire_at(&self) -> u64 {
        self.expire_at
    }

    pub fn option_updatable(&self) -> bool {
        self.option_updatable
    }

    pub fn is_expired_at(&self, now_secs: u64) -> bool {
        self.expire_at != 0 && now_secs >= self.expire_at
    }

    /// Canonical binary record.
    pub fn serialize(&self) -> Vec<u8> {
        encode_canonical(&self.to_value())
    }

    fn to_value(&self) -> Value {
        Value::Map(vec![
            (
                Value::Integer(keys::DESCRIPTION.into()),
                description_to_value(self.description.as_ref()),
            ),
            (
                Value::Integer(keys::EXPIRE_AT.into()),
                Value::Integer(self.expire_at.into()),
            ),
            (
                Value::Integer(keys::OPTION_UPDATABLE.into()),
                Value::Bool(self.option_updatable),
            ),
        ])
    }

    /// Decode the record starting at `offset` in `buf`.
    ///
    /// Returns the offset just past the record together with the spec.
    /// Records that decode but are not in canonical form are rejected, so
    /// every accepted record re-serializes to the same bytes.
    pub fn from_serialized_data(offset: usize, buf: &[u8]) -> Result<(usize, Self), ValidationError> {
        let data = buf.get(offset..).ok_or_else(|| {
            ValidationError::Malformed(format!("offset {offset} past end of {}-byte buffer", buf.len()))
        })?;
        let value: Value =
            ciborium::from_reader(data).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        let spec = Self::from_value(&value)?;

        let canonical = spec.serialize();
        if !data.starts_with(&canonical) {
            return Err(ValidationError::NonCanonical(offset));
        }
        Ok((offset + canonical.len(), spec))
    }

    fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let Value::Map(entries) = value else {
            return Err(ValidationError::Malformed(format!(
                "expected a map, found {}",
                kind_name(value)
            )));
        };
        if entries.len() != 3 {
            return Err(ValidationError::Malformed(format!(
                "expected 3 fields, found {}",
                entries.len()
            )));
        }
        let field = |key: u64| {
            map_get_int(entries, key)
                .ok_or_else(|| ValidationError::Malformed(format!("missing field {key}")))
        };

        Ok(Self {
            description: description_from_value(field(keys::DESCRIPTION)?)?,
            expire_at: expire_at_from_value(field(keys::EXPIRE_AT)?)?,
            option_updatable: updatable_from_value(field(keys::OPTION_UPDATABLE)?)?,
        })
    }
}

/// Typed construction of a [`DocumentSpec`].
#[derive(Debug, Clone, Default)]
pub struct DocumentSpecBuilder {
    description: Option<Description>,
    expire_at: Option<i64>,
    option_updatable: Option<bool>,
}

impl DocumentSpecBuilder {
    pub fn description(mut self, description: impl Into<Description>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Expiry in epoch seconds. Negative values fail at [`build`](Self::build).
    pub fn expire_at(mut self, expire_at: i64) -> Self {
        self.expire_at = Some(expire_at);
        self
    }

    pub fn option_updatable(mut self, updatable: bool) -> Self {
        self.option_updatable = Some(updatable);
        self
    }

    pub fn build(self) -> Result<DocumentSpec, ValidationError> {
        let expire_at = match self.expire_at {
            None => 0,
            Some(secs) => {
                u64::try_from(secs).map_err(|_| ValidationError::InvalidExpireAt(secs.to_string()))?
            }
        };
        Ok(DocumentSpec {
            description: self.description,
            expire_at,
            option_updatable: self.option_updatable.unwrap_or(true),
        })
    }
}

fn description_from_value(value: &Value) -> Result<Option<Description>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(Description::Text(s.clone()))),
        Value::Bytes(b) => Ok(Some(Description::Bytes(b.clone()))),
        Value::Map(entries) => {
            let mut record = BTreeMap::new();
            for (key, value) in entries {
                let Value::Text(name) = key else {
                    return Err(ValidationError::InvalidDescription(format!(
                        "record keys must be text, found {}",
                        kind_name(key)
                    )));
                };
                let value = match value {
                    Value::Text(s) => DescriptionValue::Text(s.clone()),
                    Value::Bytes(b) => DescriptionValue::Bytes(b.clone()),
                    other => {
                        return Err(ValidationError::InvalidDescription(format!(
                            "record value {name:?} is {}",
                            kind_name(other)
                        )))
                    }
                };
                if record.insert(name.clone(), value).is_some() {
                    return Err(ValidationError::InvalidDescription(format!(
                        "duplicate record key {name:?}"
                    )));
                }
            }
            Ok(Some(Description::Record(record)))
        }
        other => Err(ValidationError::InvalidDescription(kind_name(other).to_string())),
    }
}

fn description_to_value(description: Option<&Description>) -> Value {
    match description {
        None => Value::Null,
        Some(Description::Text(s)) => Value::Text(s.clone()),
        Some(Description::Bytes(b)) => Value::Bytes(b.clone()),
        Some(Description::Record(record)) => Value::Map(
            record
                .iter()
                .map(|(k, v)| {
                    let v = match v {
                        DescriptionValue::Text(s) => Value::Text(s.clone()),
                        DescriptionValue::Bytes(b) => Value::Bytes(b.clone()),
                    };
                    (Value::Text(k.clone()), v)
                })
                .collect(),
        ),
    }
}

fn expire_at_from_value(value: &Value) -> Result<u64, ValidationError> {
    match value {
        Value::Integer(i) => {
            let n = i128::from(*i);
            u64::try_from(n).map_err(|_| ValidationError::InvalidExpireAt(n.to_string()))
        }
        other => Err(ValidationError::InvalidExpireAt(kind_name(other).to_string())),
    }
}

fn updatable_from_value(value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(ValidationError::InvalidUpdatable(kind_name(other).to_string())),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "bytes",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Tag(_, _) => "tagged value",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "unknown value",
    }
}
