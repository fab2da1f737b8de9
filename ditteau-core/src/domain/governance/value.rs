// ditteau-core/src/domain/governance/value.rs

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::{ConfigError, EvaluationError};

/// A full attribute row, keyed by column name.
pub type AttributeRow = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "varchar" | "text" => Ok(Self::String),
            "integer" | "int" | "number" => Ok(Self::Integer),
            "float" | "double" => Ok(Self::Float),
            "boolean" | "bool" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            _ => Err(ConfigError::UnknownAttributeType(s.to_string())),
        }
    }
}

/// A single attribute value. `Null` is a member of every attribute type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
}

impl Value {
    /// The type carried by this value, or `None` for `Null`.
    pub fn attribute_type(&self) -> Option<AttributeType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(AttributeType::Boolean),
            Self::Int(_) => Some(AttributeType::Integer),
            Self::Float(_) => Some(AttributeType::Float),
            Self::String(_) => Some(AttributeType::String),
            Self::Date(_) => Some(AttributeType::Date),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn type_name(&self) -> &'static str {
        self.attribute_type().map_or("null", |t| t.as_str())
    }

    /// Checks that the value is `Null` or of the declared type.
    pub fn expect_type(&self, column: &str, expected: AttributeType) -> Result<(), EvaluationError> {
        match self.attribute_type() {
            None => Ok(()),
            Some(found) if found == expected => Ok(()),
            Some(found) => Err(EvaluationError::TypeMismatch {
                column: column.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            }),
        }
    }

    /// Ordering between two values of the same type. Mixed types and nulls are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Decodes a JSON value against a declared column type.
    pub fn from_json_typed(
        json: &serde_json::Value,
        column: &str,
        ty: AttributeType,
    ) -> Result<Self, EvaluationError> {
        let mismatch = || EvaluationError::TypeMismatch {
            column: column.to_string(),
            expected: ty.to_string(),
            found: json_type_name(json).to_string(),
        };

        if json.is_null() {
            return Ok(Self::Null);
        }

        match ty {
            AttributeType::String => json.as_str().map(|s| Self::String(s.to_string())),
            AttributeType::Integer => json.as_i64().map(Self::Int),
            AttributeType::Float => json.as_f64().map(Self::Float),
            AttributeType::Boolean => json.as_bool().map(Self::Bool),
            AttributeType::Date => json
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .map(Self::Date),
        }
        .ok_or_else(mismatch)
    }

    /// Decodes a JSON value by shape, for columns without a declared type.
    pub fn from_json_untyped(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s.clone()),
            other => Self::String(other.to_string()),
        }
    }

    /// Coerces a configuration literal to the declared attribute type.
    pub fn from_yaml_literal(
        literal: &serde_yaml::Value,
        ty: AttributeType,
    ) -> Result<Self, String> {
        if literal.is_null() {
            return Ok(Self::Null);
        }
        let coerced = match ty {
            AttributeType::String => match literal {
                serde_yaml::Value::String(s) => Some(Self::String(s.clone())),
                serde_yaml::Value::Number(n) => Some(Self::String(n.to_string())),
                serde_yaml::Value::Bool(b) => Some(Self::String(b.to_string())),
                _ => None,
            },
            AttributeType::Integer => literal.as_i64().map(Self::Int),
            AttributeType::Float => literal.as_f64().map(Self::Float),
            AttributeType::Boolean => literal.as_bool().map(Self::Bool),
            AttributeType::Date => literal
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .map(Self::Date),
        };
        coerced.ok_or_else(|| format!("literal {:?} is not a valid {}", literal, ty))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

fn json_type_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() => "integer",
        serde_json::Value::Number(_) => "float",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
