use crate::common::Value;
use chrono::{DateTime, Utc};

/// The declared type of an item property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    /// Whole numbers. Integral floats are accepted and coerced on load.
    Integer,
    /// Any number, integral or not.
    Number,
    Boolean,
    Date,
    Array,
    Document,
    Any,
}

impl PropertyType {
    /// Returns `true` if `value` is acceptable for this type. Null is
    /// accepted by every type; required-ness is checked separately.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            PropertyType::String => value.is_string(),
            PropertyType::Integer => value.as_i64().is_some(),
            PropertyType::Number => value.is_number(),
            PropertyType::Boolean => value.as_bool().is_some(),
            PropertyType::Date => value.as_datetime().is_some(),
            PropertyType::Array => value.is_array(),
            PropertyType::Document => value.is_document(),
            PropertyType::Any => true,
        }
    }

    /// Converts a stored representation back to the declared type where
    /// the storage format loses it: RFC 3339 strings for dates, integral
    /// floats for integers. Other values are returned unchanged.
    pub fn coerce(&self, value: Value) -> Value {
        match (self, value) {
            (PropertyType::Date, Value::String(s)) => match DateTime::parse_from_rfc3339(&s) {
                Ok(dt) => Value::DateTime(dt.with_timezone(&Utc)),
                Err(_) => Value::String(s),
            },
            (PropertyType::Integer, value @ Value::F64(_)) => match value.as_i64() {
                Some(i) => Value::I64(i),
                None => value,
            },
            (_, other) => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Number => "number",
            PropertyType::Boolean => "boolean",
            PropertyType::Date => "date",
            PropertyType::Array => "array",
            PropertyType::Document => "document",
            PropertyType::Any => "any",
        }
    }
}

/// Options for a plain property declaration.
#[derive(Debug, Clone, Default)]
pub struct PropertyOptions {
    pub(crate) required: bool,
    pub(crate) default: Option<Value>,
}

impl PropertyOptions {
    pub fn new() -> PropertyOptions {
        PropertyOptions::default()
    }

    /// Requires a non-null value at validation time.
    pub fn required(mut self, required: bool) -> PropertyOptions {
        self.required = required;
        self
    }

    /// Value written into newly created items that do not set the property.
    pub fn default_value<T: Into<Value>>(mut self, value: T) -> PropertyOptions {
        self.default = Some(value.into());
        self
    }
}

/// Options for key property declarations.
///
/// `auto` defaults to `true` for primary keys and `false` for every other
/// key. `max` bounds generated numeric keys.
#[derive(Debug, Clone, Default)]
pub struct KeyOptions {
    pub(crate) auto: Option<bool>,
    pub(crate) max: Option<i64>,
}

impl KeyOptions {
    pub fn new() -> KeyOptions {
        KeyOptions::default()
    }

    pub fn auto(mut self, auto: bool) -> KeyOptions {
        self.auto = Some(auto);
        self
    }

    pub fn max(mut self, max: i64) -> KeyOptions {
        self.max = Some(max);
        self
    }
}

/// A declared property of an item schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    property_type: PropertyType,
    required: bool,
    default: Option<Value>,
}

impl Property {
    pub(crate) fn new(name: &str, property_type: PropertyType, options: PropertyOptions) -> Self {
        Property {
            name: name.to_string(),
            property_type,
            required: options.required,
            default: options.default,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}
