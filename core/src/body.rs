//! Declarative construction of request bodies and query strings.
//!
//! # Design
//! aptly reads a missing key as "leave unchanged" (or "use the server
//! default" on creation), so optional parameters are omitted rather than sent
//! as `null`, `""` or `false`. `Present` decides what counts as supplied;
//! `BodyBuilder` and `Params` only record values that pass it.

use serde_json::{Map, Value};

/// Whether a parameter value was meaningfully supplied.
pub trait Present {
    fn is_present(&self) -> bool;
}

impl Present for bool {
    fn is_present(&self) -> bool {
        *self
    }
}

impl Present for str {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Present for String {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Present for [T] {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Present for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Present> Present for Option<T> {
    fn is_present(&self) -> bool {
        self.as_ref().is_some_and(Present::is_present)
    }
}

impl<T: Present + ?Sized> Present for &T {
    fn is_present(&self) -> bool {
        (**self).is_present()
    }
}

impl Present for Value {
    fn is_present(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Number(_) => true,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }
}

/// Accumulates a JSON object, skipping absent optional values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyBuilder {
    fields: Map<String, Value>,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always include `key`.
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Include `key` only when `value` is present.
    pub fn optional<T>(mut self, key: &str, value: T) -> Self
    where
        T: Present + Into<Value>,
    {
        if value.is_present() {
            self.fields.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Accumulates query parameters with the same omission rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn optional(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| v.is_present()) {
            self.pairs.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// `key=1` when `flag` is set.
    pub fn flag(self, key: &str, flag: bool) -> Self {
        self.flag_value(key, flag, "1")
    }

    /// `key=value` when `flag` is set.
    pub fn flag_value(mut self, key: &str, flag: bool, value: &str) -> Self {
        if flag {
            self.pairs.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn build(self) -> Vec<(String, String)> {
        self.pairs
    }
}
