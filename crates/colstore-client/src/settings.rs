//! Per-query server settings.
//!
//! Settings travel as request parameters; the server applies them to the
//! single statement they accompany. Client-level defaults merge with
//! per-call overrides, the override winning on conflict.

use std::collections::BTreeMap;
use std::fmt;

use colstore_http::QueryParams;

/// A single setting value.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    /// Boolean, rendered as `1`/`0`.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Raw string.
    String(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("1"),
            Self::Bool(false) => f.write_str("0"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// An ordered map of setting name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    entries: BTreeMap<String, SettingValue>,
}

impl Settings {
    /// Create an empty settings map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a setting, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SettingValue>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Whether no settings are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `overrides` over `self`, the override winning on conflict.
    #[must_use]
    pub fn merged_with(&self, overrides: &Settings) -> Settings {
        let mut merged = self.clone();
        for (name, value) in &overrides.entries {
            merged.entries.insert(name.clone(), value.clone());
        }
        merged
    }

    /// Append every setting as a request parameter.
    pub(crate) fn append_to(&self, params: &mut QueryParams) {
        for (name, value) in &self.entries {
            params.push(name.clone(), value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_rendering() {
        assert_eq!(SettingValue::from(true).to_string(), "1");
        assert_eq!(SettingValue::from(false).to_string(), "0");
        assert_eq!(SettingValue::from(42i64).to_string(), "42");
        assert_eq!(SettingValue::from(0.5).to_string(), "0.5");
        assert_eq!(SettingValue::from("utf8").to_string(), "utf8");
    }

    #[test]
    fn test_merge_override_wins() {
        let defaults = Settings::new()
            .set("max_rows_to_read", 1000i64)
            .set("readonly", true);
        let overrides = Settings::new().set("max_rows_to_read", 50i64);

        let merged = defaults.merged_with(&overrides);
        let mut params = QueryParams::new();
        merged.append_to(&mut params);
        assert_eq!(
            params.render_target("/"),
            "/?max_rows_to_read=50&readonly=1"
        );
    }
}
