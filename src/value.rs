//! Configuration values.
//!
//! [`ConfigValue`] is a closed sum type covering every scalar and structure a
//! collector configuration can hold. Durations are kept as
//! [`std::time::Duration`] and rendered in Go's `time.Duration` notation
//! (`1m30s`, `200ms`), which is what the collector expects.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Canonical path -> value, ordered for deterministic output
pub type Configuration = BTreeMap<String, ConfigValue>;

/// Any configuration scalar or structure
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfigValue {
    #[default]
    Null,
    String(String),
    Int(i64),
    Bool(bool),
    Double(f64),
    Duration(Duration),
    StringArray(Vec<String>),
    Array(Vec<ConfigValue>),
    StringMap(BTreeMap<String, String>),
    Map(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// Whether the value counts as "set" for constraint evaluation.
    ///
    /// Null, empty strings and empty collections are unset. Everything else,
    /// including `0`, `false` and a zero duration, is set.
    pub fn is_set(&self) -> bool {
        match self {
            ConfigValue::Null => false,
            ConfigValue::String(s) => !s.is_empty(),
            ConfigValue::StringArray(v) => !v.is_empty(),
            ConfigValue::Array(v) => !v.is_empty(),
            ConfigValue::StringMap(m) => !m.is_empty(),
            ConfigValue::Map(m) => !m.is_empty(),
            ConfigValue::Int(_)
            | ConfigValue::Bool(_)
            | ConfigValue::Double(_)
            | ConfigValue::Duration(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            ConfigValue::Double(v) => Some(*v),
            ConfigValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            ConfigValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// Short type label, used in logs and CLI output
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::String(_) => "string",
            ConfigValue::Int(_) => "int",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Double(_) => "double",
            ConfigValue::Duration(_) => "duration",
            ConfigValue::StringArray(_) => "stringArray",
            ConfigValue::Array(_) => "array",
            ConfigValue::StringMap(_) => "stringMap",
            ConfigValue::Map(_) => "map",
        }
    }

    /// Render as a YAML node. Map keys come out in lexicographic order.
    pub fn to_yaml(&self) -> Value {
        match self {
            ConfigValue::Null => Value::Null,
            ConfigValue::String(s) => Value::String(s.clone()),
            ConfigValue::Int(i) => Value::Number((*i).into()),
            ConfigValue::Bool(b) => Value::Bool(*b),
            ConfigValue::Double(d) => Value::Number((*d).into()),
            ConfigValue::Duration(d) => Value::String(format_duration(*d)),
            ConfigValue::StringArray(v) => {
                Value::Sequence(v.iter().cloned().map(Value::String).collect())
            }
            ConfigValue::Array(v) => Value::Sequence(v.iter().map(ConfigValue::to_yaml).collect()),
            ConfigValue::StringMap(m) => {
                let mut mapping = Mapping::new();
                for (k, v) in m {
                    mapping.insert(Value::String(k.clone()), Value::String(v.clone()));
                }
                Value::Mapping(mapping)
            }
            ConfigValue::Map(m) => {
                let mut mapping = Mapping::new();
                for (k, v) in m {
                    mapping.insert(Value::String(k.clone()), v.to_yaml());
                }
                Value::Mapping(mapping)
            }
        }
    }

    /// Best-effort conversion of an untyped YAML node.
    ///
    /// Strings that parse as Go durations become [`ConfigValue::Duration`],
    /// sequences of strings become [`ConfigValue::StringArray`], mappings of
    /// strings become [`ConfigValue::StringMap`]. Callers that know the
    /// declared field kind should use [`crate::document`] conversions instead.
    pub fn from_yaml(value: &Value) -> Self {
        match value {
            Value::Null => ConfigValue::Null,
            Value::Bool(b) => ConfigValue::Bool(*b),
            Value::Number(n) => number_value(n),
            // A bare "0" stays a string; it is far more often an id than a duration
            Value::String(s) => match parse_duration(s).filter(|_| s.trim() != "0") {
                Some(d) => ConfigValue::Duration(d),
                None => ConfigValue::String(s.clone()),
            },
            Value::Sequence(seq) => {
                let strings: Option<Vec<String>> = seq
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect();
                match strings {
                    Some(strings) => ConfigValue::StringArray(strings),
                    None => ConfigValue::Array(seq.iter().map(ConfigValue::from_yaml).collect()),
                }
            }
            Value::Mapping(mapping) => {
                let strings: Option<BTreeMap<String, String>> = mapping
                    .iter()
                    .map(|(k, v)| Some((key_string(k)?, v.as_str()?.to_string())))
                    .collect();
                match strings {
                    Some(strings) if !strings.is_empty() => ConfigValue::StringMap(strings),
                    _ => ConfigValue::Map(
                        mapping
                            .iter()
                            .filter_map(|(k, v)| Some((key_string(k)?, ConfigValue::from_yaml(v))))
                            .collect(),
                    ),
                }
            }
            Value::Tagged(tagged) => ConfigValue::from_yaml(&tagged.value),
        }
    }
}

pub(crate) fn number_value(n: &serde_yaml::Number) -> ConfigValue {
    if let Some(i) = n.as_i64() {
        ConfigValue::Int(i)
    } else if let Some(u) = n.as_u64() {
        // Out of i64 range; keep the magnitude as a double
        ConfigValue::Double(u as f64)
    } else {
        ConfigValue::Double(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Mapping keys as strings. Non-string scalar keys are stringified.
pub(crate) fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Double(value)
    }
}

impl From<Duration> for ConfigValue {
    fn from(value: Duration) -> Self {
        ConfigValue::Duration(value)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        ConfigValue::StringArray(value)
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_yaml().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ConfigValue::from_yaml(&value))
    }
}

// ==================== Go duration notation ====================

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

/// Parse a Go `time.Duration` string such as `1h30m`, `2.5s` or `300ms`.
///
/// Returns `None` for anything that is not a non-negative duration with at
/// least one unit. A bare `0` is accepted, as in Go.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim();
    if s == "0" {
        return Some(Duration::ZERO);
    }
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() {
        return None;
    }

    let mut total: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let (number, tail) = rest.split_at(num_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => NANOS_PER_MIN,
            "h" => NANOS_PER_HOUR,
            _ => return None,
        };

        let (whole, frac) = match number.split_once('.') {
            Some((w, f)) => (w, f),
            None => (number, ""),
        };
        if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
            return None;
        }
        let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        total = total.checked_add(whole.checked_mul(scale)?)?;

        if !frac.is_empty() {
            let digits = frac.len().min(18) as u32;
            let frac_value: u128 = frac[..digits as usize].parse().ok()?;
            total = total.checked_add(frac_value * scale / 10u128.pow(digits))?;
        }

        rest = tail;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).ok()?;
    Some(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Render a duration the way Go's `time.Duration.String` does.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    if nanos < NANOS_PER_SEC {
        let (unit, scale) = if nanos < NANOS_PER_MICRO {
            ("ns", 1)
        } else if nanos < NANOS_PER_MILLI {
            ("µs", NANOS_PER_MICRO)
        } else {
            ("ms", NANOS_PER_MILLI)
        };
        return format!("{}{}", fixed(nanos, scale), unit);
    }

    let mut out = String::new();
    let hours = nanos / NANOS_PER_HOUR;
    let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MIN;
    let rem = nanos % NANOS_PER_MIN;
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&format!("{}s", fixed(rem, NANOS_PER_SEC)));
    out
}

/// `value / scale` with trailing fractional zeros removed
fn fixed(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let width = scale.to_string().len() - 1;
    let frac = format!("{:0width$}", frac, width = width);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
