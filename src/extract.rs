//! Tolerant field extraction from loosely structured JSON records.
//!
//! A missing (or `null`) field yields the caller's default. A field that is
//! present but has the wrong shape also yields the default and bumps the
//! soft-error counter; nothing here ever fails.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct FieldExtractor {
    soft_errors: u64,
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of present-but-malformed fields seen so far.
    pub fn soft_errors(&self) -> u64 {
        self.soft_errors
    }

    pub fn u64_field(&mut self, item: &Value, name: &str, default: u64) -> u64 {
        let Some(value) = present(item, name) else {
            return default;
        };
        let parsed = match value {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        parsed.unwrap_or_else(|| self.soft_error(name, value, default))
    }

    pub fn bool_field(&mut self, item: &Value, name: &str, default: bool) -> bool {
        let Some(value) = present(item, name) else {
            return default;
        };
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse::<bool>().ok(),
            _ => None,
        };
        parsed.unwrap_or_else(|| self.soft_error(name, value, default))
    }

    pub fn str_field<'a>(&mut self, item: &'a Value, name: &str) -> Option<&'a str> {
        let value = present(item, name)?;
        match value.as_str() {
            Some(s) => Some(s),
            None => self.soft_error(name, value, None),
        }
    }

    /// Parses an ISO-8601 instant, with or without offset, as UTC.
    ///
    /// Unparseable timestamps are `None`, never the epoch: a bogus value must
    /// not drag a maximum or an average toward 1970.
    pub fn timestamp_field(&mut self, item: &Value, name: &str) -> Option<DateTime<Utc>> {
        let value = present(item, name)?;
        match value.as_str().and_then(parse_timestamp) {
            Some(ts) => Some(ts),
            None => self.soft_error(name, value, None),
        }
    }

    fn soft_error<T>(&mut self, name: &str, value: &Value, default: T) -> T {
        self.soft_errors += 1;
        debug!("Ignoring malformed field {}: {}", name, value);
        default
    }
}

fn present<'a>(item: &'a Value, name: &str) -> Option<&'a Value> {
    item.get(name).filter(|v| !v.is_null())
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.and_utc())
}
