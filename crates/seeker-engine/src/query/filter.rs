use crate::error::QueryError;
use crate::types::DocumentMetadata;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Map, Value};

pub const FILTER_KEYS: [&str; 5] = ["file_type", "min_date", "max_date", "min_size", "max_size"];

/// Structured, AND-combined result filters. Absent fields never exclude anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub file_type: Option<String>,
    pub min_date: Option<DateTime<Utc>>,
    pub max_date: Option<DateTime<Utc>>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
}

impl SearchFilters {
    /// Validate a raw filter map. `null` values count as absent.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, QueryError> {
        let mut filters = Self::default();
        for (key, value) in map {
            if value.is_null() {
                if !FILTER_KEYS.contains(&key.as_str()) {
                    return Err(unknown_key(key));
                }
                continue;
            }
            match key.as_str() {
                "file_type" => filters.file_type = Some(expect_str(key, value)?.to_string()),
                "min_date" => filters.min_date = Some(expect_date(key, value)?),
                "max_date" => filters.max_date = Some(expect_date(key, value)?),
                "min_size" => filters.min_size = Some(expect_size(key, value)?),
                "max_size" => filters.max_size = Some(expect_size(key, value)?),
                _ => return Err(unknown_key(key)),
            }
        }
        Ok(filters)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        if let Some(file_type) = &self.file_type {
            if metadata.file_type.as_str() != file_type {
                return false;
            }
        }
        if self.min_date.is_some_and(|min| metadata.modified < min) {
            return false;
        }
        if self.max_date.is_some_and(|max| metadata.modified > max) {
            return false;
        }
        if self.min_size.is_some_and(|min| metadata.size < min) {
            return false;
        }
        if self.max_size.is_some_and(|max| metadata.size > max) {
            return false;
        }
        true
    }
}

/// Cache key: the query and its non-null filters in sorted key order, JSON-encoded so
/// separators inside values cannot collide.
pub fn cache_key(query: &str, filters: &Map<String, Value>) -> String {
    let mut pairs: Vec<(&String, &Value)> = filters.iter().filter(|(_, v)| !v.is_null()).collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    json!([query, pairs]).to_string()
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (space separator allowed) or a bare
/// date. Naive values are taken as UTC; a bare date means midnight.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn unknown_key(key: &str) -> QueryError {
    QueryError::InvalidFilter(format!(
        "unknown filter '{}' (expected one of: {})",
        key,
        FILTER_KEYS.join(", ")
    ))
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str, QueryError> {
    value
        .as_str()
        .ok_or_else(|| QueryError::InvalidFilter(format!("'{}' must be a string", key)))
}

fn expect_date(key: &str, value: &Value) -> Result<DateTime<Utc>, QueryError> {
    let raw = expect_str(key, value)?;
    parse_date(raw).ok_or_else(|| {
        QueryError::InvalidFilter(format!("'{}' is not an ISO-8601 date: {}", key, raw))
    })
}

fn expect_size(key: &str, value: &Value) -> Result<u64, QueryError> {
    value.as_u64().ok_or_else(|| {
        QueryError::InvalidFilter(format!("'{}' must be a non-negative integer", key))
    })
}
