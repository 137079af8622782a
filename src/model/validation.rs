use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of checking one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status_code: u16,
    pub final_url: String,
    pub accessible: bool,
    pub redirect_count: u32,
    #[serde(default)]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
    /// Never true for stored entries, so it only shows up in reports.
    #[serde(default, skip_serializing_if = "is_false")]
    pub from_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_detected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_succeeded: Option<bool>,
}

impl ValidationResult {
    /// A non-accessible result that never reached the network or failed in
    /// transport.
    pub fn failed(url: &str, error: &str) -> Self {
        Self {
            status_code: 0,
            final_url: url.to_string(),
            accessible: false,
            redirect_count: 0,
            error: Some(error.to_string()),
            checked_at: Utc::now(),
            from_cache: false,
            protection_detected: None,
            retry_method: None,
            retry_succeeded: None,
        }
    }

    pub fn from_status(status_code: u16, final_url: String, redirect_count: u32) -> Self {
        Self {
            status_code,
            final_url,
            accessible: is_accessible_status(status_code),
            redirect_count,
            error: None,
            checked_at: Utc::now(),
            from_cache: false,
            protection_detected: None,
            retry_method: None,
            retry_succeeded: None,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Terminal status in the 200..400 range, after redirects have been followed.
pub fn is_accessible_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// URL-keyed store of previous results, shared across validation batches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationCache {
    entries: HashMap<String, ValidationResult>,
}

impl ValidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the cached entry, flagged as served from cache.
    pub fn get(&self, url: &str) -> Option<ValidationResult> {
        self.entries.get(url).map(|r| ValidationResult {
            from_cache: true,
            ..r.clone()
        })
    }

    pub fn insert(&mut self, url: String, result: ValidationResult) {
        self.entries.insert(
            url,
            ValidationResult {
                from_cache: false,
                ..result
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessible_range() {
        assert!(!is_accessible_status(0));
        assert!(!is_accessible_status(199));
        assert!(is_accessible_status(200));
        assert!(is_accessible_status(302));
        assert!(!is_accessible_status(400));
        assert!(!is_accessible_status(503));
    }

    #[test]
    fn cache_hits_are_flagged() {
        let mut cache = ValidationCache::new();
        cache.insert(
            "https://a.example.org/p".to_string(),
            ValidationResult::from_status(200, "https://a.example.org/p".to_string(), 0),
        );
        let hit = cache.get("https://a.example.org/p").unwrap();
        assert!(hit.from_cache);
        assert!(hit.accessible);
        assert!(cache.get("https://b.example.org/p").is_none());
    }

    #[test]
    fn cache_file_format_omits_from_cache() {
        let mut cache = ValidationCache::new();
        cache.insert(
            "https://a.example.org/p".to_string(),
            ValidationResult::failed("https://a.example.org/p", "Timeout"),
        );
        let json = serde_json::to_value(&cache).unwrap();
        let entry = &json["https://a.example.org/p"];
        assert_eq!(entry["status_code"], 0);
        assert_eq!(entry["error"], "Timeout");
        assert!(entry.get("checked_at").is_some());
        assert!(entry.get("from_cache").is_none());

        let back: ValidationCache = serde_json::from_value(json).unwrap();
        assert_eq!(back.len(), 1);
    }
}
