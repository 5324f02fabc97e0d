use serde::{Deserialize, Serialize};

/// Maximum length of a sanitised cache key.
pub const CACHE_KEY_MAX_LEN: usize = 64;

/// A room-scoped cache entry with optional TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub created_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl CacheEntry {
    pub fn expired(&self, now: f64) -> bool {
        matches!(self.expires_at, Some(exp) if now >= exp)
    }
}

/// Sanitise a cache key: non-alphanumeric characters become `_`, capped
/// at [`CACHE_KEY_MAX_LEN`].
pub fn sanitize_cache_key(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(CACHE_KEY_MAX_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_and_caps() {
        assert_eq!(sanitize_cache_key("a/b:c"), "a_b_c");
        assert_eq!(sanitize_cache_key("plain123"), "plain123");
        let long = "x".repeat(100);
        assert_eq!(sanitize_cache_key(&long).len(), CACHE_KEY_MAX_LEN);
    }

    #[test]
    fn expiry_boundary() {
        let entry = CacheEntry {
            key: "k".into(),
            value: "v".into(),
            created_at: 0.0,
            expires_at: Some(60.0),
            tags: vec![],
        };
        assert!(!entry.expired(59.9));
        assert!(entry.expired(60.0));
    }
}
