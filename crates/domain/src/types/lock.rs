use serde::{Deserialize, Serialize};

/// An advisory file lock held by one agent.
///
/// At most one holder per `file_path` at any instant; re-lock by the same
/// holder is idempotent and extends `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLock {
    /// Normalised path (leading `./` stripped, backslashes folded).
    pub file_path: String,
    pub holder: String,
    pub acquired_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<f64>,
}

impl FileLock {
    pub fn expired(&self, now: f64) -> bool {
        matches!(self.expires_at, Some(exp) if now >= exp)
    }
}

/// Normalise a lock path so equivalent spellings collide.
pub fn normalize_lock_path(raw: &str) -> String {
    let mut path = raw.trim().replace('\\', "/");
    while let Some(stripped) = path.strip_prefix("./") {
        path = stripped.to_string();
    }
    while path.contains("//") {
        path = path.replace("//", "/");
    }
    path.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_normalisation_collapses_spellings() {
        assert_eq!(normalize_lock_path("./src/main.rs"), "src/main.rs");
        assert_eq!(normalize_lock_path("src//main.rs"), "src/main.rs");
        assert_eq!(normalize_lock_path("src\\main.rs"), "src/main.rs");
        assert_eq!(normalize_lock_path("/src/main.rs"), "src/main.rs");
    }

    #[test]
    fn expiry() {
        let lock = FileLock {
            file_path: "a".into(),
            holder: "x".into(),
            acquired_at: 0.0,
            expires_at: Some(10.0),
        };
        assert!(!lock.expired(9.9));
        assert!(lock.expired(10.0));

        let forever = FileLock {
            expires_at: None,
            ..lock
        };
        assert!(!forever.expired(1e12));
    }
}
