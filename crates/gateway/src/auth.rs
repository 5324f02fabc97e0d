//! Bearer-token authentication.
//!
//! Tokens are read once at startup (env var plus optional tokens file)
//! and cached as SHA-256 digests; every comparison is constant-time over
//! the digest so neither token content nor length leaks.  With no tokens
//! configured the verifier allows everything (dev mode) after logging a
//! warning once.

use std::collections::HashSet;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use masc_domain::config::ServerConfig;
use masc_domain::{Error, Result};

use crate::state::AppState;

pub struct AuthVerifier {
    /// SHA-256 digests of accepted tokens; empty set = auth disabled.
    digests: RwLock<HashSet<[u8; 32]>>,
    enabled: bool,
}

impl AuthVerifier {
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let mut digests = HashSet::new();
        if let Some(token) = &config.token {
            digests.insert(digest(token));
        }
        if let Some(path) = &config.tokens_file {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| Error::Internal(format!("tokens file {path}: {e}")))?;
            for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
                digests.insert(digest(line));
            }
        }
        let enabled = !digests.is_empty();
        if !enabled {
            tracing::warn!("no MASC_TOKEN configured; requests are unauthenticated");
        }
        Ok(Self {
            digests: RwLock::new(digests),
            enabled,
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Verify a bearer token.  Returns the rate-limit key for this caller.
    pub fn verify(&self, token: Option<&str>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let Some(token) = token else {
            return Err(Error::Unauthorized("missing bearer token".into()));
        };
        let provided = digest(token);
        let digests = self.digests.read();
        let ok = digests
            .iter()
            .any(|known| bool::from(provided.ct_eq(known)));
        if ok {
            Ok(())
        } else {
            Err(Error::Unauthorized("invalid bearer token".into()))
        }
    }

    /// Revoke a token at runtime.  Returns whether it was known.
    pub fn revoke(&self, token: &str) -> bool {
        self.digests.write().remove(&digest(token))
    }
}

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// Pull the bearer token out of an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header.and_then(|v| v.strip_prefix("Bearer "))
}

/// Axum middleware for the REST read surface.  The `/mcp` dispatcher does
/// its own check inside the pipeline (it needs the token for rate-limit
/// keying).
pub async fn require_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let token = bearer_token(
        req.headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok()),
    );
    match state.auth.verify(token) {
        Ok(()) => next.run(req).await,
        Err(e) => (
            axum::http::StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": e.to_string(), "kind": e.kind() })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> ServerConfig {
        ServerConfig {
            token: token.map(str::to_owned),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn disabled_when_no_tokens() {
        let auth = AuthVerifier::from_config(&config(None)).unwrap();
        assert!(!auth.enabled());
        assert!(auth.verify(None).is_ok());
        assert!(auth.verify(Some("anything")).is_ok());
    }

    #[test]
    fn verifies_configured_token() {
        let auth = AuthVerifier::from_config(&config(Some("s3cret"))).unwrap();
        assert!(auth.verify(Some("s3cret")).is_ok());
        assert!(matches!(
            auth.verify(Some("wrong")),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(auth.verify(None), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn revocation_takes_effect() {
        let auth = AuthVerifier::from_config(&config(Some("s3cret"))).unwrap();
        assert!(auth.revoke("s3cret"));
        assert!(auth.verify(Some("s3cret")).is_err());
        assert!(!auth.revoke("s3cret"));
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(None), None);
    }
}
