//! Shared error type used across all MASC crates.
//!
//! Every variant maps to one `kind` string on the wire; `tools/call`
//! failures surface as JSON-RPC errors `{ code, message, data: { kind } }`.

/// Shared error type used across all MASC crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("tool disabled: {0}")]
    ToolDisabled(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("backend transient: {0}")]
    BackendTransient(String),

    #[error("backend fatal: {0}")]
    BackendFatal(String),

    #[error("drift: {0}")]
    Drift(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Machine-readable `kind` string exposed in JSON-RPC error data.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::Unauthorized(_) => "unauthorized",
            Self::RateLimited(_) => "rate_limited",
            Self::ToolDisabled(_) => "tool_disabled",
            Self::Timeout(_) => "timeout",
            Self::BackendTransient(_) => "backend_transient",
            Self::BackendFatal(_) => "backend_fatal",
            Self::Drift(_) => "drift",
            Self::Cancelled(_) => "cancelled",
            Self::Internal(_) => "internal",
        }
    }

    /// JSON-RPC error code for this error.
    ///
    /// Argument validation failures map to the protocol-level `-32602`;
    /// every other domain error uses the implementation-reserved `-32000`.
    pub fn json_rpc_code(&self) -> i64 {
        match self {
            Self::InvalidArgument(_) => -32602,
            Self::Internal(_) => -32603,
            _ => -32000,
        }
    }

    /// Whether a retry at the caller may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BackendTransient(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::BackendFatal(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_match_taxonomy() {
        assert_eq!(Error::Conflict("x".into()).kind(), "conflict");
        assert_eq!(Error::NotFound("x".into()).kind(), "not_found");
        assert_eq!(Error::RateLimited("x".into()).kind(), "rate_limited");
        assert_eq!(Error::Drift("x".into()).kind(), "drift");
    }

    #[test]
    fn json_rpc_codes() {
        assert_eq!(Error::InvalidArgument("x".into()).json_rpc_code(), -32602);
        assert_eq!(Error::Internal("x".into()).json_rpc_code(), -32603);
        assert_eq!(Error::Conflict("x".into()).json_rpc_code(), -32000);
    }

    #[test]
    fn only_backend_transient_is_transient() {
        assert!(Error::BackendTransient("x".into()).is_transient());
        assert!(!Error::BackendFatal("x".into()).is_transient());
        assert!(!Error::Timeout("x".into()).is_transient());
    }
}
