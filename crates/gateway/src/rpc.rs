//! JSON-RPC 2.0 types for the `/mcp` endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use masc_domain::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol-level error codes.
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;

/// A JSON-RPC 2.0 request.  Requests without an `id` are notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A JSON-RPC 2.0 error object.  Domain failures carry the taxonomy kind
/// in `data.kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<&Error> for JsonRpcError {
    fn from(e: &Error) -> Self {
        Self {
            code: e.json_rpc_code(),
            message: e.to_string(),
            data: Some(serde_json::json!({ "kind": e.kind() })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_has_no_id() {
        let req: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"$/cancelRequest","params":{"id":7}}"#,
        )
        .unwrap();
        assert!(req.is_notification());
    }

    #[test]
    fn domain_errors_carry_kind() {
        let err = JsonRpcError::from(&Error::Conflict("task t1 already claimed".into()));
        assert_eq!(err.code, -32000);
        assert_eq!(err.data.unwrap()["kind"], "conflict");
    }

    #[test]
    fn invalid_argument_uses_protocol_code() {
        let err = JsonRpcError::from(&Error::InvalidArgument("bad priority".into()));
        assert_eq!(err.code, -32602);
    }
}
