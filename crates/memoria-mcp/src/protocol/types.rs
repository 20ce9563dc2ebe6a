//! JSON-RPC 2.0 envelope types shared by the stdio, HTTP, and WebSocket
//! transports.

use memoria_core::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Negotiated MCP protocol revision.
pub const MCP_VERSION: &str = "2025-03-26";

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(-32601, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message.into())
    }

    /// Maps a [`CoreError`] onto its JSON-RPC error code, per the §7
    /// taxonomy-to-transport table: Invalid → -32602, NotFound → -32002,
    /// Conflict → -32010, Busy → -32011, Unavailable → -32012,
    /// Internal → -32603.
    pub fn from_core_error(err: &CoreError) -> Self {
        let code = match err {
            CoreError::Invalid(_) => -32602,
            CoreError::NotFound(_) => -32002,
            CoreError::Conflict(_) => -32010,
            CoreError::Busy(_) => -32011,
            CoreError::Unavailable(_) => -32012,
            CoreError::Internal(_) => -32603,
        };
        Self {
            code,
            message: err.to_string(),
            data: Some(serde_json::json!({ "code": err.code() })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_dash_32002() {
        let err = CoreError::not_found("memory mem_1");
        let rpc = JsonRpcError::from_core_error(&err);
        assert_eq!(rpc.code, -32002);
    }

    #[test]
    fn conflict_maps_to_dash_32010() {
        let err = CoreError::conflict("unpin requires confirm");
        let rpc = JsonRpcError::from_core_error(&err);
        assert_eq!(rpc.code, -32010);
    }

    #[test]
    fn internal_maps_to_standard_dash_32603() {
        let err = CoreError::internal("bug");
        let rpc = JsonRpcError::from_core_error(&err);
        assert_eq!(rpc.code, -32603);
    }
}
