//! MCP server core: routes JSON-RPC requests to the six memory tools.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::AppContext;
use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListToolsResult,
    ToolDescription,
};
use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::tools::{self, pin::Direction};

/// MCP server implementation: one per transport session.
pub struct McpServer {
    ctx: Arc<AppContext>,
    initialized: bool,
}

impl McpServer {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx, initialized: false }
    }

    /// Handle an incoming JSON-RPC request. `None` means no response is due
    /// (a notification).
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "handling request");

        if !self.initialized
            && request.method != "initialize"
            && request.method != "notifications/initialized"
        {
            warn!(method = %request.method, "rejecting request before initialize");
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_params("server not initialized"),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "notifications/initialized" => return None,
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!(method, "unknown method");
                Err(JsonRpcError::method_not_found(method))
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    fn handle_initialize(
        &mut self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let _request: InitializeRequest = match params {
            Some(p) => {
                serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))?
            }
            None => InitializeRequest { protocol_version: None, client_info: None },
        };

        self.initialized = true;
        serde_json::to_value(InitializeResult::default())
            .map_err(|e| JsonRpcError::invalid_params(e.to_string()))
    }

    fn handle_tools_list(&self) -> serde_json::Value {
        let tools: Vec<ToolDescription> = tools::TOOL_NAMES
            .iter()
            .map(|&name| ToolDescription {
                name,
                description: tool_description(name),
                input_schema: tool_schema(name),
            })
            .collect();
        serde_json::to_value(ListToolsResult { tools }).expect("tool list serializes")
    }

    async fn handle_tools_call(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(p) => {
                serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))?
            }
            None => return Err(JsonRpcError::invalid_params("missing tool call parameters")),
        };

        let outcome = match request.name.as_str() {
            "remember" => tools::remember::execute(&self.ctx, request.arguments).await,
            "recall" => tools::recall::execute(&self.ctx, request.arguments).await,
            "pin" => tools::pin::execute(&self.ctx, request.arguments, Direction::Pin).await,
            "unpin" => tools::pin::execute(&self.ctx, request.arguments, Direction::Unpin).await,
            "forget" => tools::forget::execute(&self.ctx, request.arguments).await,
            "feedback" => tools::feedback::execute(&self.ctx, request.arguments).await,
            "health" => tools::health::execute(&self.ctx, request.arguments).await,
            other => return Err(JsonRpcError::method_not_found(other)),
        };

        let call_result = match outcome {
            Ok(value) => CallToolResult::ok(&value),
            Err(e) => CallToolResult::failure(e.to_string()),
        };
        serde_json::to_value(call_result).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
    }
}

fn tool_description(name: &str) -> &'static str {
    match name {
        "remember" => "Store a new memory with an optional type, tags, and importance.",
        "recall" => "Search stored memories with hybrid lexical and vector ranking.",
        "pin" => "Protect a memory from the forgetting sweep.",
        "unpin" => "Release a memory's pin, allowing it to be forgotten again.",
        "forget" => "Soft- or hard-delete a memory.",
        "feedback" => "Record whether a recalled memory was helpful.",
        _ => "",
    }
}

fn tool_schema(name: &str) -> serde_json::Value {
    match name {
        "remember" => tools::remember::schema(),
        "recall" => tools::recall::schema(),
        "pin" | "unpin" => tools::pin::schema(),
        "forget" => tools::forget::schema(),
        "feedback" => tools::feedback::schema(),
        _ => serde_json::json!({ "type": "object", "properties": {} }),
    }
}
