//! MCP method payloads: `initialize`, `tools/list`, and `tools/call`.
//!
//! This server's capability surface is tools-only — no resources, no
//! prompts — so the message set is trimmed to what the six memory tools
//! actually need.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::MCP_VERSION;

#[derive(Debug, Clone, Deserialize)]
pub struct InitializeRequest {
    #[serde(default, rename = "protocolVersion")]
    pub protocol_version: Option<String>,
    #[serde(default, rename = "clientInfo")]
    pub client_info: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: &'static str,
    pub server_info: ServerInfo,
    pub capabilities: ServerCapabilities,
    pub instructions: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: MCP_VERSION,
            server_info: ServerInfo {
                name: "memoria-mcp",
                version: env!("CARGO_PKG_VERSION"),
            },
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            instructions: "Call `remember` to store a memory, `recall` to search, `pin`/`unpin` \
                           to protect or release one from forgetting, `forget` to delete, and \
                           `feedback` to record whether a recalled memory was useful.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescription {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallToolRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallToolResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn ok(value: &Value) -> Self {
        Self {
            content: vec![ToolResultContent {
                content_type: "text",
                text: serde_json::to_string_pretty(value).unwrap_or_default(),
            }],
            is_error: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolResultContent { content_type: "text", text: message.into() }],
            is_error: true,
        }
    }
}
