//! Tool handlers, one module per `ToolSurface` contract.
//!
//! Each module exposes `schema() -> Value` for `tools/list` and an async
//! `execute(ctx, args) -> Result<Value, CoreError>` dispatched by
//! [`crate::server::McpServer`].

pub mod feedback;
pub mod forget;
pub mod health;
pub mod pin;
pub mod recall;
pub mod remember;

pub const TOOL_NAMES: &[&str] = &["remember", "recall", "pin", "unpin", "forget", "feedback"];
