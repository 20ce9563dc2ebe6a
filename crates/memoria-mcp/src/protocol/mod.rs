//! MCP Protocol Implementation
//!
//! JSON-RPC 2.0 over stdio for the Model Context Protocol.

#[cfg(feature = "http")]
pub mod http;
pub mod messages;
pub mod stdio;
pub mod types;
