//! MCP（Model Context Protocol）工具提供方
//!
//! - **protocol**: JSON-RPC 消息与 initialize / tools/list / tools/call 结构
//! - **client**: 基于任意异步读写流的请求/响应匹配
//! - **stdio**: 启动 MCP 服务端子进程（默认 Playwright MCP）并实现 ToolProvider

pub mod client;
pub mod protocol;
pub mod stdio;

use thiserror::Error;

pub use client::McpClient;
pub use protocol::{CallToolResult, InitializeResult, ServerInfo};
pub use stdio::{npx_command, McpStdioProvider};

#[derive(Error, Debug)]
pub enum McpError {
    #[error("failed to spawn MCP server '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MCP I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MCP JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MCP error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("MCP connection closed")]
    Closed,

    #[error("MCP protocol error: {0}")]
    Protocol(String),
}
