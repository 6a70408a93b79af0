//! 工具提供方抽象
//!
//! 可调用的工具在编译期未知：会话开始时由 ToolProvider 列出一次，之后所有调用都经由同一个
//! call_tool(name, arguments) 入口分发。MCP 服务端与进程内工具表都实现此 trait。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tools::mcp::McpError;

/// 提供方给出的原始工具描述（未清洗）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
}

/// 提供方对一次调用的原始回复；is_error 对应 MCP 的 isError
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// 回写进对话的工具结果（失败也会写回）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolResult {
    pub text: String,
    pub succeeded: bool,
}

impl ToolResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            succeeded: true,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            succeeded: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    Execution(String),

    #[error(transparent)]
    Mcp(#[from] McpError),
}

#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// 列出全部可用工具；每个会话只调用一次
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError>;

    /// 提交一次调用并等待回复；不做自动重试
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ProviderError>;
}
