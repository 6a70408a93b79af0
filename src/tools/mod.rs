//! 工具层：提供方抽象（MCP / 进程内）、声明表、Schema 清洗与执行器

pub mod echo;
pub mod executor;
pub mod local;
pub mod mcp;
pub mod provider;
pub mod registry;
pub mod schema;

pub use echo::EchoTool;
pub use executor::ToolExecutor;
pub use local::{LocalToolProvider, Tool};
pub use mcp::{McpClient, McpError, McpStdioProvider};
pub use provider::{ProviderError, ToolDescriptor, ToolOutput, ToolProvider, ToolResult};
pub use registry::{ToolDeclaration, ToolRegistry};
pub use schema::clean_schema;
