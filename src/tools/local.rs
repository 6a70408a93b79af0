//! 进程内工具提供方
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 LocalToolProvider
//! 按名注册；用于 Mock 模式与测试，对循环而言与 MCP 服务端没有区别。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::tools::provider::{ProviderError, ToolDescriptor, ToolOutput, ToolProvider};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认空对象
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<String, String>;
}

#[derive(Default)]
pub struct LocalToolProvider {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl LocalToolProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }
}

#[async_trait]
impl ToolProvider for LocalToolProvider {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
        Ok(self
            .tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: Some(tool.description().to_string()),
                input_schema: Some(tool.parameters_schema()),
            })
            .collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ProviderError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ProviderError::UnknownTool(name.to_string()))?;
        tool.execute(arguments)
            .await
            .map(ToolOutput::ok)
            .map_err(ProviderError::Execution)
    }
}
