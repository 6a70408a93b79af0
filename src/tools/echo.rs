//! Echo 工具（Mock 模式与测试用）

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde_json::{Map, Value};

use crate::tools::Tool;

#[allow(dead_code)]
#[derive(JsonSchema)]
struct EchoArgs {
    /// 要回显的文本
    text: String,
}

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo text back (for testing)."
    }

    /// schemars 生成的 Schema 带 $schema 等元数据，发现阶段会被清洗
    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schema_for!(EchoArgs)).unwrap_or_else(|_| {
            serde_json::json!({"type": "object", "properties": {}})
        })
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<String, String> {
        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "missing required argument 'text'".to_string())?;
        Ok(text.to_string())
    }
}
