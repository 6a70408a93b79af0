//! 工具执行器
//!
//! 持有 ToolProvider 与可选的单次调用超时，invoke(tool_name, args) 经提供方提交一次调用；
//! 提供方报错、回复带 isError 或超时都转为 AgentError；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::provider::{ProviderError, ToolOutput, ToolProvider};

pub struct ToolExecutor {
    provider: Arc<dyn ToolProvider>,
    timeout: Option<Duration>,
}

impl ToolExecutor {
    /// timeout_secs 为 0 表示不限时（循环本身不对工具调用施加超时）
    pub fn new(provider: Arc<dyn ToolProvider>, timeout_secs: u64) -> Self {
        Self {
            provider,
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }

    /// 执行指定工具，成功时返回结果文本
    pub async fn invoke(
        &self,
        tool_name: &str,
        args: Map<String, Value>,
    ) -> Result<String, AgentError> {
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let call = self.provider.call_tool(tool_name, args);
        let result: Result<Result<ToolOutput, ProviderError>, ()> = match self.timeout {
            Some(limit) => timeout(limit, call).await.map_err(|_| ()),
            None => Ok(call.await),
        };

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(output)) if !output.is_error => (true, "ok"),
            Ok(Ok(_)) => (false, "tool_error"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(output)) if output.is_error => Err(AgentError::ToolExecutionFailed(output.text)),
            Ok(Ok(output)) => Ok(output.text),
            Ok(Err(e)) => Err(AgentError::ToolExecutionFailed(e.to_string())),
            Err(()) => Err(AgentError::ToolTimeout(tool_name.to_string())),
        }
    }
}

/// 审计日志中参数预览的最大字符数
const ARGS_PREVIEW_CHARS: usize = 200;

fn args_preview(args: &Map<String, Value>) -> String {
    let s = Value::Object(args.clone()).to_string();
    if s.chars().count() > ARGS_PREVIEW_CHARS {
        format!("{}...", s.chars().take(ARGS_PREVIEW_CHARS).collect::<String>())
    } else {
        s
    }
}
