//! 会话过程事件：供 CLI 等前端展示步数、工具调用、观察与最终回复

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// 步数更新（已执行的工具调用数）
    StepUpdate { step: usize, max_steps: usize },
    /// 正在等待 Planner
    Thinking,
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 工具执行失败，诊断已回报给 Planner
    ToolFailure { tool: String, reason: String },
    /// 最终回复
    FinalText { text: String },
    /// 达到步数上限，会话中止
    StepLimit { max_steps: usize },
}
