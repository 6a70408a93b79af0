//! Agent 错误类型与恢复动作
//!
//! 两级错误：启动期错误（凭据缺失、工具发现失败、LLM 不可用）直接终止会话；
//! 工具执行错误由 RecoveryEngine 转为反馈回合交给 Planner，循环继续。

use thiserror::Error;

use crate::llm::LlmError;

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Tool discovery failed: {0}")]
    Discovery(String),

    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Cancelled")]
    Cancelled,
}

impl AgentError {
    /// 启动期错误：会话无法开始或无法继续规划，原样交给调用方
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ToolExecutionFailed(_) | Self::ToolTimeout(_))
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 将诊断文本作为失败的工具结果回报给 Planner，由其决定下一步
    ReportToPlanner(String),
    /// 终止当前会话
    Abort,
}
