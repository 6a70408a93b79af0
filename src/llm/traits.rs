//! LLM 客户端抽象
//!
//! 所有后端（Gemini / Mock / Scripted）实现 LlmClient：给定完整对话与工具声明，返回模型的原始回复片段。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::{ConversationTurn, Part};
use crate::tools::ToolDeclaration;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 单次请求/响应：返回首个候选的全部片段；没有候选时返回空 Vec
    async fn generate(
        &self,
        turns: &[ConversationTurn],
        tools: &[ToolDeclaration],
    ) -> Result<Vec<Part>, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
