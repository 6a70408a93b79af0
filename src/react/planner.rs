//! Planner：一次请求/响应交互，并把模型回复归类为工具调用、最终文本或空回复
//!
//! 归类规则（每次回复只做一次）：
//! 1. 第一个带 functionCall 的片段胜出 → ToolCall，同时出现的文本只记 debug 日志
//! 2. 否则按顺序拼接文本片段，非空白 → FinalText
//! 3. 否则 → Empty

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{Conversation, Part};
use crate::tools::ToolDeclaration;

/// 从模型回复中提取出的工具调用
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

/// Planner 输出；parts 为模型原始片段，追加到对话时原样保留
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerResponse {
    ToolCall {
        request: ToolCallRequest,
        parts: Vec<Part>,
    },
    FinalText {
        text: String,
        parts: Vec<Part>,
    },
    Empty {
        parts: Vec<Part>,
    },
}

fn joined_text(parts: &[Part]) -> String {
    parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

/// 归类模型回复
pub fn classify_parts(parts: Vec<Part>) -> PlannerResponse {
    let call = parts
        .iter()
        .find_map(|p| p.function_call.as_ref())
        .map(|fc| ToolCallRequest {
            tool_name: fc.name.clone(),
            arguments: fc.args.clone().unwrap_or_default(),
        });

    if let Some(request) = call {
        let calls = parts.iter().filter(|p| p.function_call.is_some()).count();
        if calls > 1 {
            tracing::debug!(calls, "Multiple function calls in one response, acting on the first");
        }
        let text = joined_text(&parts);
        if !text.trim().is_empty() {
            tracing::debug!(text = %text, "Planner text alongside tool call");
        }
        return PlannerResponse::ToolCall { request, parts };
    }

    let text = joined_text(&parts);
    if text.trim().is_empty() {
        PlannerResponse::Empty { parts }
    } else {
        PlannerResponse::FinalText { text, parts }
    }
}

/// Planner：持有 LLM，携带完整对话与工具声明请求下一步
pub struct Planner {
    llm: Arc<dyn LlmClient>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 任何 LLM 错误都原样上抛（循环不重试 Planner）
    pub async fn ask(
        &self,
        conversation: &Conversation,
        declarations: &[ToolDeclaration],
    ) -> Result<PlannerResponse, AgentError> {
        let parts = self
            .llm
            .generate(conversation.turns(), declarations)
            .await
            .map_err(AgentError::LlmError)?;
        Ok(classify_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::memory::ConversationTurn;
    use serde_json::json;

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_first_function_call_wins() {
        let parts = vec![
            Part::text("Let me open it"),
            Part::function_call("browser_navigate", Some(args(json!({"url": "https://a.com"})))),
            Part::function_call("browser_click", Some(args(json!({"ref": "e1"})))),
        ];
        match classify_parts(parts.clone()) {
            PlannerResponse::ToolCall { request, parts: raw } => {
                assert_eq!(request.tool_name, "browser_navigate");
                assert_eq!(request.arguments, args(json!({"url": "https://a.com"})));
                assert_eq!(raw, parts);
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_absent_args_become_empty_map() {
        match classify_parts(vec![Part::function_call("browser_snapshot", None)]) {
            PlannerResponse::ToolCall { request, .. } => assert!(request.arguments.is_empty()),
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_text_parts_are_joined() {
        match classify_parts(vec![Part::text("Done. "), Part::text("Page title is Example.")]) {
            PlannerResponse::FinalText { text, .. } => {
                assert_eq!(text, "Done. Page title is Example.")
            }
            other => panic!("expected final text, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_or_missing_text_is_empty() {
        assert!(matches!(classify_parts(vec![]), PlannerResponse::Empty { .. }));
        assert!(matches!(
            classify_parts(vec![Part::text("  \n")]),
            PlannerResponse::Empty { .. }
        ));
        assert!(matches!(
            classify_parts(vec![Part::default()]),
            PlannerResponse::Empty { .. }
        ));
    }

    #[tokio::test]
    async fn test_ask_passes_conversation() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![vec![Part::text("hello")]]));
        let planner = Planner::new(llm.clone());
        let mut conv = Conversation::new();
        conv.push(ConversationTurn::user("hi"));
        let resp = planner.ask(&conv, &[]).await.unwrap();
        assert!(matches!(resp, PlannerResponse::FinalText { ref text, .. } if text == "hello"));
        assert_eq!(llm.seen_lengths(), vec![1]);
    }

    #[tokio::test]
    async fn test_ask_propagates_llm_error() {
        let llm = Arc::new(ScriptedLlmClient::with_results(vec![Err(
            LlmError::RateLimited { retry_after_ms: 1000 },
        )]));
        let planner = Planner::new(llm);
        let err = planner.ask(&Conversation::new(), &[]).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::LlmError(LlmError::RateLimited { retry_after_ms: 1000 })
        ));
        assert!(err.is_fatal());
    }
}
