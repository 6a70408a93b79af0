//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! - MockLlmClient：首轮调用 echo 工具回显用户请求，之后给出引用工具结果的总结
//! - ScriptedLlmClient：按脚本依次返回预设回复，并记录每次调用时的对话长度

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map};

use crate::llm::{LlmClient, LlmError};
use crate::memory::{ConversationTurn, Part};
use crate::tools::ToolDeclaration;

/// 种子回合中用户请求的前缀标记
const USER_REQUEST_MARKER: &str = "User request: ";

/// Mock 客户端：回显用户请求
#[derive(Debug, Default)]
pub struct MockLlmClient;

fn last_user_text(turns: &[ConversationTurn]) -> &str {
    turns
        .iter()
        .rev()
        .find_map(|t| match t {
            ConversationTurn::UserText { text } => Some(text.as_str()),
            ConversationTurn::ModelTurn { .. } => None,
        })
        .unwrap_or("(no input)")
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(
        &self,
        turns: &[ConversationTurn],
        tools: &[ToolDeclaration],
    ) -> Result<Vec<Part>, LlmError> {
        let last_user = last_user_text(turns);
        let has_echo = tools.iter().any(|t| t.name == "echo");

        if turns.len() <= 1 && has_echo {
            let request = last_user
                .rsplit_once(USER_REQUEST_MARKER)
                .map(|(_, r)| r)
                .unwrap_or(last_user);
            let mut args = Map::new();
            args.insert("text".to_string(), json!(format!("Echo from Mock: {}", request)));
            return Ok(vec![Part::function_call("echo", Some(args))]);
        }

        Ok(vec![Part::text(format!("Mock summary. {}", last_user))])
    }
}

/// 脚本客户端：每次 generate 弹出一条预设回复；脚本耗尽后返回空回复
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    script: Mutex<VecDeque<Result<Vec<Part>, LlmError>>>,
    seen_lengths: Mutex<Vec<usize>>,
    seen_turns: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: Vec<Vec<Part>>) -> Self {
        Self::with_results(replies.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<Vec<Part>, LlmError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            seen_lengths: Mutex::new(Vec::new()),
            seen_turns: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用时收到的对话长度
    pub fn seen_lengths(&self) -> Vec<usize> {
        self.seen_lengths
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// 每次调用时收到的完整对话快照
    pub fn seen_turns(&self) -> Vec<Vec<ConversationTurn>> {
        self.seen_turns
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.seen_lengths().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn generate(
        &self,
        turns: &[ConversationTurn],
        _tools: &[ToolDeclaration],
    ) -> Result<Vec<Part>, LlmError> {
        if let Ok(mut lengths) = self.seen_lengths.lock() {
            lengths.push(turns.len());
        }
        if let Ok(mut seen) = self.seen_turns.lock() {
            seen.push(turns.to_vec());
        }
        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_decl() -> ToolDeclaration {
        ToolDeclaration {
            name: "echo".to_string(),
            description: "Echo".to_string(),
            parameters: json!({"type": "object", "properties": {"text": {"type": "string"}}}),
        }
    }

    #[tokio::test]
    async fn test_mock_first_turn_calls_echo() {
        let turns = vec![ConversationTurn::user("Preamble\n\nUser request: open example.com")];
        let parts = MockLlmClient.generate(&turns, &[echo_decl()]).await.unwrap();
        let call = parts[0].function_call.as_ref().unwrap();
        assert_eq!(call.name, "echo");
        assert_eq!(
            call.args.as_ref().unwrap().get("text"),
            Some(&json!("Echo from Mock: open example.com"))
        );
    }

    #[tokio::test]
    async fn test_mock_later_turn_summarizes() {
        let turns = vec![
            ConversationTurn::user("User request: hi"),
            ConversationTurn::model(vec![Part::function_call("echo", None)]),
            ConversationTurn::user("Tool result:\nEcho from Mock: hi"),
        ];
        let parts = MockLlmClient.generate(&turns, &[echo_decl()]).await.unwrap();
        assert!(parts[0].function_call.is_none());
        assert!(parts[0].text.as_deref().unwrap().contains("Echo from Mock: hi"));
    }

    #[tokio::test]
    async fn test_mock_without_echo_tool_answers_directly() {
        let turns = vec![ConversationTurn::user("User request: hi")];
        let parts = MockLlmClient.generate(&turns, &[]).await.unwrap();
        assert!(parts[0].text.is_some());
    }

    #[tokio::test]
    async fn test_scripted_replays_and_records() {
        let client = ScriptedLlmClient::new(vec![vec![Part::text("one")]]);
        let first = client.generate(&[ConversationTurn::user("a")], &[]).await.unwrap();
        assert_eq!(first, vec![Part::text("one")]);
        let turns = vec![
            ConversationTurn::user("a"),
            ConversationTurn::model(vec![]),
            ConversationTurn::user("b"),
        ];
        let exhausted = client.generate(&turns, &[]).await.unwrap();
        assert!(exhausted.is_empty());
        assert_eq!(client.seen_lengths(), vec![1, 3]);
        assert_eq!(client.seen_turns()[1].len(), 3);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let client = ScriptedLlmClient::with_results(vec![Err(LlmError::ApiError("boom".into()))]);
        let err = client.generate(&[], &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::ApiError(_)));
    }
}
