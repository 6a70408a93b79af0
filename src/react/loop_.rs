//! 编排主循环
//!
//! 种子回合 -> Plan -> (ToolCall -> 执行 -> 反馈回合 -> Plan)* -> FinalText / Empty / 步数耗尽。
//! 每次调用 Planner 前对话长度恒为 1 + 2 × 已执行步数；工具失败写回对话后继续，Planner 失败直接上抛。
//! 可选 event_tx：向前端推送 StepUpdate / Thinking / ToolCall / Observation / FinalText 等事件。

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::core::{AgentError, LoopState, RecoveryAction, RecoveryEngine};
use crate::memory::{Conversation, ConversationTurn};
use crate::react::prompt::{seed_text, tool_result_feedback, DEFAULT_SYSTEM_PROMPT};
use crate::react::{Planner, PlannerResponse, SessionEvent};
use crate::tools::{ToolExecutor, ToolRegistry, ToolResult};

/// 默认步数上限（单次会话最多执行的工具调用数）
pub const DEFAULT_MAX_STEPS: usize = 50;
/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 会话结束时的结果
#[derive(Debug)]
pub struct SessionOutcome {
    /// Done 或 Aborted
    pub state: LoopState,
    /// Planner 的最终文本；Empty 回复或步数耗尽时为 None
    pub summary: Option<String>,
    /// 已执行的工具调用数
    pub steps: usize,
    pub conversation: Conversation,
}

/// 会话配置：必需组件 + 可选项（with_* 设置）
pub struct Session<'a> {
    pub planner: &'a Planner,
    pub registry: &'a ToolRegistry,
    pub executor: &'a ToolExecutor,
    pub recovery: &'a RecoveryEngine,
    pub cancel_token: CancellationToken,
    pub max_steps: usize,
    pub system_prompt: &'a str,
    pub event_tx: Option<&'a UnboundedSender<SessionEvent>>,
}

impl<'a> Session<'a> {
    pub fn new(
        planner: &'a Planner,
        registry: &'a ToolRegistry,
        executor: &'a ToolExecutor,
        recovery: &'a RecoveryEngine,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            planner,
            registry,
            executor,
            recovery,
            cancel_token,
            max_steps: DEFAULT_MAX_STEPS,
            system_prompt: DEFAULT_SYSTEM_PROMPT,
            event_tx: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_system_prompt(mut self, prompt: &'a str) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_event_tx(mut self, tx: &'a UnboundedSender<SessionEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn send(&self, ev: SessionEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }
}

/// 当前状态，迁移时记 debug 日志
struct StateCursor(LoopState);

impl StateCursor {
    fn go(&mut self, next: LoopState) {
        debug_assert!(
            self.0.can_transition_to(next),
            "illegal transition {} -> {}",
            self.0,
            next
        );
        tracing::debug!(from = %self.0, to = %next, "state transition");
        self.0 = next;
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!(
            "{}...",
            text.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>()
        )
    } else {
        text.to_string()
    }
}

/// 运行一次会话直到 Done / Aborted；Planner 错误、取消等致命错误原样返回
pub async fn run_session(
    session: &Session<'_>,
    instruction: &str,
) -> Result<SessionOutcome, AgentError> {
    let planner = session.planner;
    let declarations = session.registry.declarations();
    let cancel_token = session.cancel_token.clone();
    let max_steps = session.max_steps;

    let mut state = StateCursor(LoopState::Init);
    let mut conversation = Conversation::new();
    conversation.push(ConversationTurn::user(seed_text(
        session.system_prompt,
        instruction,
    )));
    state.go(LoopState::AwaitingPlan);

    let mut steps = 0usize;

    loop {
        debug_assert_eq!(conversation.len(), 1 + 2 * steps);
        session.send(SessionEvent::StepUpdate { step: steps, max_steps });
        session.send(SessionEvent::Thinking);

        let response = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                tracing::info!(steps, "Session cancelled while waiting for planner");
                return Err(AgentError::Cancelled);
            }
            r = planner.ask(&conversation, declarations) => r?,
        };

        let (request, parts) = match response {
            PlannerResponse::ToolCall { request, parts } => (request, parts),
            PlannerResponse::FinalText { text, .. } => {
                state.go(LoopState::Done);
                tracing::info!(steps, "Planner returned final text");
                session.send(SessionEvent::FinalText { text: text.clone() });
                return Ok(SessionOutcome {
                    state: state.0,
                    summary: Some(text),
                    steps,
                    conversation,
                });
            }
            PlannerResponse::Empty { .. } => {
                state.go(LoopState::Done);
                tracing::info!(steps, "Planner returned an empty response, finishing");
                return Ok(SessionOutcome {
                    state: state.0,
                    summary: None,
                    steps,
                    conversation,
                });
            }
        };

        if steps >= max_steps {
            state.go(LoopState::Aborted);
            tracing::warn!(
                max_steps,
                tool = %request.tool_name,
                "Reached maximum steps, stopping without executing further tool calls"
            );
            session.send(SessionEvent::StepLimit { max_steps });
            return Ok(SessionOutcome {
                state: state.0,
                summary: None,
                steps,
                conversation,
            });
        }

        conversation.push(ConversationTurn::model(parts));
        steps += 1;
        state.go(LoopState::ExecutingTool);

        let tool = request.tool_name;
        tracing::info!(step = steps, tool = %tool, "Executing tool");
        session.send(SessionEvent::ToolCall {
            tool: tool.clone(),
            args: Value::Object(request.arguments.clone()),
        });

        let invoked = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                tracing::info!(step = steps, tool = %tool, "Session cancelled during tool call");
                return Err(AgentError::Cancelled);
            }
            r = session.executor.invoke(&tool, request.arguments) => r,
        };

        let result = match invoked {
            Ok(text) => {
                session.send(SessionEvent::Observation {
                    tool: tool.clone(),
                    preview: preview(&text),
                });
                ToolResult::success(text)
            }
            Err(e) => match session.recovery.handle(&e) {
                RecoveryAction::ReportToPlanner(diagnostic) => {
                    tracing::warn!(tool = %tool, error = %diagnostic, "Tool call failed");
                    session.send(SessionEvent::ToolFailure {
                        tool: tool.clone(),
                        reason: diagnostic.clone(),
                    });
                    ToolResult::failure(diagnostic)
                }
                RecoveryAction::Abort => return Err(e),
            },
        };

        conversation.push(ConversationTurn::user(tool_result_feedback(&result)));
        state.go(LoopState::AwaitingPlan);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::llm::ScriptedLlmClient;
    use crate::memory::Part;
    use crate::tools::{EchoTool, LocalToolProvider, ToolProvider};
    use serde_json::{json, Map};

    async fn fixtures(
        replies: Vec<Vec<Part>>,
    ) -> (Arc<ScriptedLlmClient>, Planner, ToolRegistry, ToolExecutor) {
        let llm = Arc::new(ScriptedLlmClient::new(replies));
        let provider: Arc<dyn ToolProvider> =
            Arc::new(LocalToolProvider::new().with_tool(EchoTool));
        let registry = ToolRegistry::discover(provider.as_ref()).await.unwrap();
        let executor = ToolExecutor::new(provider, 0);
        (llm.clone(), Planner::new(llm), registry, executor)
    }

    fn echo_call(text: &str) -> Vec<Part> {
        let mut args = Map::new();
        args.insert("text".to_string(), json!(text));
        vec![Part::function_call("echo", Some(args))]
    }

    #[tokio::test]
    async fn test_echo_then_summary() {
        let (llm, planner, registry, executor) =
            fixtures(vec![echo_call("hi"), vec![Part::text("All done")]]).await;
        let recovery = RecoveryEngine::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let session = Session::new(&planner, &registry, &executor, &recovery, CancellationToken::new())
            .with_system_prompt("Preamble")
            .with_event_tx(&tx);

        let outcome = run_session(&session, "say hi").await.unwrap();
        assert_eq!(outcome.state, LoopState::Done);
        assert_eq!(outcome.summary.as_deref(), Some("All done"));
        assert_eq!(outcome.steps, 1);
        assert_eq!(outcome.conversation.len(), 3);
        assert_eq!(llm.seen_lengths(), vec![1, 3]);
        assert_eq!(
            outcome.conversation.turns()[0],
            ConversationTurn::user("Preamble\n\nUser request: say hi")
        );
        assert_eq!(
            outcome.conversation.turns()[2],
            ConversationTurn::user(
                "Tool result:\nhi\n\nContinue with the next step or provide a final summary if done."
            )
        );

        drop(tx);
        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        assert!(events.contains(&SessionEvent::Observation {
            tool: "echo".to_string(),
            preview: "hi".to_string()
        }));
        assert_eq!(
            events.last(),
            Some(&SessionEvent::FinalText { text: "All done".to_string() })
        );
    }

    #[tokio::test]
    async fn test_empty_response_finishes_without_summary() {
        let (_, planner, registry, executor) = fixtures(vec![vec![]]).await;
        let recovery = RecoveryEngine::new();
        let session = Session::new(&planner, &registry, &executor, &recovery, CancellationToken::new());
        let outcome = run_session(&session, "anything").await.unwrap();
        assert_eq!(outcome.state, LoopState::Done);
        assert!(outcome.summary.is_none());
        assert_eq!(outcome.steps, 0);
    }

    #[tokio::test]
    async fn test_zero_max_steps_aborts_on_first_call() {
        let (_, planner, registry, executor) = fixtures(vec![echo_call("x")]).await;
        let recovery = RecoveryEngine::new();
        let session = Session::new(&planner, &registry, &executor, &recovery, CancellationToken::new())
            .with_max_steps(0);
        let outcome = run_session(&session, "anything").await.unwrap();
        assert_eq!(outcome.state, LoopState::Aborted);
        assert_eq!(outcome.steps, 0);
        assert_eq!(outcome.conversation.len(), 1);
    }

    #[test]
    fn test_preview_truncates() {
        let long = "a".repeat(300);
        let p = preview(&long);
        assert_eq!(p.chars().count(), OBSERVATION_PREVIEW_CHARS + 3);
        assert_eq!(preview("short"), "short");
    }
}
