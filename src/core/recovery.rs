//! 错误恢复引擎
//!
//! 根据 AgentError 返回 RecoveryAction：工具失败回报给 Planner（不自动重试同一调用），其余错误终止会话。

use crate::core::{AgentError, RecoveryAction};

#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::ToolExecutionFailed(msg) => RecoveryAction::ReportToPlanner(msg.clone()),
            AgentError::ToolTimeout(tool) => {
                RecoveryAction::ReportToPlanner(format!("tool '{tool}' timed out"))
            }
            _ => RecoveryAction::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    #[test]
    fn test_recovery_tool_failure() {
        let engine = RecoveryEngine::new();
        let err = AgentError::ToolExecutionFailed("element not found".to_string());
        assert_eq!(
            engine.handle(&err),
            RecoveryAction::ReportToPlanner("element not found".to_string())
        );
    }

    #[test]
    fn test_recovery_tool_timeout() {
        let engine = RecoveryEngine::new();
        let err = AgentError::ToolTimeout("browser_navigate".to_string());
        match engine.handle(&err) {
            RecoveryAction::ReportToPlanner(msg) => assert!(msg.contains("browser_navigate")),
            other => panic!("Expected ReportToPlanner, got {:?}", other),
        }
    }

    #[test]
    fn test_recovery_llm_error_aborts() {
        let engine = RecoveryEngine::new();
        let err = AgentError::LlmError(LlmError::RateLimited { retry_after_ms: 1000 });
        assert_eq!(engine.handle(&err), RecoveryAction::Abort);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_recovery_cancelled_aborts() {
        let engine = RecoveryEngine::new();
        assert_eq!(engine.handle(&AgentError::Cancelled), RecoveryAction::Abort);
    }

    #[test]
    fn test_recovery_discovery_aborts() {
        let engine = RecoveryEngine::new();
        let err = AgentError::Discovery("connection refused".to_string());
        assert_eq!(engine.handle(&err), RecoveryAction::Abort);
        assert!(!AgentError::ToolTimeout("x".into()).is_fatal());
    }
}
