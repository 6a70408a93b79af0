//! 会话监管：中断管理
//!
//! 持有 CancellationToken；用户 Ctrl+C 时取消，编排循环在当前挂起点（Planner 或工具调用）立即退出。
//! 已执行的工具副作用不会回滚。

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct SessionSupervisor {
    cancel_token: CancellationToken,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 触发取消（用户 Ctrl+C）
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// 后台等待 Ctrl+C 并触发取消
    pub fn cancel_on_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let token = self.cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted by user");
                token.cancel();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_propagates_to_clones() {
        let supervisor = SessionSupervisor::new();
        let token = supervisor.cancel_token();
        assert!(!token.is_cancelled());
        supervisor.cancel();
        assert!(token.is_cancelled());
        assert!(supervisor.is_cancelled());
    }
}
