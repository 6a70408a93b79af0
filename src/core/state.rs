//! 编排循环状态机的状态定义
//!
//! Init -> AwaitingPlan -> (ExecutingTool -> AwaitingPlan)* -> Done | Aborted

use std::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// 尚未写入种子回合
    Init,
    /// 等待 Planner 给出下一步
    AwaitingPlan,
    /// 正在执行工具调用
    ExecutingTool,
    /// Planner 给出最终文本（或空回复），正常结束
    Done,
    /// 步数预算耗尽时 Planner 仍在请求工具调用
    Aborted,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// 状态机允许的迁移；终止状态没有出边
    pub fn can_transition_to(self, next: LoopState) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::AwaitingPlan)
                | (Self::AwaitingPlan, Self::ExecutingTool)
                | (Self::AwaitingPlan, Self::Done)
                | (Self::AwaitingPlan, Self::Aborted)
                | (Self::ExecutingTool, Self::AwaitingPlan)
        )
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "INIT",
            Self::AwaitingPlan => "AWAITING_PLAN",
            Self::ExecutingTool => "EXECUTING_TOOL",
            Self::Done => "DONE",
            Self::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}
