//! 核心层：错误与恢复、循环状态、会话监管

pub mod error;
pub mod recovery;
pub mod session_supervisor;
pub mod state;

pub use error::{AgentError, RecoveryAction};
pub use recovery::RecoveryEngine;
pub use session_supervisor::SessionSupervisor;
pub use state::LoopState;
