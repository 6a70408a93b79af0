//! 编排层：Planner、提示词、过程事件与主循环

pub mod events;
pub mod loop_;
pub mod planner;
pub mod prompt;

pub use events::SessionEvent;
pub use loop_::{run_session, Session, SessionOutcome, DEFAULT_MAX_STEPS};
pub use planner::{classify_parts, Planner, PlannerResponse, ToolCallRequest};
pub use prompt::{load_system_prompt, seed_text, tool_result_feedback, DEFAULT_SYSTEM_PROMPT};
