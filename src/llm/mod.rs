//! LLM 层：客户端抽象与实现（Gemini / Mock / Scripted）

pub mod gemini;
pub mod mock;
pub mod traits;

pub use gemini::{build_request_body, GeminiClient, TokenUsage, GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use traits::{LlmClient, LlmError};
