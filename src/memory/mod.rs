//! 记忆层：单次会话内的只追加对话日志（不跨会话持久化）

pub mod conversation;

pub use conversation::{Conversation, ConversationTurn, FunctionCall, Part, Role};
