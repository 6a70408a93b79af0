//! 会话状态：只追加的回合日志
//!
//! 每次调用 Planner 都携带完整日志；回合一经追加即不可修改，会话结束后整体丢弃（不持久化）。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 回合角色（与 Gemini contents.role 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// 模型请求的结构化工具调用（Gemini functionCall）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,
}

/// 模型原始回复中的一个片段：文本、工具调用，以及其它原样保留的字段（如 thoughtSignature）
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn function_call(name: impl Into<String>, args: Option<Map<String, Value>>) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                args,
            }),
            ..Self::default()
        }
    }
}

/// 单个回合：用户文本（指令或注入的反馈）或模型的原始回复片段
#[derive(Clone, Debug, PartialEq)]
pub enum ConversationTurn {
    UserText { text: String },
    ModelTurn { parts: Vec<Part> },
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::UserText { text: text.into() }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self::ModelTurn { parts }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::UserText { .. } => Role::User,
            Self::ModelTurn { .. } => Role::Model,
        }
    }

    /// 转为发给 LLM 的片段列表（UserText 包装为单个文本片段）
    pub fn parts(&self) -> Vec<Part> {
        match self {
            Self::UserText { text } => vec![Part::text(text.clone())],
            Self::ModelTurn { parts } => parts.clone(),
        }
    }
}

/// 会话日志：只提供追加与只读访问，不提供删除或修改
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
