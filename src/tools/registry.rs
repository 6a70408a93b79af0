//! 工具声明表
//!
//! 会话开始时从 ToolProvider 发现工具，清洗参数 Schema 后得到 Planner 可用的 ToolDeclaration；
//! 声明表此后只读，按名称查找，按发现顺序输出给 Planner。

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::tools::provider::{ToolDescriptor, ToolProvider};
use crate::tools::schema::{clean_schema, empty_object_schema};

/// Planner 可消费的工具声明（Gemini FunctionDeclaration）
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDeclaration {
    /// 由原始描述构建：缺省描述为空串，缺省 Schema 为空对象，Schema 经清洗
    pub fn from_descriptor(descriptor: &ToolDescriptor) -> Self {
        let parameters = descriptor
            .input_schema
            .as_ref()
            .map(clean_schema)
            .unwrap_or_else(empty_object_schema);
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone().unwrap_or_default(),
            parameters,
        }
    }
}

/// 会话级工具声明表：保持发现顺序，名称唯一
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    declarations: Vec<ToolDeclaration>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从提供方发现工具；提供方不可达属于启动期致命错误，不重试
    pub async fn discover(provider: &dyn ToolProvider) -> Result<Self, AgentError> {
        let descriptors = provider
            .list_tools()
            .await
            .map_err(|e| AgentError::Discovery(e.to_string()))?;
        let registry = Self::from_descriptors(&descriptors);
        tracing::info!(count = registry.len(), "Discovered tools");
        Ok(registry)
    }

    pub fn from_descriptors(descriptors: &[ToolDescriptor]) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.insert(ToolDeclaration::from_descriptor(descriptor));
        }
        registry
    }

    /// 同名工具只保留第一个
    fn insert(&mut self, declaration: ToolDeclaration) {
        if self.index.contains_key(&declaration.name) {
            tracing::warn!(tool = %declaration.name, "Duplicate tool name ignored");
            return;
        }
        self.index
            .insert(declaration.name.clone(), self.declarations.len());
        self.declarations.push(declaration);
    }

    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    pub fn get(&self, name: &str) -> Option<&ToolDeclaration> {
        self.index.get(name).map(|&i| &self.declarations[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.declarations.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}
