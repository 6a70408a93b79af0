//! Bee MCP - 由 LLM 规划、经 MCP 调用浏览器工具的自动化智能体
//!
//! 模块划分：
//! - **agent**: 无头会话运行时（凭据校验、工具后端启动、单指令执行）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、循环状态、会话监管
//! - **llm**: LLM 客户端抽象与实现（Gemini / Mock / Scripted）
//! - **memory**: 只追加的会话日志
//! - **observability**: 日志初始化
//! - **react**: Planner、提示词、编排主循环
//! - **tools**: 工具提供方（MCP stdio / 进程内）、Schema 清洗、声明表与执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;
