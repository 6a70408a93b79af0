//! 提示词：系统前言、种子回合与工具结果反馈回合的文本格式

use crate::tools::ToolResult;

/// 内置系统前言（config/prompts/system.txt 不存在且未配置覆盖时使用）
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a browser automation agent with access to Playwright browser tools. \
Use browser_navigate to open URLs. \
Use browser_snapshot to view page content. \
Use browser_click to click elements. \
Use browser_type to enter text. \
Use browser_screenshot to capture images. \
Always provide a friendly summary of what you did.";

const PROMPT_FILES: [&str; 2] = ["config/prompts/system.txt", "../config/prompts/system.txt"];

/// 解析系统前言：配置覆盖 > 提示词文件 > 内置文本
pub fn load_system_prompt(override_prompt: Option<&str>) -> String {
    if let Some(p) = override_prompt.filter(|p| !p.trim().is_empty()) {
        return p.to_string();
    }
    PROMPT_FILES
        .iter()
        .find_map(|path| std::fs::read_to_string(path).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string())
}

/// 会话的第一个回合：前言 + 用户请求
pub fn seed_text(system_prompt: &str, instruction: &str) -> String {
    format!("{}\n\nUser request: {}", system_prompt, instruction)
}

/// 工具结果转为下一轮的用户回合（失败也照常回报）
pub fn tool_result_feedback(result: &ToolResult) -> String {
    if result.succeeded {
        format!(
            "Tool result:\n{}\n\nContinue with the next step or provide a final summary if done.",
            result.text
        )
    } else {
        format!(
            "Error occurred: {}\n\nTry a different approach or provide a summary.",
            result.text
        )
    }
}
