//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BEE__*` 覆盖（双下划线表示嵌套，如 `BEE__APP__MAX_STEPS=10`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::llm::GEMINI_DEFAULT_MODEL;

/// Gemini API Key 所在的环境变量
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub mcp: McpSection,
    pub tools: ToolsSection,
}

/// [app] 段：应用名、步数上限、系统提示词覆盖
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 单次会话最多执行的工具调用数
    pub max_steps: usize,
    /// 覆盖内置的系统提示词
    pub system_prompt: Option<String>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            max_steps: 50,
            system_prompt: None,
        }
    }
}

/// [llm] 段：后端选择、模型与凭据
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：gemini / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时读取环境变量 GEMINI_API_KEY
    pub api_key: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: GEMINI_DEFAULT_MODEL.to_string(),
            base_url: None,
            api_key: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

impl LlmSection {
    /// 配置优先，其次环境变量；空串视为未设置
    pub fn resolve_api_key(&self) -> Option<String> {
        let non_blank = |k: &String| !k.trim().is_empty();
        self.api_key
            .clone()
            .filter(non_blank)
            .or_else(|| std::env::var(GEMINI_API_KEY_ENV).ok().filter(non_blank))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次 HTTP 请求超时（秒），由 HTTP 客户端执行
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [mcp] 段：MCP 服务端启动命令
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct McpSection {
    /// 未设置时使用平台对应的 npx
    pub command: Option<String>,
    pub args: Vec<String>,
    /// 隐藏浏览器窗口
    pub headless: bool,
    /// 额外传给服务端进程的环境变量（`[[mcp.env]]` 列表，变量名保持原样大小写）
    pub env: Vec<EnvVar>,
    /// initialize 握手中上报的客户端名
    pub client_name: String,
}

impl Default for McpSection {
    fn default() -> Self {
        Self {
            command: None,
            args: vec!["@playwright/mcp@latest".to_string()],
            headless: false,
            env: Vec::new(),
            client_name: "bee-mcp".to_string(),
        }
    }
}

/// 单个环境变量；配置加载会把表的键转为小写，所以名字放在值里
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// [tools] 段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒），0 表示不限时
    pub tool_timeout_secs: u64,
}

/// 从 config 目录加载配置，环境变量 BEE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 BEE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!("Config file {} not found, ignoring", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BEE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
