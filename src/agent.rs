//! 无头会话运行时
//!
//! run_instruction 对单条指令完成一次完整会话：校验凭据并创建 LLM，启动工具后端（MCP 子进程或
//! Mock 模式下的进程内工具），发现工具，跑主循环，最后关闭后端。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, GEMINI_API_KEY_ENV};
use crate::core::{AgentError, RecoveryEngine};
use crate::llm::{GeminiClient, LlmClient, MockLlmClient};
use crate::react::{load_system_prompt, run_session, Planner, Session, SessionEvent, SessionOutcome};
use crate::tools::{
    EchoTool, LocalToolProvider, McpStdioProvider, ToolExecutor, ToolProvider, ToolRegistry,
};

pub const PROVIDER_GEMINI: &str = "gemini";
pub const PROVIDER_MOCK: &str = "mock";

pub fn is_mock(cfg: &AppConfig) -> bool {
    cfg.llm.provider.eq_ignore_ascii_case(PROVIDER_MOCK)
}

/// 按 [llm].provider 创建客户端；gemini 缺少 API Key 时返回 MissingCredential
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, AgentError> {
    match cfg.llm.provider.to_lowercase().as_str() {
        PROVIDER_MOCK => {
            tracing::warn!("Using Mock LLM, no requests leave this process");
            Ok(Arc::new(MockLlmClient))
        }
        PROVIDER_GEMINI => {
            let api_key = cfg
                .llm
                .resolve_api_key()
                .ok_or_else(|| AgentError::MissingCredential(GEMINI_API_KEY_ENV.to_string()))?;
            tracing::info!("Using Gemini LLM ({})", cfg.llm.model);
            let client = GeminiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                &api_key,
                cfg.llm.timeouts.request,
            )?;
            Ok(Arc::new(client))
        }
        other => Err(AgentError::ConfigError(format!(
            "unknown llm provider '{}' (expected '{}' or '{}')",
            other, PROVIDER_GEMINI, PROVIDER_MOCK
        ))),
    }
}

/// 在已启动的工具后端上发现工具并运行一次会话
pub async fn run_with_provider(
    cfg: &AppConfig,
    llm: Arc<dyn LlmClient>,
    provider: Arc<dyn ToolProvider>,
    instruction: &str,
    cancel: CancellationToken,
    event_tx: Option<&UnboundedSender<SessionEvent>>,
) -> Result<SessionOutcome, AgentError> {
    let registry = ToolRegistry::discover(provider.as_ref()).await?;
    if registry.is_empty() {
        tracing::warn!("Tool provider exposes no tools, the planner can only answer in text");
    }
    tracing::debug!(tools = ?registry.tool_names(), "Available tools");

    let planner = Planner::new(llm);
    let executor = ToolExecutor::new(provider, cfg.tools.tool_timeout_secs);
    let recovery = RecoveryEngine::new();
    let system_prompt = load_system_prompt(cfg.app.system_prompt.as_deref());

    let mut session = Session::new(&planner, &registry, &executor, &recovery, cancel)
        .with_max_steps(cfg.app.max_steps)
        .with_system_prompt(&system_prompt);
    if let Some(tx) = event_tx {
        session = session.with_event_tx(tx);
    }

    let outcome = run_session(&session, instruction).await?;
    let (prompt_tokens, completion_tokens, total_tokens) = planner.token_usage();
    tracing::info!(
        state = %outcome.state,
        steps = outcome.steps,
        prompt_tokens,
        completion_tokens,
        total_tokens,
        "Session finished"
    );
    Ok(outcome)
}

/// 运行一条指令：凭据在启动工具后端之前校验
pub async fn run_instruction(
    cfg: &AppConfig,
    instruction: &str,
    cancel: CancellationToken,
    event_tx: Option<&UnboundedSender<SessionEvent>>,
) -> Result<SessionOutcome, AgentError> {
    let llm = create_llm_from_config(cfg)?;

    if is_mock(cfg) {
        let provider: Arc<dyn ToolProvider> =
            Arc::new(LocalToolProvider::new().with_tool(EchoTool));
        return run_with_provider(cfg, llm, provider, instruction, cancel, event_tx).await;
    }

    let mcp = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AgentError::Cancelled),
        r = McpStdioProvider::spawn(&cfg.mcp) => {
            r.map_err(|e| AgentError::Discovery(e.to_string()))?
        }
    };
    let mcp = Arc::new(mcp);
    let result = run_with_provider(cfg, llm, mcp.clone(), instruction, cancel, event_tx).await;
    tracing::info!("Closing MCP server");
    mcp.shutdown().await;
    result
}
