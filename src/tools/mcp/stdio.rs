//! 以子进程方式运行的 MCP 服务端
//!
//! 默认启动 `npx @playwright/mcp@latest`（Windows 上为 npx.cmd），通过 stdin/stdout 交换 JSON-RPC，
//! stderr 逐行转发到日志。子进程随 Provider 一起结束（kill_on_drop）。

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use super::{McpClient, McpError};
use crate::config::McpSection;
use crate::tools::provider::{ProviderError, ToolDescriptor, ToolOutput, ToolProvider};

/// 跨平台的 npx 启动器名
pub fn npx_command() -> &'static str {
    if cfg!(windows) {
        "npx.cmd"
    } else {
        "npx"
    }
}

/// 服务端参数：无头模式追加 --headless（已存在则不重复）
pub fn server_args(cfg: &McpSection) -> Vec<String> {
    let mut args = cfg.args.clone();
    if cfg.headless && !args.iter().any(|a| a == "--headless") {
        args.push("--headless".to_string());
    }
    args
}

/// 组装子进程命令：stdio 管道、参数与环境变量
fn server_command(command: &str, cfg: &McpSection) -> Command {
    let mut cmd = Command::new(command);
    cmd.args(server_args(cfg))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if !cfg.headless {
        cmd.env_remove("PLAYWRIGHT_HEADLESS");
    }
    cmd.envs(cfg.env.iter().map(|var| (&var.name, &var.value)));
    cmd
}

pub struct McpStdioProvider {
    client: McpClient,
    child: Mutex<Child>,
}

impl McpStdioProvider {
    /// 启动子进程并完成 initialize 握手
    pub async fn spawn(cfg: &McpSection) -> Result<Self, McpError> {
        let command = cfg
            .command
            .clone()
            .unwrap_or_else(|| npx_command().to_string());
        let args = server_args(cfg);
        tracing::info!(
            command = %command,
            args = ?args,
            mode = if cfg.headless { "headless" } else { "headed" },
            "Starting MCP server"
        );

        let mut cmd = server_command(&command, cfg);
        let mut child = cmd.spawn().map_err(|source| McpError::Spawn {
            command: command.clone(),
            source,
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Protocol("MCP server stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Protocol("MCP server stdout unavailable".to_string()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        tracing::debug!("mcp-server stderr: {}", line);
                    }
                }
            });
        }

        let client = McpClient::start(stdout, stdin);
        tracing::info!("Initializing MCP session...");
        let init = client
            .initialize(&cfg.client_name, env!("CARGO_PKG_VERSION"))
            .await?;
        if let Some(info) = &init.server_info {
            tracing::info!(server = %info.name, version = %info.version, "Connected to MCP server");
        }

        Ok(Self {
            client,
            child: Mutex::new(child),
        })
    }

    /// 结束子进程（浏览器随之关闭）
    pub async fn shutdown(&self) {
        let mut child = self.child.lock().await;
        if let Err(e) = child.kill().await {
            tracing::debug!("MCP server already exited: {}", e);
        }
    }
}

#[async_trait]
impl ToolProvider for McpStdioProvider {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ProviderError> {
        Ok(self.client.list_tools().await?)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ProviderError> {
        let result = self.client.call_tool(name, arguments).await?;
        Ok(ToolOutput {
            text: result.text(),
            is_error: result.is_error(),
        })
    }
}
