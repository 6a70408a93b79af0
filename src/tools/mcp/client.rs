//! MCP 客户端：按行分隔的 JSON-RPC 2.0
//!
//! 对任意 AsyncRead / AsyncWrite 工作（子进程 stdio 或测试中的 duplex 管道）。后台任务逐行读取，
//! 按 id 把响应交给等待中的请求；连接关闭时所有等待中的请求以 Closed 失败。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use super::protocol::{
    CallToolParams, CallToolResult, Implementation, IncomingKind, IncomingMessage,
    InitializeParams, InitializeResult, RpcErrorObject, RpcErrorReply, RpcNotification,
    RpcRequest, ToolsListResult, ERROR_METHOD_NOT_FOUND, JSONRPC_VERSION, METHOD_INITIALIZE,
    METHOD_INITIALIZED, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, PROTOCOL_VERSION,
};
use super::McpError;
use crate::tools::provider::ToolDescriptor;

type ResponseWaiter = oneshot::Sender<Result<Value, McpError>>;
type Pending = Arc<std::sync::Mutex<HashMap<u64, ResponseWaiter>>>;
type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

pub struct McpClient {
    writer: SharedWriter,
    pending: Pending,
    next_id: AtomicU64,
    closed: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
}

impl McpClient {
    pub fn start<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: SharedWriter = Arc::new(Mutex::new(Box::new(writer)));
        let pending: Pending = Arc::new(std::sync::Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let reader_task = tokio::spawn(read_loop(
            reader,
            writer.clone(),
            pending.clone(),
            closed.clone(),
        ));

        Self {
            writer,
            pending,
            next_id: AtomicU64::new(1),
            closed,
            reader_task,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 发送请求并等待对应 id 的响应
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        lock_pending(&self.pending).insert(id, tx);
        // 无论正常返回、出错还是调用方放弃等待，都移除该 id
        let _entry = PendingEntry {
            pending: self.pending.clone(),
            id,
        };

        // 读循环先置 closed 再清空 pending，故插入后检查即可避免永久等待
        if self.is_closed() {
            return Err(McpError::Closed);
        }

        let line = serde_json::to_string(&RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        })?;
        tracing::debug!(id, method, "MCP request");
        write_line(&self.writer, &line).await?;

        rx.await.map_err(|_| McpError::Closed)?
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let line = serde_json::to_string(&RpcNotification {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        })?;
        write_line(&self.writer, &line).await
    }

    /// initialize 握手，随后发送 notifications/initialized
    pub async fn initialize(
        &self,
        client_name: &str,
        client_version: &str,
    ) -> Result<InitializeResult, McpError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION,
            capabilities: serde_json::json!({}),
            client_info: Implementation {
                name: client_name,
                version: client_version,
            },
        };
        let result = self
            .request(METHOD_INITIALIZE, Some(serde_json::to_value(params)?))
            .await?;
        let result: InitializeResult = serde_json::from_value(result)?;
        self.notify(METHOD_INITIALIZED, None).await?;
        Ok(result)
    }

    /// tools/list，跟随 nextCursor 取完所有分页
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let page: ToolsListResult =
                serde_json::from_value(self.request(METHOD_TOOLS_LIST, params).await?)?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(McpError::Protocol(format!(
                        "tools/list returned the same cursor twice: {next}"
                    )));
                }
                Some(next) => cursor = Some(next),
                None => return Ok(tools),
            }
        }
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, McpError> {
        let params = serde_json::to_value(CallToolParams { name, arguments })?;
        let result = self.request(METHOD_TOOLS_CALL, Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }
}

fn lock_pending(pending: &Pending) -> std::sync::MutexGuard<'_, HashMap<u64, ResponseWaiter>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 请求 future 被丢弃（如会话取消）时清理等待表中的条目
struct PendingEntry {
    pending: Pending,
    id: u64,
}

impl Drop for PendingEntry {
    fn drop(&mut self) {
        lock_pending(&self.pending).remove(&self.id);
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn write_line(writer: &SharedWriter, line: &str) -> Result<(), McpError> {
    let mut w = writer.lock().await;
    w.write_all(line.as_bytes()).await?;
    w.write_all(b"\n").await?;
    w.flush().await?;
    Ok(())
}

async fn read_loop<R>(reader: R, writer: SharedWriter, pending: Pending, closed: Arc<AtomicBool>)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_line(&line, &writer, &pending).await,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("MCP read error: {}", e);
                break;
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    let waiters: Vec<ResponseWaiter> = lock_pending(&pending).drain().map(|(_, w)| w).collect();
    for waiter in waiters {
        let _ = waiter.send(Err(McpError::Closed));
    }
    tracing::debug!("MCP connection closed");
}

async fn handle_line(line: &str, writer: &SharedWriter, pending: &Pending) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let message: IncomingMessage = match serde_json::from_str(line) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("MCP stdout parse error: {} line={}", e, line);
            return;
        }
    };

    match message.classify() {
        IncomingKind::Response { id, outcome } => {
            let waiter = lock_pending(pending).remove(&id);
            match waiter {
                Some(waiter) => {
                    let _ = waiter.send(outcome.map_err(|e| McpError::Rpc {
                        code: e.code,
                        message: e.message,
                    }));
                }
                None => tracing::warn!("Received response for unknown request ID: {}", id),
            }
        }
        IncomingKind::Notification { method } => {
            tracing::debug!("Received MCP notification: method={}", method);
        }
        IncomingKind::ServerRequest { id, method } => {
            tracing::warn!("Unsupported request from MCP server: method={}", method);
            let reply = RpcErrorReply {
                jsonrpc: JSONRPC_VERSION,
                id,
                error: RpcErrorObject {
                    code: ERROR_METHOD_NOT_FOUND,
                    message: format!("Method not found: {method}"),
                    data: None,
                },
            };
            if let Ok(line) = serde_json::to_string(&reply) {
                if let Err(e) = write_line(writer, &line).await {
                    tracing::warn!("Failed to reply to MCP server request: {}", e);
                }
            }
        }
        IncomingKind::Invalid => {
            tracing::warn!("Ignoring malformed MCP message: {}", line);
        }
    }
}
