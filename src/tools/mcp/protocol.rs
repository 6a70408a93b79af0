//! MCP 消息结构（JSON-RPC 2.0，按行分隔）

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::provider::ToolDescriptor;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// JSON-RPC method not found
pub const ERROR_METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct RpcNotification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct RpcErrorReply {
    pub jsonrpc: &'static str,
    pub id: Value,
    pub error: RpcErrorObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// 服务端发来的任意一行：响应、通知或服务端请求
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug)]
pub enum IncomingKind {
    Response {
        id: u64,
        outcome: Result<Value, RpcErrorObject>,
    },
    Notification {
        method: String,
    },
    ServerRequest {
        id: Value,
        method: String,
    },
    Invalid,
}

impl IncomingMessage {
    pub fn classify(self) -> IncomingKind {
        match (self.id, self.method) {
            (Some(id), Some(method)) => IncomingKind::ServerRequest { id, method },
            (None, Some(method)) => IncomingKind::Notification { method },
            (Some(id), None) => match id.as_u64() {
                Some(id) => {
                    let outcome = match self.error {
                        Some(err) => Err(err),
                        None => Ok(self.result.unwrap_or(Value::Null)),
                    };
                    IncomingKind::Response { id, outcome }
                }
                None => IncomingKind::Invalid,
            },
            (None, None) => IncomingKind::Invalid,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams<'a> {
    pub protocol_version: &'static str,
    pub capabilities: Value,
    pub client_info: Implementation<'a>,
}

#[derive(Debug, Serialize)]
pub struct Implementation<'a> {
    pub name: &'a str,
    pub version: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsListResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallToolParams<'a> {
    pub name: &'a str,
    pub arguments: Map<String, Value>,
}

/// tools/call 返回的内容项；只关心文本，其余类型（image / resource）跳过
#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    /// 每个带 text 的内容项贡献 `text + "\n"`，按顺序拼接
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|item| item.text.as_deref())
            .fold(String::new(), |mut acc, t| {
                acc.push_str(t);
                acc.push('\n');
                acc
            })
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> IncomingKind {
        serde_json::from_value::<IncomingMessage>(v).unwrap().classify()
    }

    #[test]
    fn test_classify_response() {
        match parse(json!({"jsonrpc": "2.0", "id": 3, "result": {"tools": []}})) {
            IncomingKind::Response { id, outcome } => {
                assert_eq!(id, 3);
                assert_eq!(outcome.unwrap(), json!({"tools": []}));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_error_response() {
        match parse(json!({"jsonrpc": "2.0", "id": 4, "error": {"code": -32602, "message": "bad params"}})) {
            IncomingKind::Response { outcome: Err(e), .. } => {
                assert_eq!(e.code, -32602);
                assert_eq!(e.message, "bad params");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_notification_and_request() {
        assert!(matches!(
            parse(json!({"jsonrpc": "2.0", "method": "notifications/message", "params": {}})),
            IncomingKind::Notification { ref method } if method == "notifications/message"
        ));
        assert!(matches!(
            parse(json!({"jsonrpc": "2.0", "id": "srv-1", "method": "roots/list"})),
            IncomingKind::ServerRequest { ref method, .. } if method == "roots/list"
        ));
        assert!(matches!(parse(json!({"jsonrpc": "2.0", "id": null})), IncomingKind::Invalid));
    }

    #[test]
    fn test_call_result_text() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Navigated to https://example.com"},
                {"type": "image", "data": "aGVsbG8=", "mimeType": "image/png"},
                {"type": "text", "text": "Page title: Example Domain"}
            ]
        }))
        .unwrap();
        assert_eq!(
            result.text(),
            "Navigated to https://example.com\nPage title: Example Domain\n"
        );
        assert!(!result.is_error());
    }

    #[test]
    fn test_call_result_error_flag() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "Error: Ref e12 not found in the current page snapshot"}],
            "isError": true
        }))
        .unwrap();
        assert!(result.is_error());
        assert_eq!(
            result.text(),
            "Error: Ref e12 not found in the current page snapshot\n"
        );

        let explicit_ok: CallToolResult =
            serde_json::from_value(json!({"content": [], "isError": false})).unwrap();
        assert!(!explicit_ok.is_error());
    }

    #[test]
    fn test_tools_list_parses_descriptors() {
        let result: ToolsListResult = serde_json::from_value(json!({
            "tools": [{
                "name": "browser_navigate",
                "description": "Navigate to a URL",
                "inputSchema": {"type": "object", "properties": {"url": {"type": "string"}}}
            }],
            "nextCursor": "page-2"
        }))
        .unwrap();
        assert_eq!(result.tools[0].name, "browser_navigate");
        assert!(result.tools[0].input_schema.is_some());
        assert_eq!(result.next_cursor.as_deref(), Some("page-2"));
    }
}
