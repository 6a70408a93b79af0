//! Gemini generateContent 客户端
//!
//! 通过 REST 调用 `models/{model}:generateContent`：对话回合映射为 contents，工具声明映射为
//! tools[0].functionDeclarations，functionCallingConfig 固定为 AUTO。只取第一个候选的片段。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::{LlmClient, LlmError};
use crate::memory::{ConversationTurn, Part};
use crate::tools::ToolDeclaration;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// 错误正文在错误信息中保留的最大字符数
const ERROR_BODY_PREVIEW_CHARS: usize = 500;

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

/// Gemini 客户端：持有 HTTP Client、模型名与 API Key
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    pub usage: TokenUsage,
}

impl GeminiClient {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: &str,
        request_timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(GEMINI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            usage: TokenUsage::new(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// 工具声明转 functionDeclaration；properties 为空的对象 Schema 不下发（Gemini 拒绝空 OBJECT）
fn function_declaration(decl: &ToolDeclaration) -> Value {
    let has_properties = decl
        .parameters
        .get("properties")
        .and_then(|p| p.as_object())
        .map_or(false, |p| !p.is_empty());
    if has_properties {
        json!({
            "name": decl.name,
            "description": decl.description,
            "parameters": decl.parameters,
        })
    } else {
        json!({
            "name": decl.name,
            "description": decl.description,
        })
    }
}

/// 构造 generateContent 请求体
pub fn build_request_body(turns: &[ConversationTurn], tools: &[ToolDeclaration]) -> Value {
    let contents: Vec<Value> = turns
        .iter()
        .map(|turn| {
            json!({
                "role": turn.role(),
                "parts": turn.parts(),
            })
        })
        .collect();

    let mut body = json!({ "contents": contents });
    if !tools.is_empty() {
        let declarations: Vec<Value> = tools.iter().map(function_declaration).collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
        body["toolConfig"] = json!({ "functionCallingConfig": { "mode": "AUTO" } });
    }
    body
}

/// 解析响应：取第一个候选的片段，并返回 (prompt, completion) token 数
fn parse_response(response: GenerateContentResponse) -> (Vec<Part>, Option<(u64, u64)>) {
    let usage = response
        .usage_metadata
        .map(|u| (u.prompt_token_count, u.candidates_token_count));
    let Some(candidate) = response.candidates.into_iter().next() else {
        tracing::warn!(feedback = ?response.prompt_feedback, "No candidates in Gemini response");
        return (Vec::new(), usage);
    };
    if let Some(reason) = &candidate.finish_reason {
        tracing::debug!(finish_reason = %reason, "Gemini candidate finished");
    }
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    (parts, usage)
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_CHARS {
        format!(
            "{}...",
            body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect::<String>()
        )
    } else {
        body.to_string()
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn generate(
        &self,
        turns: &[ConversationTurn],
        tools: &[ToolDeclaration],
    ) -> Result<Vec<Part>, LlmError> {
        let body = build_request_body(turns, tools);
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(0);
            return Err(LlmError::RateLimited { retry_after_ms });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(format!(
                "HTTP {}: {}",
                status,
                truncate_body(&text)
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let (parts, usage) = parse_response(parsed);
        if let Some((prompt, completion)) = usage {
            self.usage.add(prompt, completion);
        }
        Ok(parts)
    }
}
