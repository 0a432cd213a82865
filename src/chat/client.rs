//! AI gateway 客户端（OpenAI 兼容 chat-completions 接口）
//!
//! `ChatModel` 是 orchestrator 消费的最小接口；`GatewayClient` 是
//! reqwest 实现。429 映射为独立的 `RateLimited` 错误，其余上游失败
//! 统一为 `Upstream`。客户端不做重试——受控的重试只发生在
//! orchestrator 的 tool-result 反馈循环里。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ChatConfig;
use crate::error::{Result, TaskFlowError};
use crate::model::ChatMessage;

/// 请求超时。传输层之外的显式上限，避免挂死的 gateway 拖住请求。
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// 会话内的 wire 消息（比 `ChatMessage` 多出 system/tool 角色与 tool 字段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl WireMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// tool 执行结果，回填给模型
    pub fn tool_result(call_id: &str, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(call_id.to_string()),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|c| !c.is_empty())
    }
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: Some(msg.content.clone()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// 模型发出的 tool 调用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub function: FunctionCall,
}

/// tool 调用的函数名与 JSON 编码的参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

/// orchestrator 消费的模型接口
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 发送完整会话 + tool schema，返回 assistant 消息
    async fn complete(&self, messages: &[WireMessage], tools: &Value) -> Result<WireMessage>;
}

/// reqwest 实现
pub struct GatewayClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl GatewayClient {
    pub fn new(config: ChatConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TaskFlowError::upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| TaskFlowError::config("TASKFLOW_API_KEY is not configured"))
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let key = self.api_key()?;
        let response = self
            .http
            .post(&self.config.gateway_url)
            .bearer_auth(key)
            .json(body)
            .send()
            .await
            .map_err(|e| TaskFlowError::upstream(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TaskFlowError::RateLimited);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            eprintln!("[chat] AI gateway error: {status} {text}");
            return Err(TaskFlowError::upstream(format!("gateway returned {status}")));
        }

        Ok(response)
    }

    /// 流式 completion（不带 tools），返回 SSE 字节流响应
    pub async fn stream(&self, messages: &[WireMessage]) -> Result<reqwest::Response> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
        });
        self.send(&body).await
    }
}

#[async_trait]
impl ChatModel for GatewayClient {
    async fn complete(&self, messages: &[WireMessage], tools: &Value) -> Result<WireMessage> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "tools": tools,
            "stream": false,
        });

        let response = self.send(&body).await?;
        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| TaskFlowError::upstream(format!("bad gateway response: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| TaskFlowError::upstream("gateway response has no choices"))
    }
}
