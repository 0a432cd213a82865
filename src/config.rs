//! Gateway 配置加载
//!
//! 读取 ~/.taskflow/config.toml 的 `[chat]` 段，环境变量优先级更高：
//! `TASKFLOW_API_KEY` / `TASKFLOW_GATEWAY_URL` / `TASKFLOW_MODEL`。
//! 缺少 api_key 不是启动错误——只有 chat 请求到达时才致命。

use std::path::Path;

use serde::Deserialize;

use crate::storage::taskflow_dir;

/// 默认 AI gateway 地址
pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
/// 默认模型
pub const DEFAULT_MODEL: &str = "google/gemini-3-flash-preview";

/// chat 子系统配置
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub gateway_url: String,
    pub model: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// config.toml 的文件形态
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    chat: ChatSection,
}

#[derive(Debug, Default, Deserialize)]
struct ChatSection {
    api_key: Option<String>,
    gateway_url: Option<String>,
    model: Option<String>,
}

impl ChatConfig {
    /// 加载配置：文件（若存在）+ 环境变量覆盖
    pub fn load() -> Self {
        let path = taskflow_dir().join("config.toml");
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Self {
        let file = std::fs::read_to_string(path)
            .ok()
            .and_then(|content| match toml::from_str::<ConfigFile>(&content) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    eprintln!("[config] Failed to parse {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();

        let mut config = ChatConfig {
            api_key: file.chat.api_key,
            gateway_url: file.chat.gateway_url.unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
            model: file.chat.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        if let Ok(key) = std::env::var("TASKFLOW_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("TASKFLOW_GATEWAY_URL") {
            if !url.is_empty() {
                config.gateway_url = url;
            }
        }
        if let Ok(model) = std::env::var("TASKFLOW_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }

        config
    }
}
