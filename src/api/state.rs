//! Web API server 的共享状态
//!
//! 每个 server 实例一份：任务 store + gateway 客户端。
//! handler 本身无状态，并发 chat 请求相互独立。

use std::sync::Arc;

use crate::chat::GatewayClient;
use crate::config::ChatConfig;
use crate::error::Result;
use crate::store::TaskStore;

pub struct AppState {
    pub store: TaskStore,
    pub gateway: GatewayClient,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(store: TaskStore, config: ChatConfig) -> Result<Self> {
        Ok(Self {
            store,
            gateway: GatewayClient::new(config)?,
        })
    }
}
