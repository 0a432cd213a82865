//! 任务列表的单一可信来源
//!
//! 所有写操作经由存储协作方完成；本层不做乐观更新——
//! 每次成功的 mutation 只是让缓存失效，下一次读取重新拉取，
//! 展示态永远是存储在一次往返之后的真实内容。失败时不回滚
//! （因为从未发生本地写入），错误原样上抛给调用方。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Result, TaskFlowError};
use crate::model::{NewTask, Task, TaskPatch};
use crate::storage::TaskTable;

/// 任务列表的固定缓存 key
pub const TASKS_CACHE_KEY: &str = "tasks";

/// 带失效缓存的任务 store
pub struct TaskStore {
    table: Arc<dyn TaskTable>,
    cache: RwLock<HashMap<&'static str, Vec<Task>>>,
}

impl TaskStore {
    pub fn new(table: Arc<dyn TaskTable>) -> Self {
        Self {
            table,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// 列出全部任务（sort_order 升序）。命中缓存直接返回，
    /// 未命中时从存储拉取并写入缓存，成为所有消费方共享的读视图。
    pub async fn list(&self) -> Result<Vec<Task>> {
        if let Ok(cache) = self.cache.read() {
            if let Some(tasks) = cache.get(TASKS_CACHE_KEY) {
                return Ok(tasks.clone());
            }
        }

        let tasks = self.table.list().await?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(TASKS_CACHE_KEY, tasks.clone());
        }
        Ok(tasks)
    }

    /// 创建任务。空白标题在任何存储调用之前就被拒绝。
    pub async fn create(&self, new: NewTask) -> Result<Task> {
        if new.title.trim().is_empty() {
            return Err(TaskFlowError::invalid_data("task title must not be empty"));
        }

        let task = self.table.insert(new).await?;
        self.invalidate();
        Ok(task)
    }

    /// 部分更新。失败时缓存保持原样（没有乐观写入，无需回滚）。
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let task = self.table.update(id, patch).await?;
        self.invalidate();
        Ok(task)
    }

    /// 删除任务
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.table.delete(id).await?;
        self.invalidate();
        Ok(())
    }

    /// 使缓存列表失效。无条件且幂等，重复调用无害。
    /// 锁中毒也要完成失效——缓存里只有可丢弃的副本，
    /// 继续持有陈旧列表比接过中毒的锁更糟。
    pub fn invalidate(&self) {
        let mut cache = self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.remove(TASKS_CACHE_KEY);
    }
}
