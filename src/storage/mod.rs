//! 存储协作方：tasks 表的行级接口
//!
//! `TaskTable` 是 store 与 chat 工具共同消费的唯一写入口。
//! 行的 `id` 与时间戳由存储层分配；写入顺序由存储层仲裁（行级 last-write-wins）。

pub mod sqlite;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{NewTask, Task, TaskPatch};

/// 获取 ~/.taskflow/ 目录路径
pub fn taskflow_dir() -> PathBuf {
    dirs::home_dir()
        .expect("Cannot find home directory")
        .join(".taskflow")
}

/// 默认数据库路径: ~/.taskflow/tasks.db
pub fn default_db_path() -> PathBuf {
    taskflow_dir().join("tasks.db")
}

/// tasks 表接口
///
/// 所有方法都是单次往返：无重试、无部分应用、无多步原子性。
#[async_trait]
pub trait TaskTable: Send + Sync {
    /// 按 `sort_order` 升序列出全部任务
    async fn list(&self) -> Result<Vec<Task>>;

    /// 插入一行，返回创建后的完整行（含分配的 id / 时间戳）
    async fn insert(&self, new: NewTask) -> Result<Task>;

    /// 对 `id` 行做部分字段替换，返回更新后的行
    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task>;

    /// 删除 `id` 行。删除是终态，无软删除。
    async fn delete(&self, id: &str) -> Result<()>;
}
