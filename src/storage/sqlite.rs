//! tasks 表的 SQLite 实现
//!
//! 单表 schema，tags 以 JSON 文本列存储。连接由 `Mutex` 串行化；
//! 这是协作方内部细节，store 层不依赖任何跨操作的顺序保证。

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::TaskTable;
use crate::error::{Result, TaskFlowError};
use crate::model::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id         TEXT PRIMARY KEY,
    title      TEXT NOT NULL,
    description TEXT,
    status     TEXT NOT NULL,
    priority   TEXT NOT NULL,
    tags       TEXT,
    assignee   TEXT,
    due_date   TEXT,
    sort_order REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

const SELECT_COLUMNS: &str =
    "id, title, description, status, priority, tags, assignee, due_date, sort_order, created_at, updated_at";

/// SQLite 后端的 tasks 表
pub struct SqliteTaskTable {
    conn: Mutex<Connection>,
}

impl SqliteTaskTable {
    /// 打开（必要时创建）数据库文件并初始化 schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 内存数据库（测试用）
    #[allow(dead_code)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TaskFlowError::storage("task table lock poisoned"))
    }
}

/// 直接从列读出的原始行，解码前的中间形态
struct RawTask {
    id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    tags: Option<String>,
    assignee: Option<String>,
    due_date: Option<String>,
    sort_order: f64,
    created_at: String,
    updated_at: String,
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTask> {
    Ok(RawTask {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        tags: row.get(5)?,
        assignee: row.get(6)?,
        due_date: row.get(7)?,
        sort_order: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TaskFlowError::invalid_data(format!("bad timestamp {s:?}: {e}")))
}

/// 解码原始行。枚举封闭性在这里强制：越界的 status/priority 是解码错误，
/// 不会被悄悄归并到某个已知值。NULL tags 列归一化为空列表。
fn decode(raw: RawTask) -> Result<Task> {
    let status = TaskStatus::parse(&raw.status)
        .ok_or_else(|| TaskFlowError::invalid_data(format!("unknown task status: {}", raw.status)))?;
    let priority = TaskPriority::parse(&raw.priority).ok_or_else(|| {
        TaskFlowError::invalid_data(format!("unknown task priority: {}", raw.priority))
    })?;
    let tags = match raw.tags {
        Some(json) => serde_json::from_str(&json)?,
        None => Vec::new(),
    };
    let due_date = raw
        .due_date
        .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| TaskFlowError::invalid_data(format!("bad due_date: {e}")))?;

    Ok(Task {
        id: raw.id,
        title: raw.title,
        description: raw.description,
        status,
        priority,
        tags,
        assignee: raw.assignee,
        due_date,
        sort_order: raw.sort_order,
        created_at: parse_timestamp(&raw.created_at)?,
        updated_at: parse_timestamp(&raw.updated_at)?,
    })
}

fn get_row(conn: &Connection, id: &str) -> Result<Task> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM tasks WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![id], read_raw)?;
    match rows.next() {
        Some(raw) => decode(raw?),
        None => Err(TaskFlowError::not_found(format!("task {id}"))),
    }
}

#[async_trait::async_trait]
impl TaskTable for SqliteTaskTable {
    async fn list(&self) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM tasks ORDER BY sort_order ASC");
        let mut stmt = conn.prepare(&sql)?;
        let raw_rows = stmt
            .query_map([], read_raw)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw_rows.into_iter().map(decode).collect()
    }

    async fn insert(&self, new: NewTask) -> Result<Task> {
        let conn = self.lock()?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            tags: new.tags,
            assignee: new.assignee,
            due_date: new.due_date,
            sort_order: new.sort_order,
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO tasks (id, title, description, status, priority, tags, assignee, due_date, sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                task.id,
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                serde_json::to_string(&task.tags)?,
                task.assignee,
                task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
                task.sort_order,
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(task)
    }

    async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let conn = self.lock()?;

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(title) = patch.title {
            sets.push("title = ?");
            values.push(Box::new(title));
        }
        if let Some(description) = patch.description {
            sets.push("description = ?");
            values.push(Box::new(description));
        }
        if let Some(status) = patch.status {
            sets.push("status = ?");
            values.push(Box::new(status.as_str().to_string()));
        }
        if let Some(priority) = patch.priority {
            sets.push("priority = ?");
            values.push(Box::new(priority.as_str().to_string()));
        }
        if let Some(tags) = patch.tags {
            sets.push("tags = ?");
            values.push(Box::new(serde_json::to_string(&tags)?));
        }
        if let Some(assignee) = patch.assignee {
            sets.push("assignee = ?");
            values.push(Box::new(assignee));
        }
        if let Some(due_date) = patch.due_date {
            sets.push("due_date = ?");
            values.push(Box::new(due_date.format("%Y-%m-%d").to_string()));
        }
        if let Some(sort_order) = patch.sort_order {
            sets.push("sort_order = ?");
            values.push(Box::new(sort_order));
        }

        // updated_at 无条件推进
        sets.push("updated_at = ?");
        values.push(Box::new(Utc::now().to_rfc3339()));
        values.push(Box::new(id.to_string()));

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let changed = conn.execute(&sql, refs.as_slice())?;

        if changed == 0 {
            return Err(TaskFlowError::not_found(format!("task {id}")));
        }

        get_row(&conn, id)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(TaskFlowError::not_found(format!("task {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;

    fn table() -> SqliteTaskTable {
        SqliteTaskTable::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn test_insert_applies_defaults() {
        let t = table();
        let task = t.insert(NewTask::with_title("Write spec")).await.unwrap();

        assert_eq!(task.title, "Write spec");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(task.tags.is_empty());
        assert_eq!(task.sort_order, 0.0);
        assert!(task.description.is_none());
        assert!(task.assignee.is_none());
        assert!(task.due_date.is_none());
        assert!(!task.id.is_empty());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[tokio::test]
    async fn test_list_orders_by_sort_order() {
        let t = table();
        for (title, order) in [("c", 3.0), ("a", 1.0), ("b", 2.0)] {
            let mut new = NewTask::with_title(title);
            new.sort_order = order;
            t.insert(new).await.unwrap();
        }

        let tasks = t.list().await.unwrap();
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_partial_update_preserves_other_fields() {
        let t = table();
        let mut new = NewTask::with_title("Ship release");
        new.priority = TaskPriority::High;
        new.tags = vec!["release".to_string()];
        new.assignee = Some("ada".to_string());
        new.due_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        let created = t.insert(new).await.unwrap();

        let patch = TaskPatch {
            status: Some(TaskStatus::InReview),
            ..TaskPatch::default()
        };
        let updated = t.update(&created.id, patch).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.status, TaskStatus::InReview);
        assert_eq!(updated.title, "Ship release");
        assert_eq!(updated.priority, TaskPriority::High);
        assert_eq!(updated.tags, vec!["release".to_string()]);
        assert_eq!(updated.assignee.as_deref(), Some("ada"));
        assert_eq!(updated.due_date, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_delete_is_terminal() {
        let t = table();
        let a = t.insert(NewTask::with_title("a")).await.unwrap();
        let b = t.insert(NewTask::with_title("b")).await.unwrap();

        t.delete(&a.id).await.unwrap();

        let tasks = t.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, b.id);
        assert!(!tasks.iter().any(|t| t.id == a.id));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let t = table();
        let patch = TaskPatch {
            title: Some("x".to_string()),
            ..TaskPatch::default()
        };
        assert!(matches!(
            t.update("missing", patch).await,
            Err(TaskFlowError::NotFound(_))
        ));
        assert!(matches!(
            t.delete("missing").await,
            Err(TaskFlowError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_null_tags_normalized_to_empty() {
        let t = table();
        {
            let conn = t.lock().unwrap();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO tasks (id, title, description, status, priority, tags, assignee, due_date, sort_order, created_at, updated_at)
                 VALUES ('x1', 'legacy row', NULL, 'todo', 'medium', NULL, NULL, NULL, 0, ?1, ?1)",
                params![now],
            )
            .unwrap();
        }

        let tasks = t.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].tags.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_status_row_is_rejected() {
        let t = table();
        {
            let conn = t.lock().unwrap();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO tasks (id, title, description, status, priority, tags, assignee, due_date, sort_order, created_at, updated_at)
                 VALUES ('x1', 'bad row', NULL, 'blocked', 'medium', '[]', NULL, NULL, 0, ?1, ?1)",
                params![now],
            )
            .unwrap();
        }

        assert!(matches!(
            t.list().await,
            Err(TaskFlowError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");

        {
            let t = SqliteTaskTable::open(&path).unwrap();
            t.insert(NewTask::with_title("persisted")).await.unwrap();
        }

        let t = SqliteTaskTable::open(&path).unwrap();
        let tasks = t.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "persisted");
    }
}
