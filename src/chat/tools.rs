//! 助手可用的 tool 声明与分发
//!
//! 目前只有一个 tool：`create_task`。模型送来的 tool 名是开放集合，
//! 未知名字走显式错误路径（序列化回会话，由模型决定如何向用户解释）。

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::model::{NewTask, TaskPriority, TaskStatus};
use crate::store::TaskStore;

/// 暴露给模型的 tool schema（chat-completions `tools` 数组）
pub fn tool_schema() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "create_task",
                "description": "Create a new task on the Kanban board",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "description": "Task title" },
                        "description": { "type": "string", "description": "Task description" },
                        "status": {
                            "type": "string",
                            "enum": ["todo", "in_progress", "in_review", "done"],
                            "description": "Task status column"
                        },
                        "priority": {
                            "type": "string",
                            "enum": ["low", "medium", "high", "urgent"],
                            "description": "Task priority"
                        },
                        "tags": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Task tags"
                        },
                        "assignee": { "type": "string", "description": "Assignee name" },
                        "due_date": {
                            "type": "string",
                            "description": "Due date in YYYY-MM-DD format"
                        }
                    },
                    "required": ["title"]
                }
            }
        }
    ])
}

/// `create_task` 的参数（模型以 JSON 字符串传入）
#[derive(Debug, Deserialize)]
struct CreateTaskArgs {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(default)]
    priority: Option<TaskPriority>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
}

/// 执行一次 tool 调用，返回作为 tool result 回填的 JSON 文本。
///
/// 底层存储失败被捕获为 `{"error": ...}` 而不是上抛——
/// HTTP 调用方永远看不到 tool 错误。
pub async fn dispatch(store: &TaskStore, name: &str, arguments: &str) -> String {
    let result = match name {
        "create_task" => create_task(store, arguments).await,
        _ => json!({ "error": format!("Unknown tool: {name}") }),
    };
    result.to_string()
}

async fn create_task(store: &TaskStore, arguments: &str) -> Value {
    let args: CreateTaskArgs = match serde_json::from_str(arguments) {
        Ok(args) => args,
        Err(e) => return json!({ "error": format!("Bad tool arguments: {e}") }),
    };

    let new = NewTask {
        title: args.title,
        description: args.description,
        status: args.status.unwrap_or_default(),
        priority: args.priority.unwrap_or_default(),
        tags: args.tags.unwrap_or_default(),
        assignee: args.assignee,
        due_date: args.due_date,
        sort_order: 0.0,
    };

    match store.create(new).await {
        Ok(task) => json!({ "success": true, "task": task }),
        Err(e) => json!({ "error": e.to_string() }),
    }
}
