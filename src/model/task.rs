//! 任务数据模型
//!
//! `Task` 是唯一的持久化实体。`status` / `priority` 是封闭枚举：
//! 越界值无法反序列化，板上每个任务任意时刻恰好属于一个 column。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 任务状态（对应看板 column，1:1）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::InReview => "in_review",
            TaskStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "in_review" => Some(TaskStatus::InReview),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// 任务优先级（仅用于展示排序/样式，不影响流转）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            "urgent" => Some(TaskPriority::Urgent),
            _ => None,
        }
    }
}

/// 任务数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// 任务 ID（UUID，插入时由存储层分配，之后不可变）
    pub id: String,
    /// 标题（非空）
    pub title: String,
    /// 描述
    pub description: Option<String>,
    /// 状态
    pub status: TaskStatus,
    /// 优先级
    pub priority: TaskPriority,
    /// 标签
    pub tags: Vec<String>,
    /// 负责人（自由文本，不校验用户）
    pub assignee: Option<String>,
    /// 截止日期（无时间部分）
    pub due_date: Option<NaiveDate>,
    /// column 内手动排序提示
    pub sort_order: f64,
    /// 创建时间（存储层分配）
    pub created_at: DateTime<Utc>,
    /// 更新时间（每次 update 由存储层推进）
    pub updated_at: DateTime<Utc>,
}

/// 创建任务请求（title 必填，其余字段有默认值）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub sort_order: f64,
}

impl NewTask {
    #[allow(dead_code)] // 测试构造用
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// 部分更新请求：缺省字段保持不变，`id` 本身不可变
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub tags: Option<Vec<String>>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub sort_order: Option<f64>,
}

/// 看板 column
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Column {
    pub id: TaskStatus,
    pub title: &'static str,
}

/// 固定的四个 column
pub const COLUMNS: [Column; 4] = [
    Column {
        id: TaskStatus::Todo,
        title: "Todo",
    },
    Column {
        id: TaskStatus::InProgress,
        title: "In Progress",
    },
    Column {
        id: TaskStatus::InReview,
        title: "In Review",
    },
    Column {
        id: TaskStatus::Done,
        title: "Done",
    },
];
