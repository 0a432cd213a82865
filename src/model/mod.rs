pub mod chat;
pub mod task;

pub use chat::{ChatMessage, ChatRole};
pub use task::{Column, NewTask, Task, TaskPatch, TaskPriority, TaskStatus, COLUMNS};
