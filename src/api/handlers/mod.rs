pub mod chat;
pub mod tasks;
