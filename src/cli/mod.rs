//! 命令行入口定义

pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// TaskFlow: Kanban task board with an AI assistant
#[derive(Parser)]
#[command(name = "taskflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8787)]
        port: u16,
        /// Host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Task database path (default: ~/.taskflow/tasks.db)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}
