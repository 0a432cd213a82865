mod api;
mod chat;
mod cli;
mod config;
mod error;
mod model;
mod storage;
mod store;

use clap::Parser;

use cli::{Cli, Commands};

fn main() {
    // Enable backtraces by default so panics show call stacks
    if std::env::var("RUST_BACKTRACE").is_err() {
        // SAFETY: called at the very start of main, before any other threads
        unsafe {
            std::env::set_var("RUST_BACKTRACE", "1");
        }
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host, db } => {
            tokio::runtime::Runtime::new()
                .expect("Failed to create tokio runtime")
                .block_on(async {
                    cli::serve::execute(port, &host, db).await;
                });
        }
    }
}
