use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_SCRIPT: &str = "session.jsonl";

#[derive(Debug, Parser)]
#[command(name = "tutorsync", about = "Tutoring chat sync core: replay chat sessions")]
pub struct Cli {
    /// Path to config file (default: ./tutorsync.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Replay a JSON-lines session script against the chat engines
    Replay {
        /// Script with one step per line
        #[arg(short, long, default_value = DEFAULT_SCRIPT)]
        script: PathBuf,

        /// Signed-in user (overrides [chat] user_id)
        #[arg(short, long)]
        user: Option<String>,
    },
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Replay {
            script: PathBuf::from(DEFAULT_SCRIPT),
            user: None,
        })
    }
}
