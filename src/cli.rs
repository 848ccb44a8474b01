use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "docchat",
    about = "Chat, ask questions about your PDFs, or hand a task to the assistant"
)]
pub struct Cli {
    /// Data directory holding uploaded documents and the index
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Copy a document into the data directory and index it
    Upload {
        /// PDF, text or markdown file
        file: PathBuf,
    },
    /// Index a file in place without copying it
    Ingest {
        file: PathBuf,
    },
    /// Ask a question answered from the indexed documents
    Ask {
        question: String,
        /// Restrict retrieval to one uploaded document
        #[arg(long)]
        pdf: Option<String>,
        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Remove a document and all its indexed chunks
    Delete {
        name: String,
        /// Keep the file on disk, only drop it from the index
        #[arg(long)]
        keep_file: bool,
    },
    /// Drop a file indexed with `ingest` from the index
    Forget {
        file: PathBuf,
    },
    /// List uploaded documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive conversation with memory (`/clear` resets, `/exit` quits)
    Chat,
    /// Hand a single task to the assistant
    Agent {
        task: String,
    },
    /// Manage stored provider settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show one setting (API keys are masked)
    Get { key: String },
    /// Store a setting
    Set { key: String, value: String },
    /// Remove a stored setting
    Unset { key: String },
    /// Show all effective settings
    List,
}
