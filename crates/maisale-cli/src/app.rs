//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "maisale")]
#[command(
    author,
    version,
    about = "Sales chat assistant for a computer store, backed by a local model"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Shared secret; must match one of the configured API keys
    #[arg(long, global = true, env = "MAISALE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage conversations
    Conversation(ConversationArgs),

    /// Send a message and print the whole reply
    Send(MessageArgs),

    /// Send a message and print the reply as it is generated
    Stream(StreamArgs),

    /// Interactive chat session
    Chat(ChatArgs),

    /// Show the messages of a conversation
    History(HistoryArgs),

    /// Index a knowledge folder
    Index(IndexArgs),

    /// Check the database and the model service
    Status,
}

#[derive(Args)]
pub struct ConversationArgs {
    #[command(subcommand)]
    pub action: ConversationAction,
}

#[derive(Subcommand)]
pub enum ConversationAction {
    /// Start a new conversation
    Create {
        #[arg(long)]
        user: String,
        /// Extra conversation metadata as a JSON object
        #[arg(long)]
        metadata: Option<String>,
    },
    /// List the conversations of a user, most recent first
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        user: String,
        #[arg(short = 'n', default_value = "20")]
        limit: usize,
    },
}

#[derive(Args)]
pub struct MessageArgs {
    /// Conversation id
    pub conversation: String,

    /// Message text
    #[arg(required = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct StreamArgs {
    #[command(flatten)]
    pub message: MessageArgs,

    /// Print wire events instead of reassembled text
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args)]
pub struct ChatArgs {
    /// User id for a new conversation
    #[arg(long)]
    pub user: String,

    /// Continue an existing conversation instead of starting one
    #[arg(long)]
    pub conversation: Option<String>,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Conversation id
    pub conversation: String,
}

#[derive(Args)]
pub struct IndexArgs {
    /// Folder with knowledge documents
    pub path: PathBuf,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
