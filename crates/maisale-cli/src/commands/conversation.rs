//! Conversation command

use crate::app::{ConversationAction, ConversationArgs, OutputFormat};
use crate::output;
use anyhow::{Context, Result};
use maisale_core::{ChatService, Database};

pub async fn run(
    args: ConversationArgs,
    service: &ChatService,
    db: &Database,
    format: OutputFormat,
) -> Result<()> {
    match args.action {
        ConversationAction::Create { user, metadata } => {
            let metadata = metadata
                .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
                .transpose()
                .context("--metadata must be a JSON object")?;
            let conversation = service.create_conversation(&user, metadata).await?;
            print!("{}", output::format_conversation(&conversation, format));
        }
        ConversationAction::List { user, limit } => {
            let conversations = db.list_conversations(&user, limit)?;
            print!("{}", output::format_conversations(&conversations, format));
        }
    }
    Ok(())
}
