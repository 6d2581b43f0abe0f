//! Interactive chat command

use crate::app::ChatArgs;
use crate::commands::stream::render;
use anyhow::Result;
use maisale_core::{ChatService, Role};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One open conversation, from start to `/quit`
pub struct ChatSession<'a> {
    service: &'a ChatService,
    conversation_id: String,
}

impl<'a> ChatSession<'a> {
    /// Start a new conversation, or continue `existing`
    pub async fn open(
        service: &'a ChatService,
        user_id: &str,
        existing: Option<String>,
    ) -> Result<Self> {
        let conversation_id = match existing {
            Some(id) => id,
            None => service.create_conversation(user_id, None).await?.id,
        };
        let session = Self {
            service,
            conversation_id,
        };

        for message in session.service.history(&session.conversation_id).await? {
            let who = match message.sender {
                Role::User => "you",
                Role::Assistant => "mai",
            };
            println!("{}> {}", who, message.text);
        }
        Ok(session)
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Send one message and print the reply live
    pub async fn send(&self, text: &str) -> Result<String> {
        let turn = self.service.stream_message(&self.conversation_id, text).await?;
        print!("mai> ");
        std::io::stdout().flush()?;
        let (_, reply) = render(turn, false).await?;
        Ok(reply)
    }
}

pub async fn run(args: ChatArgs, service: &ChatService) -> Result<()> {
    let session = ChatSession::open(service, &args.user, args.conversation).await?;
    eprintln!(
        "Conversation {} (type /quit to leave)",
        session.conversation_id()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let line = line.trim();
        if line == "/quit" || line == "/exit" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        if let Err(e) = session.send(line).await {
            eprintln!("Error: {:#}", e);
        }
    }
    Ok(())
}
