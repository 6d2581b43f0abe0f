//! Send command

use crate::app::{MessageArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use maisale_core::ChatService;

pub async fn run(args: MessageArgs, service: &ChatService, format: OutputFormat) -> Result<()> {
    let text = args.text.join(" ");
    let reply = service.post_message(&args.conversation, &text).await?;
    print!("{}", output::format_reply(&reply, format));
    Ok(())
}
