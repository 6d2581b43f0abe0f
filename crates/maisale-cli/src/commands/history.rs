//! History command

use crate::app::{HistoryArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use maisale_core::ChatService;

pub async fn run(args: HistoryArgs, service: &ChatService, format: OutputFormat) -> Result<()> {
    let messages = service.history(&args.conversation).await?;
    print!("{}", output::format_history(&messages, format));
    Ok(())
}
