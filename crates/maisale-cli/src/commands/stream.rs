//! Stream command
//!
//! Runs the server side into an in-process pipe and reads it back the way a
//! remote client would: raw bytes through the reassembler, then joined into
//! text as fragments arrive.

use crate::app::{OutputFormat, StreamArgs};
use anyhow::Result;
use maisale_core::chat::StreamSummary;
use maisale_core::{smart_append, ChatService, SseReassembler, StreamingTurn};
use std::io::Write;
use tokio::io::AsyncReadExt;

const PIPE_CAPACITY: usize = 4096;

pub async fn run(args: StreamArgs, service: &ChatService, format: OutputFormat) -> Result<()> {
    let text = args.message.text.join(" ");
    let turn = service.stream_message(&args.message.conversation, &text).await?;

    let (summary, _) = render(turn, args.raw).await?;
    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "events_written": summary.events_written,
                "assistant_message": summary.assistant_message,
            }))?
        );
    }
    Ok(())
}

/// Print a streaming turn to stdout as it arrives. Returns the turn summary
/// and the text the client reassembled.
pub async fn render(turn: StreamingTurn, raw: bool) -> Result<(StreamSummary, String)> {
    let (mut client, server) = tokio::io::duplex(PIPE_CAPACITY);
    let writer = tokio::spawn(turn.write_to(server));

    let mut stdout = std::io::stdout();
    let mut reassembler = SseReassembler::new();
    let mut text = String::new();
    let mut buf = [0u8; 1024];

    loop {
        let n = client.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if raw {
            stdout.write_all(&buf[..n])?;
            stdout.flush()?;
        } else {
            for fragment in reassembler.feed(&buf[..n]) {
                show(&mut text, &fragment)?;
            }
        }
    }
    if !raw {
        for fragment in reassembler.finish() {
            show(&mut text, &fragment)?;
        }
        println!();
    }

    let summary = writer.await??;
    Ok((summary, text))
}

fn show(text: &mut String, fragment: &str) -> Result<()> {
    let next = smart_append(text, fragment);
    let mut stdout = std::io::stdout();
    match next.strip_prefix(text.as_str()) {
        Some(added) => write!(stdout, "{}", added)?,
        None => write!(stdout, "\r{}", next)?,
    }
    stdout.flush()?;
    *text = next;
    Ok(())
}
