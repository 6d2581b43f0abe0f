//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use maisale_core::{ConversationInfo, IndexReport, MessageRecord, ReadinessReport, TurnReply};

/// What `status` reports besides component health
pub struct StatusInfo<'a> {
    pub readiness: &'a ReadinessReport,
    pub model_url: &'a str,
    pub model: &'a str,
    pub knowledge_vectors: usize,
}

pub fn format_conversations(conversations: &[ConversationInfo], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::to_pretty(conversations),
        OutputFormat::Cli => terminal::format_conversations(conversations),
    }
}

pub fn format_conversation(conversation: &ConversationInfo, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::to_pretty(conversation),
        OutputFormat::Cli => format!("Created conversation {}\n", conversation.id),
    }
}

pub fn format_history(messages: &[MessageRecord], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::to_pretty(messages),
        OutputFormat::Cli => terminal::format_history(messages),
    }
}

pub fn format_reply(reply: &TurnReply, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::to_pretty(reply),
        OutputFormat::Cli => format!("{}\n", reply.assistant_message.text),
    }
}

pub fn format_index_report(report: &IndexReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::to_pretty(report),
        OutputFormat::Cli => terminal::format_index_report(report),
    }
}

pub fn format_status(status: &StatusInfo<'_>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_status(status),
        OutputFormat::Cli => terminal::format_status(status),
    }
}
