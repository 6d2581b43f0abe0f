//! Terminal output formatter

use super::StatusInfo;
use maisale_core::{ConversationInfo, IndexReport, MessageRecord};

pub fn format_conversations(conversations: &[ConversationInfo]) -> String {
    let mut output = String::new();
    for c in conversations {
        output.push_str(&format!("{}  {}  last active {}\n", c.id, c.user_id, c.last_active_at));
    }
    output
}

pub fn format_history(messages: &[MessageRecord]) -> String {
    let mut output = String::new();
    for m in messages {
        let time = m.created_at.get(..19).unwrap_or(&m.created_at);
        output.push_str(&format!("[{}] {}: {}\n", time, m.sender, m.text));
    }
    output
}

pub fn format_index_report(report: &IndexReport) -> String {
    let mut output = format!(
        "Indexed {} files ({} chunks, {} words)\n",
        report.files, report.chunks, report.words
    );
    if !report.errors.is_empty() {
        output.push_str(&format!("{} failed:\n", report.errors.len()));
        for (path, error) in &report.errors {
            output.push_str(&format!("  {}: {}\n", path.display(), error));
        }
    }
    output
}

pub fn format_status(status: &StatusInfo<'_>) -> String {
    let component = |ok: bool, detail: &Option<String>| match (ok, detail) {
        (true, _) => "ok".to_string(),
        (false, Some(d)) => format!("unavailable ({})", d),
        (false, None) => "unavailable".to_string(),
    };
    let readiness = status.readiness;

    let mut output = String::new();
    output.push_str(&format!(
        "Database:          {}\n",
        component(readiness.database.ok, &readiness.database.detail)
    ));
    output.push_str(&format!(
        "Model:             {}\n",
        component(readiness.model.ok, &readiness.model.detail)
    ));
    output.push_str(&format!("  URL:             {}\n", status.model_url));
    output.push_str(&format!("  Name:            {}\n", status.model));
    output.push_str(&format!("Knowledge vectors: {}\n", status.knowledge_vectors));
    output
}
