//! JSON output formatter

use super::StatusInfo;
use serde::Serialize;

pub fn to_pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string()) + "\n"
}

pub fn format_status(status: &StatusInfo<'_>) -> String {
    to_pretty(&serde_json::json!({
        "ready": status.readiness.is_ready(),
        "database": status.readiness.database,
        "model": status.readiness.model,
        "model_url": status.model_url,
        "model_name": status.model,
        "knowledge_vectors": status.knowledge_vectors,
    }))
}
