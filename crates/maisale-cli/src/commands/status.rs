//! Status command

use crate::app::OutputFormat;
use crate::output::{self, StatusInfo};
use anyhow::Result;
use maisale_core::{ChatService, Config, Database};

pub async fn run(
    service: &ChatService,
    db: &Database,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let readiness = service.readiness().await;
    let status = StatusInfo {
        readiness: &readiness,
        model_url: &config.llm_service.url,
        model: &config.llm_service.model,
        knowledge_vectors: db.count_vectors()?,
    };
    print!("{}", output::format_status(&status, format));
    Ok(())
}
