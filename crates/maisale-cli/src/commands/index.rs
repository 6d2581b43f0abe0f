//! Index command

use crate::app::{IndexArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use maisale_core::{Config, Database, HttpEmbedder, KnowledgeIndexer};
use std::sync::Arc;

pub async fn run(
    args: IndexArgs,
    db: &Arc<Database>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let embedder = HttpEmbedder::from_config(config.llm_service.clone())?;
    let indexer = KnowledgeIndexer::new(Arc::new(embedder), db.clone(), config.knowledge.clone());

    let report = indexer.index_folder(&args.path).await?;
    print!("{}", output::format_index_report(&report, format));
    Ok(())
}
