//! Knowledge folder indexing

use super::chunk_words;
use crate::config::KnowledgeConfig;
use crate::error::{MaiSaleError, Result};
use crate::llm::Embedder;
use crate::retrieval::{ResultMetadata, VectorEntry};
use crate::store::VectorIndex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::{DirEntry, WalkDir};

/// Totals for one indexing run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub files: usize,
    pub chunks: usize,
    pub words: usize,
    pub errors: Vec<(PathBuf, String)>,
}

/// Embeds the files of a folder into the vector index
pub struct KnowledgeIndexer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: KnowledgeConfig,
}

impl KnowledgeIndexer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: KnowledgeConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    /// Index every visible file under `root`. A file that fails is recorded
    /// in the report and the run continues.
    pub async fn index_folder(&self, root: &Path) -> Result<IndexReport> {
        if !root.is_dir() {
            return Err(MaiSaleError::InvalidInput(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let files = scan_files(root)?;
        tracing::info!("Indexing {} files from {}", files.len(), root.display());

        let mut report = IndexReport::default();
        for path in files {
            match self.index_file(&path).await {
                Ok((chunks, words)) => {
                    report.files += 1;
                    report.chunks += chunks;
                    report.words += words;
                }
                Err(e) => {
                    tracing::warn!("Failed to index {}: {}", path.display(), e);
                    report.errors.push((path, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Replace the chunks of one file. Returns (chunks, words).
    pub async fn index_file(&self, path: &Path) -> Result<(usize, usize)> {
        let content = tokio::fs::read_to_string(path).await?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| MaiSaleError::InvalidInput(format!("no file name: {}", path.display())))?;

        let chunks = chunk_words(&content, self.config.chunk_size, self.config.overlap);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let removed = self.index.delete_source(&source).await?;
        if removed > 0 {
            tracing::debug!("Replaced {} old chunks of {}", removed, source);
        }

        let words = chunks.iter().map(|c| c.word_count).sum();
        let entries: Vec<VectorEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorEntry {
                id: format!("{}#chunk_{}", source, chunk.position),
                document: chunk.text,
                metadata: ResultMetadata::for_source(&source).with_extra("chunk", chunk.position),
                embedding,
            })
            .collect();

        let count = self
            .index
            .upsert(entries, self.embedder.model_name())
            .await?;
        Ok((count, words))
    }
}

/// Regular files under `root`, hidden entries skipped, sorted by path
fn scan_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn model_name(&self) -> &str {
            "length"
        }
    }

    fn indexer(db: &Arc<Database>) -> KnowledgeIndexer {
        let config = KnowledgeConfig {
            chunk_size: 3,
            overlap: 0,
        };
        KnowledgeIndexer::new(Arc::new(LengthEmbedder), db.clone(), config)
    }

    fn database() -> Arc<Database> {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        Arc::new(db)
    }

    #[tokio::test]
    async fn test_index_folder() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("gpu.md"), "RTX 4060 giá tốt nhất tháng này").unwrap();
        std::fs::write(temp.path().join("policy.txt"), "Bảo hành 36 tháng").unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        std::fs::write(temp.path().join(".git").join("HEAD"), "ref").unwrap();

        let db = database();
        let report = indexer(&db).index_folder(temp.path()).await.unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.chunks, 5);
        assert_eq!(report.words, 11);
        assert!(report.errors.is_empty());
        assert_eq!(db.count_vectors().unwrap(), 5);

        let hits = db.query_vectors(&[18.0, 1.0], 10, None).unwrap();
        assert!(hits.iter().any(|r| r.id == "gpu.md#chunk_2"));
        let policy = hits.iter().find(|r| r.id == "policy.txt#chunk_0").unwrap();
        assert_eq!(policy.metadata.source.as_deref(), Some("policy.txt"));
        assert_eq!(policy.metadata.extra.get("chunk"), Some(&serde_json::json!(0)));
    }

    #[tokio::test]
    async fn test_reindex_replaces_chunks() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("faq.md");
        std::fs::write(&file, "one two three four five six seven").unwrap();

        let db = database();
        let indexer = indexer(&db);
        indexer.index_folder(temp.path()).await.unwrap();
        assert_eq!(db.count_vectors().unwrap(), 3);

        std::fs::write(&file, "short now").unwrap();
        indexer.index_folder(temp.path()).await.unwrap();
        assert_eq!(db.count_vectors().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("ok.md"), "fine text").unwrap();
        std::fs::write(temp.path().join("binary.bin"), [0xff_u8, 0xfe, 0x00]).unwrap();

        let db = database();
        let report = indexer(&db).index_folder(temp.path()).await.unwrap();
        assert_eq!(report.files, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].0.ends_with("binary.bin"));
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let db = database();
        let err = indexer(&db)
            .index_folder(Path::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert!(matches!(err, MaiSaleError::InvalidInput(_)));
    }
}
