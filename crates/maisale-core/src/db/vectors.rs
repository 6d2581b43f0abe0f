//! Vector storage operations
//!
//! Stores embeddings as BLOBs and computes cosine distance in Rust.

use super::Database;
use crate::error::Result;
use crate::retrieval::{MetadataFilter, ResultMetadata, RetrievalResult, VectorEntry};
use chrono::Utc;
use rusqlite::params;

impl Database {
    /// Insert or replace embedded snippets, keyed by id
    pub fn upsert_vectors(&self, entries: &[VectorEntry], model: &str) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let conn = self.conn();

        conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<usize> {
            for entry in entries {
                let extra_json = if entry.metadata.extra.is_empty() {
                    None
                } else {
                    Some(serde_json::to_string(&entry.metadata.extra)?)
                };
                conn.execute(
                    "INSERT OR REPLACE INTO knowledge_vectors
                        (id, document, conversation_id, user_id, source, metadata, model, embedding, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        entry.id,
                        entry.document,
                        entry.metadata.conversation_id,
                        entry.metadata.user_id,
                        entry.metadata.source,
                        extra_json,
                        model,
                        embedding_to_bytes(&entry.embedding),
                        now,
                    ],
                )?;
            }
            Ok(entries.len())
        })();

        match result {
            Ok(count) => {
                conn.execute("COMMIT", [])?;
                Ok(count)
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    /// Nearest snippets to `embedding`, closest first.
    ///
    /// The filter is evaluated in SQL; only matching rows are scored.
    pub fn query_vectors(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut params: Vec<String> = Vec::new();
        let where_clause = match filter {
            Some(f) => format!("WHERE {}", f.to_sql(&mut params)),
            None => String::new(),
        };
        let sql = format!(
            "SELECT id, document, conversation_id, user_id, source, metadata, embedding
             FROM knowledge_vectors {} ORDER BY rowid",
            where_clause
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
            let extra_json: Option<String> = row.get(5)?;
            let bytes: Vec<u8> = row.get(6)?;
            Ok((
                RetrievalResult {
                    id: row.get(0)?,
                    document: row.get(1)?,
                    metadata: ResultMetadata {
                        conversation_id: row.get(2)?,
                        user_id: row.get(3)?,
                        source: row.get(4)?,
                        extra: extra_json
                            .and_then(|j| serde_json::from_str(&j).ok())
                            .unwrap_or_default(),
                    },
                    distance: 0.0,
                },
                bytes,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (mut result, bytes) = row?;
            let stored = bytes_to_embedding(&bytes);
            result.distance = cosine_distance(embedding, &stored);
            results.push(result);
        }

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    pub fn count_vectors(&self) -> Result<usize> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM knowledge_vectors", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Drop every snippet indexed from `source`
    pub fn delete_vectors_by_source(&self, source: &str) -> Result<usize> {
        let deleted = self.conn().execute(
            "DELETE FROM knowledge_vectors WHERE source = ?1",
            params![source],
        )?;
        Ok(deleted)
    }
}

/// Convert f32 embedding to bytes for storage
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// `1 - cosine_similarity`, in [0, 2]. Mismatched dimensions count as unrelated.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b) as f64
}
