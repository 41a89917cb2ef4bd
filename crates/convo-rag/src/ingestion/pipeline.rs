//! Ingestion pipeline: parse → chunk → embed → upsert

use futures::stream::{self, StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::IndexRecord;

use super::chunker::{TextChunk, TextChunker};
use super::parser::{FileParser, ParsedDocument};

/// Summary of one ingested document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub source: String,
    /// Pages with extracted text
    pub pages: usize,
    pub chunks: usize,
    pub vectors_upserted: usize,
}

/// Deterministic vector id for a chunk, so re-ingesting overwrites it
pub fn record_id(source: &str, chunk_index: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"#");
    hasher.update(chunk_index.to_le_bytes());
    hex::encode(&hasher.finalize()[..16])
}

/// Indexes documents into the vector store
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    chunker: TextChunker,
    batch_size: usize,
    max_concurrency: usize,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
        config: &RagConfig,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            chunker: TextChunker::new(&config.chunking),
            batch_size: config.ingestion.batch_size.max(1),
            max_concurrency: config.ingestion.max_concurrency.max(1),
        }
    }

    /// Read, parse and index one file
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::file_parse(path.display().to_string(), "Not a file path"))?;
        let data = tokio::fs::read(path).await?;

        tracing::info!("Parsing {} ({} bytes)", filename, data.len());
        let parsed = tokio::task::spawn_blocking(move || FileParser::parse(&filename, &data))
            .await
            .map_err(|e| Error::internal(format!("Parser task failed: {}", e)))??;

        self.ingest_document(&parsed).await
    }

    /// Chunk, embed and upsert an already parsed document
    pub async fn ingest_document(&self, parsed: &ParsedDocument) -> Result<IngestReport> {
        let chunks = self.chunker.chunk_document(parsed);
        if chunks.is_empty() {
            return Err(Error::file_parse(
                &parsed.filename,
                "Document produced no chunks",
            ));
        }
        tracing::info!("Chunked {} into {} chunks", parsed.filename, chunks.len());

        let mut embedded: Vec<(usize, Vec<Vec<f32>>)> =
            stream::iter(chunks.chunks(self.batch_size).enumerate())
                .map(|(batch_index, batch)| self.embed_batch(batch_index, batch))
                .buffer_unordered(self.max_concurrency)
                .try_collect()
                .await?;
        embedded.sort_by_key(|(batch_index, _)| *batch_index);

        let records: Vec<IndexRecord> = chunks
            .iter()
            .zip(embedded.into_iter().flat_map(|(_, vectors)| vectors))
            .map(|(chunk, values)| IndexRecord {
                id: record_id(&parsed.filename, chunk.index),
                values,
                text: chunk.text.clone(),
                source: parsed.filename.clone(),
                page: chunk.page,
                chunk_index: chunk.index,
            })
            .collect();

        let vectors_upserted = self.vector_store.upsert(&records).await?;
        tracing::info!(
            "Upserted {} vectors for {} into {}",
            vectors_upserted,
            parsed.filename,
            self.vector_store.name()
        );

        Ok(IngestReport {
            source: parsed.filename.clone(),
            pages: parsed.pages.len(),
            chunks: chunks.len(),
            vectors_upserted,
        })
    }

    async fn embed_batch(
        &self,
        batch_index: usize,
        batch: &[TextChunk],
    ) -> Result<(usize, Vec<Vec<f32>>)> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.embedder.dimensions()) {
            return Err(Error::embedding(format!(
                "Embedding has {} dimensions, expected {}",
                bad.len(),
                self.embedder.dimensions()
            )));
        }

        tracing::debug!("Embedded batch {} ({} chunks)", batch_index, texts.len());
        Ok((batch_index, vectors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::parser::{FileType, PageContent};
    use crate::providers::embedding::MockEmbeddingProvider;
    use crate::providers::vector_store::MockVectorStoreProvider;
    use std::io::Write;

    fn config(batch_size: usize) -> RagConfig {
        let mut config = RagConfig::default();
        config.chunking.chunk_size = 40;
        config.chunking.chunk_overlap = 0;
        config.chunking.min_chunk_size = 1;
        config.ingestion.batch_size = batch_size;
        config
    }

    fn embedder() -> MockEmbeddingProvider {
        let mut embedder = MockEmbeddingProvider::new();
        embedder.expect_dimensions().return_const(2usize);
        embedder
            .expect_embed_batch()
            .returning(|texts| Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect()));
        embedder
    }

    fn document() -> ParsedDocument {
        ParsedDocument {
            filename: "dsa.pdf".to_string(),
            file_type: FileType::Pdf,
            pages: vec![
                PageContent {
                    page_number: Some(1),
                    content: "A stack is LIFO. Push adds on top. Pop removes the top.".to_string(),
                },
                PageContent {
                    page_number: Some(2),
                    content: "A queue is FIFO.".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_record_id_is_deterministic() {
        assert_eq!(record_id("dsa.pdf", 3), record_id("dsa.pdf", 3));
        assert_ne!(record_id("dsa.pdf", 3), record_id("dsa.pdf", 4));
        assert_ne!(record_id("dsa.pdf", 3), record_id("algo.pdf", 3));
        assert_eq!(record_id("dsa.pdf", 0).len(), 32);
    }

    #[tokio::test]
    async fn test_ingest_document_upserts_in_chunk_order() {
        let mut store = MockVectorStoreProvider::new();
        store.expect_name().return_const("pinecone".to_string());
        store
            .expect_upsert()
            .withf(|records| {
                records.iter().enumerate().all(|(i, r)| r.chunk_index == i as u32)
                    && records.last().map(|r| r.page) == Some(Some(2))
                    && records.iter().all(|r| r.values[0] == r.text.len() as f32)
            })
            .times(1)
            .returning(|records| Ok(records.len()));

        // Batch size 1 forces several concurrent embedding requests
        let ingestor = Ingestor::new(Arc::new(embedder()), Arc::new(store), &config(1));
        let report = ingestor.ingest_document(&document()).await.unwrap();

        assert_eq!(report.source, "dsa.pdf");
        assert_eq!(report.pages, 2);
        assert!(report.chunks >= 3);
        assert_eq!(report.vectors_upserted, report.chunks);
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_before_upsert() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed_batch()
            .returning(|_| Err(Error::embedding("quota exceeded")));
        let mut store = MockVectorStoreProvider::new();
        store.expect_upsert().times(0);

        let ingestor = Ingestor::new(Arc::new(embedder), Arc::new(store), &config(10));
        assert!(matches!(
            ingestor.ingest_document(&document()).await,
            Err(Error::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_ingest_text_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Binary search halves the range. It needs sorted input.").unwrap();

        let mut store = MockVectorStoreProvider::new();
        store.expect_name().return_const("pinecone".to_string());
        store.expect_upsert().returning(|records| Ok(records.len()));

        let ingestor = Ingestor::new(Arc::new(embedder()), Arc::new(store), &config(10));
        let report = ingestor.ingest_file(file.path()).await.unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.vectors_upserted, report.chunks);
    }
}
