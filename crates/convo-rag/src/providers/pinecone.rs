//! Pinecone vector index provider
//!
//! Talks to the index data plane (`/query`, `/vectors/upsert`,
//! `/describe_index_stats`). When only an index name is configured the
//! data-plane host is resolved once through the control plane.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::PineconeConfig;
use crate::error::{Error, Result};
use crate::providers::http::{read_json, retry_with_backoff, send_json};
use crate::providers::vector_store::{IndexStats, VectorStoreProvider};
use crate::types::{IndexRecord, RetrievedChunk};

const API_VERSION: &str = "2024-07";

/// Maximum vectors per upsert request
const MAX_UPSERT_BATCH: usize = 100;

/// Pinecone index client
pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
    text_key: String,
    max_retries: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<Vector<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct Vector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    dimension: Option<usize>,
    #[serde(default)]
    total_vector_count: u64,
}

#[derive(Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

/// Prefix a bare host with `https://` and drop any trailing slash
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

impl PineconeIndex {
    /// Connect to the configured index.
    ///
    /// Uses `index_host` directly when set, otherwise resolves the host
    /// from `index_name` via the control plane.
    pub async fn connect(client: Client, config: &PineconeConfig, max_retries: u32) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::config("PINECONE_API_KEY is not set"))?;

        let host = match (&config.index_host, &config.index_name) {
            (Some(host), _) => normalize_host(host),
            (None, Some(name)) => {
                let host = Self::resolve_host(&client, config, &api_key, name).await?;
                tracing::debug!("Resolved Pinecone index '{}' to {}", name, host);
                host
            }
            (None, None) => {
                return Err(Error::config(
                    "Either PINECONE_INDEX_HOST or PINECONE_INDEX_NAME must be set",
                ))
            }
        };

        Ok(Self {
            client,
            host,
            api_key,
            namespace: config.namespace.clone(),
            text_key: config.text_key.clone(),
            max_retries,
        })
    }

    async fn resolve_host(
        client: &Client,
        config: &PineconeConfig,
        api_key: &str,
        name: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/indexes/{}",
            config.control_plane_url.trim_end_matches('/'),
            name
        );
        let response = client
            .get(&url)
            .header("Api-Key", api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| Error::retrieval(format!("Pinecone describe_index request failed: {}", e)))?;

        let described: DescribeIndexResponse = read_json(response, "Pinecone describe_index")
            .await
            .map_err(Error::Retrieval)?;

        Ok(normalize_host(&described.host))
    }

    /// Data-plane host in use
    pub fn host(&self) -> &str {
        &self.host
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    fn to_chunk(&self, m: Match) -> RetrievedChunk {
        // Non-string text metadata is treated as missing
        let text = m
            .metadata
            .as_ref()
            .and_then(|meta| meta.get(&self.text_key))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        RetrievedChunk::new(m.id, text, m.score)
    }

    fn to_vector<'a>(&self, record: &'a IndexRecord) -> Vector<'a> {
        let mut metadata = serde_json::Map::new();
        metadata.insert(self.text_key.clone(), record.text.clone().into());
        metadata.insert("source".to_string(), record.source.clone().into());
        metadata.insert("chunk_index".to_string(), record.chunk_index.into());
        // Pinecone rejects null metadata values
        if let Some(page) = record.page {
            metadata.insert("page".to_string(), page.into());
        }
        Vector {
            id: &record.id,
            values: &record.values,
            metadata,
        }
    }
}

#[async_trait]
impl VectorStoreProvider for PineconeIndex {
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let request = QueryRequest {
            vector: query_embedding,
            top_k,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };
        let request = &request;

        let response: QueryResponse = retry_with_backoff(self.max_retries, || async move {
            send_json(self.post("/query"), request, "Pinecone query")
                .await
                .map_err(Error::Retrieval)
        })
        .await?;

        tracing::debug!("Pinecone returned {} matches", response.matches.len());
        Ok(response
            .matches
            .into_iter()
            .map(|m| self.to_chunk(m))
            .collect())
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        let mut written = 0;
        for batch in records.chunks(MAX_UPSERT_BATCH) {
            let request = UpsertRequest {
                vectors: batch.iter().map(|r| self.to_vector(r)).collect(),
                namespace: self.namespace.as_deref(),
            };
            let request = &request;

            let response: UpsertResponse = retry_with_backoff(self.max_retries, || async move {
                send_json(self.post("/vectors/upsert"), request, "Pinecone upsert")
                    .await
                    .map_err(Error::Retrieval)
            })
            .await?;
            written += response.upserted_count;
        }
        Ok(written)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let body = serde_json::json!({});
        let body = &body;
        let response: StatsResponse = retry_with_backoff(self.max_retries, || async move {
            send_json(self.post("/describe_index_stats"), body, "Pinecone describe_index_stats")
                .await
                .map_err(Error::Retrieval)
        })
        .await?;

        Ok(IndexStats {
            dimension: response.dimension,
            total_vectors: response.total_vector_count,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        match self.stats().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!("Pinecone health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> PineconeIndex {
        PineconeIndex {
            client: Client::new(),
            host: normalize_host("dsa-abc123.svc.aped-4627-b74a.pinecone.io"),
            api_key: "key".to_string(),
            namespace: None,
            text_key: "text".to_string(),
            max_retries: 0,
        }
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("dsa-abc.svc.pinecone.io"),
            "https://dsa-abc.svc.pinecone.io"
        );
        assert_eq!(
            normalize_host("https://dsa-abc.svc.pinecone.io/"),
            "https://dsa-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }

    #[test]
    fn test_query_request_shape() {
        let vector = [0.1f32, 0.2];
        let request = QueryRequest {
            vector: &vector,
            top_k: 10,
            include_metadata: true,
            namespace: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topK"], 10);
        assert_eq!(json["includeMetadata"], true);
        assert!(json.get("namespace").is_none());
    }

    #[test]
    fn test_matches_to_chunks() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"matches":[
                {"id":"a","score":0.91,"metadata":{"text":"A stack is LIFO.","source":"dsa.pdf"}},
                {"id":"b","score":0.85,"metadata":{"source":"dsa.pdf"}},
                {"id":"c","score":0.80},
                {"id":"d","score":0.75,"metadata":{"text":42}}
            ],"namespace":""}"#,
        )
        .unwrap();

        let index = index();
        let chunks: Vec<_> = response.matches.into_iter().map(|m| index.to_chunk(m)).collect();

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].text.as_deref(), Some("A stack is LIFO."));
        assert!((chunks[0].score - 0.91).abs() < 1e-6);
        assert_eq!(chunks[1].text, None);
        assert_eq!(chunks[2].text, None);
        assert_eq!(chunks[3].text, None);
    }

    #[test]
    fn test_vector_metadata_omits_missing_page() {
        let record = IndexRecord {
            id: "dsa.pdf-0".to_string(),
            values: vec![0.5, 0.5],
            text: "Queues are FIFO.".to_string(),
            source: "dsa.pdf".to_string(),
            page: None,
            chunk_index: 0,
        };
        let index = index();
        let json = serde_json::to_value(index.to_vector(&record)).unwrap();

        assert_eq!(json["id"], "dsa.pdf-0");
        assert_eq!(json["metadata"]["text"], "Queues are FIFO.");
        assert_eq!(json["metadata"]["chunk_index"], 0);
        assert!(json["metadata"].get("page").is_none());
    }

    #[test]
    fn test_parse_stats() {
        let stats: StatsResponse = serde_json::from_str(
            r#"{"namespaces":{"":{"vectorCount":42}},"dimension":768,"indexFullness":0,"totalVectorCount":42}"#,
        )
        .unwrap();
        assert_eq!(stats.dimension, Some(768));
        assert_eq!(stats.total_vector_count, 42);
    }
}
