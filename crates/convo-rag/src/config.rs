//! Configuration for the conversational RAG system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Embedding and chat backend
    pub backend: BackendProvider,
    /// Gemini configuration (backend = gemini)
    pub gemini: GeminiConfig,
    /// Ollama configuration (backend = ollama)
    pub ollama: OllamaConfig,
    /// Pinecone vector index
    pub pinecone: PineconeConfig,
    /// Shared HTTP client settings
    pub http: HttpConfig,
    /// Retrieval settings
    pub retrieval: RetrievalConfig,
    /// Interactive session settings
    pub session: SessionConfig,
    /// Chunking settings for ingestion
    pub chunking: ChunkingConfig,
    /// Ingestion throughput settings
    pub ingestion: IngestionConfig,
}

/// Backend provider selection for embeddings and chat
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Google Gemini API
    #[default]
    Gemini,
    /// Local Ollama server
    Ollama,
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key (usually supplied via GEMINI_API_KEY)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// REST base URL
    pub base_url: String,
    /// Chat model
    pub generation_model: String,
    /// Embedding model
    pub embedding_model: String,
    /// Embedding dimensions produced by `embedding_model`
    pub dimensions: usize,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            generation_model: "gemini-2.0-flash-exp".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            dimensions: 768,
            temperature: 0.1,
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Embedding dimensions produced by `embed_model`
    pub dimensions: usize,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "llama3.2".to_string(),
            dimensions: 768,
            temperature: 0.1,
        }
    }
}

/// Pinecone index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    /// API key (usually supplied via PINECONE_API_KEY)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Index name, used to resolve the data-plane host
    pub index_name: Option<String>,
    /// Data-plane host; skips control-plane resolution when set
    pub index_host: Option<String>,
    /// Control-plane URL
    pub control_plane_url: String,
    /// Namespace to query and upsert into
    pub namespace: Option<String>,
    /// Metadata key holding the chunk text
    pub text_key: String,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            index_name: None,
            index_host: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
            namespace: None,
            text_key: "text".to_string(),
        }
    }
}

/// HTTP client configuration shared by all external services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests (0 = single attempt)
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_retries: 0,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nearest neighbours requested per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

/// Interactive session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Keyword (case-insensitive) that ends the session
    pub exit_keyword: String,
    /// Prompt shown when waiting for input
    pub prompt: String,
    /// Expert persona the assistant adopts
    pub persona: String,
    /// Compare embedding and index dimensions before starting
    pub verify_dimensions: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exit_keyword: "exit".to_string(),
            prompt: "Ask me anything --> ".to_string(),
            persona: "a data structure and algorithms expert".to_string(),
            verify_dimensions: true,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size (skip smaller chunks)
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_size: 20,
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Texts per embedding request and vectors per upsert request
    pub batch_size: usize,
    /// Embedding requests in flight at once
    pub max_concurrency: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_concurrency: 5,
        }
    }
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Default config file location (`<config dir>/convo-rag/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("convo-rag").join("config.toml"))
    }

    /// Load configuration: explicit file, else the default location if present,
    /// else built-in defaults. Environment variables (and `.env`) are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::debug!("Using config file {}", path.display());
                    Self::from_file(path)?
                }
                None => Self::default(),
            },
        };

        if let Ok(env_path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", env_path.display());
        }
        config.apply_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// Overlay values from the environment.
    ///
    /// Takes a lookup function so tests do not have to touch process state.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY") {
            self.gemini.api_key = Some(key);
        }
        if let Some(key) = non_empty("PINECONE_API_KEY") {
            self.pinecone.api_key = Some(key);
        }
        if let Some(name) = non_empty("PINECONE_INDEX_NAME") {
            self.pinecone.index_name = Some(name);
        }
        if let Some(host) = non_empty("PINECONE_INDEX_HOST") {
            self.pinecone.index_host = Some(host);
        }
        if let Some(backend) = non_empty("CONVO_RAG_BACKEND") {
            match backend.to_lowercase().as_str() {
                "gemini" => self.backend = BackendProvider::Gemini,
                "ollama" => self.backend = BackendProvider::Ollama,
                other => tracing::warn!("Ignoring unknown CONVO_RAG_BACKEND '{}'", other),
            }
        }
    }

    /// Validate settings required to run a session
    pub fn validate(&self) -> Result<()> {
        if self.backend == BackendProvider::Gemini && self.gemini.api_key.is_none() {
            return Err(Error::config(
                "Gemini backend selected but GEMINI_API_KEY is not set",
            ));
        }
        if self.pinecone.api_key.is_none() {
            return Err(Error::config("PINECONE_API_KEY is not set"));
        }
        if self.pinecone.index_host.is_none() && self.pinecone.index_name.is_none() {
            return Err(Error::config(
                "Either PINECONE_INDEX_HOST or PINECONE_INDEX_NAME must be set",
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be at least 1"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.session.exit_keyword.trim().is_empty() {
            return Err(Error::config("session.exit_keyword must not be empty"));
        }
        Ok(())
    }

    /// Embedding dimensions of the selected backend
    pub fn embedding_dimensions(&self) -> usize {
        match self.backend {
            BackendProvider::Gemini => self.gemini.dimensions,
            BackendProvider::Ollama => self.ollama.dimensions,
        }
    }
}
