//! Document ingestion: parsing, chunking and indexing

pub mod chunker;
pub mod parser;
pub mod pipeline;

pub use chunker::{TextChunk, TextChunker};
pub use parser::{FileParser, FileType, PageContent, ParsedDocument};
pub use pipeline::{record_id, IngestReport, Ingestor};
