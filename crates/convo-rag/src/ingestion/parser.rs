//! Document parsing for PDF and plain-text sources

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// How long pdf-extract may run before falling back to lopdf
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Text,
    Markdown,
}

impl FileType {
    /// Detect the type from a file extension (case-insensitive)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "txt" | "text" => Some(FileType::Text),
            "md" | "markdown" => Some(FileType::Markdown),
            _ => None,
        }
    }

    /// Detect the type from a file name
    pub fn from_filename(filename: &str) -> Option<Self> {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Text of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// Page number (1-indexed), when the extractor knows it
    pub page_number: Option<u32>,
    pub content: String,
}

/// Parsed document with extracted text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Source file name
    pub filename: String,
    pub file_type: FileType,
    /// Extracted text, page by page when available
    pub pages: Vec<PageContent>,
}

/// Replace ligatures and typographic punctuation that PDF fonts leave behind
fn cleanup_pdf_text(text: &str) -> String {
    const REPLACEMENTS: &[(char, &str)] = &[
        ('\u{2010}', "-"),
        ('\u{2011}', "-"),
        ('\u{2013}', "-"),
        ('\u{2014}', "--"),
        ('\u{2212}', "-"),
        ('\u{2018}', "'"),
        ('\u{2019}', "'"),
        ('\u{201C}', "\""),
        ('\u{201D}', "\""),
        ('\u{2022}', "* "),
        ('\u{2026}', "..."),
        ('\u{00A0}', " "),
        ('\u{FB00}', "ff"),
        ('\u{FB01}', "fi"),
        ('\u{FB02}', "fl"),
        ('\u{FB03}', "ffi"),
        ('\u{FB04}', "ffl"),
    ];

    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match REPLACEMENTS.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => result.push_str(to),
            None if ch == '\0' => {}
            None => result.push(ch),
        }
    }

    result
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// File parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let file_type = FileType::from_filename(filename).ok_or_else(|| {
            Error::UnsupportedFileType(format!(
                "{} (supported: .pdf, .txt, .md)",
                filename
            ))
        })?;

        let pages = match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data)?,
            FileType::Text | FileType::Markdown => Self::parse_text(data),
        };

        if pages.iter().all(|p| p.content.trim().is_empty()) {
            return Err(Error::file_parse(filename, "No text content could be extracted"));
        }

        Ok(ParsedDocument {
            filename: filename.to_string(),
            file_type,
            pages,
        })
    }

    fn parse_text(data: &[u8]) -> Vec<PageContent> {
        vec![PageContent {
            page_number: None,
            content: String::from_utf8_lossy(data).into_owned(),
        }]
    }

    fn parse_pdf(filename: &str, data: &[u8]) -> Result<Vec<PageContent>> {
        match Self::extract_pdf_with_timeout(data) {
            Ok(text) if !text.trim().is_empty() => Ok(vec![PageContent {
                page_number: None,
                content: cleanup_pdf_text(&text),
            }]),
            Ok(_) => {
                tracing::warn!("pdf-extract found no text in {}, trying lopdf", filename);
                Self::extract_pages_with_lopdf(filename, data)
            }
            Err(message) => {
                tracing::warn!("pdf-extract failed for {}: {}, trying lopdf", filename, message);
                Self::extract_pages_with_lopdf(filename, data)
            }
        }
    }

    /// Run pdf-extract on a worker thread so pathological fonts cannot hang ingestion
    fn extract_pdf_with_timeout(data: &[u8]) -> std::result::Result<String, String> {
        let data = data.to_vec();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string());
            let _ = tx.send(result);
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(format!("timed out after {:?}", PDF_EXTRACT_TIMEOUT))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err("extraction thread panicked".to_string()),
        }
    }

    /// Page-by-page fallback extraction
    fn extract_pages_with_lopdf(filename: &str, data: &[u8]) -> Result<Vec<PageContent>> {
        let document = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for page_number in document.get_pages().keys() {
            match document.extract_text(&[*page_number]) {
                Ok(text) => {
                    let content = cleanup_pdf_text(&text);
                    if !content.is_empty() {
                        pages.push(PageContent {
                            page_number: Some(*page_number),
                            content,
                        });
                    }
                }
                Err(e) => tracing::debug!("Could not extract page {}: {}", page_number, e),
            }
        }

        if pages.is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(pages)
    }
}
