//! Document loading: plain text and PDF.
//!
//! The content type is chosen from the file extension. Extraction never
//! panics; failures come back as [`ExtractError`] and batch callers skip
//! the file.

use std::path::Path;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A document's extracted text plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// File name, used as the display name in the cache.
    pub name: String,
    pub content_type: &'static str,
    pub text: String,
}

/// Content type for a path, by extension (case-insensitive).
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "txt" | "text" => Some(MIME_TEXT),
        "md" | "markdown" => Some(MIME_MARKDOWN),
        _ => None,
    }
}

/// Extract UTF-8 text from raw bytes of the given content type.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_TEXT | MIME_MARKDOWN => Ok(String::from_utf8_lossy(bytes).into_owned()),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

/// Read and extract a document from disk.
pub fn load_document(path: &Path) -> Result<LoadedDocument, ExtractError> {
    let content_type = content_type_for(path).ok_or_else(|| {
        ExtractError::UnsupportedContentType(
            path.extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| "(no extension)".to_string()),
        )
    })?;

    let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(LoadedDocument {
        name,
        content_type,
        text: extract_text(&bytes, content_type)?,
    })
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type_for(&PathBuf::from("a/b.PDF")), Some(MIME_PDF));
        assert_eq!(content_type_for(&PathBuf::from("notes.md")), Some(MIME_MARKDOWN));
        assert_eq!(content_type_for(&PathBuf::from("notes.txt")), Some(MIME_TEXT));
        assert_eq!(content_type_for(&PathBuf::from("image.png")), None);
        assert_eq!(content_type_for(&PathBuf::from("README")), None);
    }

    #[test]
    fn unsupported_content_type_returns_error() {
        let err = extract_text(b"foo", "application/octet-stream").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn text_is_decoded_lossily() {
        let text = extract_text(b"caf\xc3\xa9 \xff", MIME_TEXT).unwrap();
        assert!(text.starts_with("café "));
    }

    #[test]
    fn load_document_reads_text_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.md");
        std::fs::write(&path, "# Notes\n\nHello.").unwrap();

        let doc = load_document(&path).unwrap();
        assert_eq!(doc.name, "notes.md");
        assert_eq!(doc.content_type, MIME_MARKDOWN);
        assert_eq!(doc.text, "# Notes\n\nHello.");
    }

    #[test]
    fn load_document_missing_file_is_io_error() {
        let err = load_document(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[test]
    fn load_document_rejects_unknown_extension() {
        let err = load_document(Path::new("photo.jpeg")).unwrap_err();
        assert!(err.to_string().contains(".jpeg"));
    }
}
