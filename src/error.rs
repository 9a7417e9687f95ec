//! Error types for the flyer scanning pipeline.
//!
//! Only [`Error::InvalidDocument`] ever surfaces to a caller of
//! [`crate::scanner::Scanner::scan`]: layout extraction is the one stage
//! whose failure aborts a scan. Everything else (normalizer outages,
//! malformed blocks, cropper failures) is recovered locally.

/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while scanning a flyer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The PDF could not be decoded into positioned text spans.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Parse error at a specific byte offset inside the PDF.
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where the error occurred
        offset: usize,
        /// Reason for the parse failure
        reason: String,
    },

    /// Stream decoding error (FlateDecode, predictor, ...).
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// The normalizer backend failed or is not configured.
    ///
    /// Internal only: the normalizer converts this into a rule-based
    /// fallback result before it can reach a caller.
    #[error("Normalizer unavailable: {0}")]
    NormalizerUnavailable(String),

    /// The normalizer backend replied with something that is not the
    /// requested JSON shape.
    #[error("Invalid normalizer reply: {0}")]
    InvalidReply(String),

    /// The category source failed; the built-in table is used instead.
    #[error("Category source unavailable: {0}")]
    CategoriesUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error
    #[error("UTF-8 decoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_document_message() {
        let err = Error::InvalidDocument("no %PDF header".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid document"));
        assert!(msg.contains("no %PDF header"));
    }

    #[test]
    fn test_parse_error_carries_offset() {
        let err = Error::ParseError {
            offset: 512,
            reason: "unbalanced dictionary".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("512"));
        assert!(msg.contains("unbalanced dictionary"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
