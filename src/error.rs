//! Error types for the PDF signature stripper

use thiserror::Error;

/// Result type alias for the PDF signature stripper
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the PDF signature stripper
#[derive(Error, Debug)]
pub enum Error {
    /// A required request parameter is missing or blank
    #[error("Parameter '{name}' is required")]
    MissingParameter { name: &'static str },

    /// Object not present in storage
    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    /// Storage backend rejected or failed a transfer
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDF is encrypted; stripping signatures from those is not supported
    #[error("PDF is encrypted")]
    EncryptedPdf,

    /// Writing the processed document failed
    #[error("Failed to write PDF: {reason}")]
    WritePdf { reason: String },

    /// Blocking task failed to complete
    #[error("Task failed: {reason}")]
    Task { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Malformed storage endpoint
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path access denied (outside the storage root)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, library errors, file sizes) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::MissingParameter { .. } => self.to_string(),
            Error::ObjectNotFound { .. } => "Object not found".to_string(),
            Error::Storage { .. } => "Storage transfer failed".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::EncryptedPdf => "PDF is encrypted".to_string(),
            Error::WritePdf { .. } => "Failed to process PDF".to_string(),
            Error::Task { .. } => "Failed to process PDF".to_string(),
            Error::Configuration { .. } => "Server misconfigured".to_string(),
            Error::HttpRequest(_) => "Storage transfer failed".to_string(),
            Error::InvalidUrl(_) => "Server misconfigured".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::DownloadTooLarge { max_size, .. } => {
                format!("Download exceeds maximum size of {} bytes", max_size)
            }
        }
    }

    /// Whether the error was caused by the caller's request rather than by processing
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::MissingParameter { .. })
    }
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Error::InvalidPdf {
            reason: e.to_string(),
        }
    }
}
