//! Audio Relay - a single-endpoint HTTP service for capturing audio from media URLs
//!
//! Accepts a YouTube watch link or a direct audio-file link, retrieves the audio
//! with external tools (yt-dlp / curl), uploads the result to S3 and records one
//! metadata row in a remote table.

pub mod api;
pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod records;
pub mod storage;
pub mod temp;

pub use config::Config;
pub use pipeline::{Pipeline, ProcessOutcome};
pub use records::AudioRecord;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the processing pipeline
///
/// Client faults map to HTTP 400, everything else to the unified
/// "Processing failed" 500 response.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("Audio extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Fetch timed out after {0}s")]
    FetchTimeout(u64),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Public URL resolution failed: {0}")]
    PublicUrlResolutionFailed(String),

    #[error("Record insert failed: {0}")]
    RecordInsertFailed(String),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True when the failure was caused by the request itself rather than
    /// a downstream stage.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Error::InvalidRequest(_) | Error::UnsupportedUrl(_))
    }
}
