use clap::Parser;
use std::path::PathBuf;
use url::Url;

use crate::{Error, Result};

/// Service configuration, read from CLI flags with environment fallbacks.
#[derive(Debug, Clone, Parser)]
#[command(name = "audio-relay", about = "Capture audio from media URLs into remote storage")]
pub struct Config {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// S3 bucket receiving uploaded audio files
    #[arg(long, env = "STORAGE_BUCKET")]
    pub storage_bucket: String,

    /// AWS region of the bucket
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub aws_region: String,

    /// Optional base URL overriding the default virtual-hosted S3 address
    /// when resolving public URLs (e.g. a CDN in front of the bucket)
    #[arg(long, env = "PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    /// Base URL of the metadata database's REST API
    #[arg(long, env = "DATABASE_API_URL")]
    pub database_api_url: String,

    /// API key / bearer credential for the metadata database
    #[arg(long, env = "DATABASE_API_KEY")]
    pub database_api_key: String,

    /// Table receiving one row per processed file
    #[arg(long, env = "AUDIO_TABLE", default_value = "audio_files")]
    pub audio_table: String,

    /// Overall timeout for a single fetch subprocess, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 180)]
    pub fetch_timeout_secs: u64,

    /// Explicit path to the yt-dlp binary (default: bundled `bin/yt-dlp`
    /// next to the executable, falling back to PATH)
    #[arg(long, env = "YTDLP_PATH")]
    pub ytdlp_path: Option<PathBuf>,

    /// Explicit path to the curl binary used for direct downloads
    #[arg(long, env = "CURL_PATH")]
    pub curl_path: Option<PathBuf>,

    /// Directory containing ffmpeg, forwarded to yt-dlp when set
    #[arg(long, env = "FFMPEG_LOCATION")]
    pub ffmpeg_location: Option<PathBuf>,
}

impl Config {
    /// Validate values that clap cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.storage_bucket.trim().is_empty() {
            return Err(Error::Config("STORAGE_BUCKET must not be empty".into()));
        }

        let parsed = Url::parse(&self.database_api_url)
            .map_err(|e| Error::Config(format!("DATABASE_API_URL is not a valid URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(
                "DATABASE_API_URL must use HTTP or HTTPS".into(),
            ));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(Error::Config("FETCH_TIMEOUT_SECS must be positive".into()));
        }

        Ok(())
    }

    /// AWS region for the S3 client
    pub fn region(&self) -> aws_config::Region {
        aws_config::Region::new(self.aws_region.clone())
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs)
    }
}
