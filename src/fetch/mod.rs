use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::config::Config;
use crate::{Error, Result};

pub mod direct;
pub mod youtube;

/// Audio formats the service accepts for direct-file URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Aac,
    Ogg,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Aac => "aac",
            AudioFormat::Ogg => "ogg",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" => Some(AudioFormat::M4a),
            "wav" => Some(AudioFormat::Wav),
            "aac" => Some(AudioFormat::Aac),
            "ogg" => Some(AudioFormat::Ogg),
            _ => None,
        }
    }

    /// MIME type stored alongside the uploaded object
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Aac => "audio/aac",
            AudioFormat::Ogg => "audio/ogg",
        }
    }
}

/// How a source URL is retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Hosted watch page, needs the extraction tool
    Streaming,
    /// Plain audio file, fetched with the generic downloader
    Direct(AudioFormat),
}

impl SourceKind {
    /// Format of the file the fetch stage will produce.
    /// Streaming extractions are always converted to mp3.
    pub fn format(&self) -> AudioFormat {
        match self {
            SourceKind::Streaming => AudioFormat::Mp3,
            SourceKind::Direct(format) => *format,
        }
    }
}

const STREAMING_MARKERS: &[&str] = &[
    "youtube.com/watch",
    "youtu.be/",
    "youtube.com/embed/",
    "youtube.com/v/",
    "m.youtube.com/",
];

/// Classify a source URL, rejecting anything the service cannot retrieve.
///
/// Runs before any subprocess or network call so unsupported input is a
/// pure 400 with no side effects.
pub fn classify(url: &str) -> Result<SourceKind> {
    let parsed =
        Url::parse(url).map_err(|_| Error::UnsupportedUrl(format!("invalid URL: {}", url)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::UnsupportedUrl(format!(
            "URL must use HTTP or HTTPS: {}",
            url
        )));
    }

    let lower = url.to_lowercase();
    if STREAMING_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Ok(SourceKind::Streaming);
    }

    // Extension check on the path only, so query strings don't confuse it
    let path = parsed.path().to_lowercase();
    if let Some(ext) = Path::new(&path).extension().and_then(|e| e.to_str()) {
        if let Some(format) = AudioFormat::from_extension(ext) {
            return Ok(SourceKind::Direct(format));
        }
    }

    Err(Error::UnsupportedUrl(format!(
        "neither a recognized watch page nor an audio file: {}",
        url
    )))
}

/// Seam between the orchestrator and the external retrieval tools
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Populate `dest` with audio bytes from `url`, or fail.
    async fn fetch(&self, url: &str, kind: SourceKind, dest: &Path) -> Result<()>;
}

/// Production fetcher dispatching to yt-dlp or curl subprocesses
pub struct ToolFetcher {
    youtube: youtube::YtDlpFetcher,
    direct: direct::CurlFetcher,
}

impl ToolFetcher {
    pub fn new(config: &Config) -> Self {
        let timeout = config.fetch_timeout();
        let ytdlp = config
            .ytdlp_path
            .clone()
            .unwrap_or_else(|| bundled_tool("yt-dlp"));
        let curl = config
            .curl_path
            .clone()
            .unwrap_or_else(|| bundled_tool("curl"));

        Self {
            youtube: youtube::YtDlpFetcher::new(ytdlp, config.ffmpeg_location.clone(), timeout),
            direct: direct::CurlFetcher::new(curl, timeout),
        }
    }

    /// Report tools that do not answer `--version`, for a startup warning.
    pub async fn check_tools(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if !self.youtube.check_availability().await {
            missing.push("yt-dlp - required for YouTube extraction".to_string());
        }
        if !self.direct.check_availability().await {
            missing.push("curl - required for direct file downloads".to_string());
        }

        missing
    }
}

#[async_trait]
impl SourceFetcher for ToolFetcher {
    async fn fetch(&self, url: &str, kind: SourceKind, dest: &Path) -> Result<()> {
        match kind {
            SourceKind::Streaming => self.youtube.fetch(url, dest).await,
            SourceKind::Direct(_) => self.direct.fetch(url, dest).await,
        }
    }
}

/// Locate an optionally bundled executable: `bin/<name>` next to the running
/// binary wins, otherwise the bare name is resolved through PATH.
pub fn bundled_tool(name: &str) -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join("bin").join(name);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    PathBuf::from(name)
}

/// Verify the subprocess actually produced a file; exit status alone is
/// not trusted.
pub(crate) fn verify_output_file(dest: &Path) -> bool {
    dest.exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_links_are_streaming() {
        for url in [
            "https://www.youtube.com/watch?v=abc123",
            "https://YOUTU.BE/abc123",
            "https://m.youtube.com/watch?v=abc123",
            "https://www.youtube.com/embed/abc123",
        ] {
            assert_eq!(classify(url).unwrap(), SourceKind::Streaming, "{}", url);
        }
    }

    #[test]
    fn audio_extensions_are_direct() {
        assert_eq!(
            classify("https://example.com/song.mp3").unwrap(),
            SourceKind::Direct(AudioFormat::Mp3)
        );
        assert_eq!(
            classify("https://example.com/SONG.WAV").unwrap(),
            SourceKind::Direct(AudioFormat::Wav)
        );
        assert_eq!(
            classify("https://example.com/a/b/track.m4a?token=x").unwrap(),
            SourceKind::Direct(AudioFormat::M4a)
        );
        assert_eq!(
            classify("https://example.com/clip.aac").unwrap(),
            SourceKind::Direct(AudioFormat::Aac)
        );
        assert_eq!(
            classify("https://example.com/loop.ogg").unwrap(),
            SourceKind::Direct(AudioFormat::Ogg)
        );
    }

    #[test]
    fn everything_else_is_unsupported() {
        for url in [
            "not-a-url",
            "ftp://example.com/song.mp3",
            "https://example.com/page.html",
            "https://example.com/video.mp4",
            "https://vimeo.com/12345",
        ] {
            let err = classify(url).unwrap_err();
            assert!(matches!(err, Error::UnsupportedUrl(_)), "{}", url);
        }
    }

    #[test]
    fn streaming_always_yields_mp3() {
        assert_eq!(SourceKind::Streaming.format(), AudioFormat::Mp3);
        assert_eq!(
            SourceKind::Direct(AudioFormat::Ogg).format(),
            AudioFormat::Ogg
        );
    }

    #[test]
    fn bundled_tool_falls_back_to_path() {
        // No bin/ directory exists next to the test binary
        assert_eq!(bundled_tool("definitely-not-bundled"), PathBuf::from("definitely-not-bundled"));
    }
}
