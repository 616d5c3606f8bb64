use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::verify_output_file;
use crate::{Error, Result};

/// Streaming-site audio retrieval via the yt-dlp subprocess
pub struct YtDlpFetcher {
    program: PathBuf,
    ffmpeg_location: Option<PathBuf>,
    timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(program: PathBuf, ffmpeg_location: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            program,
            ffmpeg_location,
            timeout,
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Arguments for an audio-only extraction into `dest`.
    /// Built as a list, never interpolated through a shell.
    fn build_args(&self, url: &str, dest: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--extract-audio".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--no-playlist".into(),
            "--output".into(),
            dest.as_os_str().to_os_string(),
        ];
        if let Some(ffmpeg) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.as_os_str().to_os_string());
        }
        args.push(url.into());
        args
    }

    /// Extract audio from a watch page into `dest`.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::debug!("Extracting audio with yt-dlp: {}", url);

        let output = Command::new(&self.program)
            .args(self.build_args(url, dest))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(result) => result.map_err(|e| {
                Error::ExtractionFailed(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?,
            // Dropping the output future kills the child (kill_on_drop)
            Err(_) => return Err(Error::FetchTimeout(self.timeout.as_secs())),
        };

        tracing::debug!(
            "yt-dlp stdout: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        tracing::debug!(
            "yt-dlp stderr: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExtractionFailed(format!(
                "yt-dlp failed: {}",
                stderr.trim()
            )));
        }

        if !verify_output_file(dest) {
            return Err(Error::ExtractionFailed(
                "yt-dlp exited successfully but produced no output file".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_request_mp3_extraction() {
        let fetcher = YtDlpFetcher::new("yt-dlp".into(), None, Duration::from_secs(60));
        let args = fetcher.build_args(
            "https://www.youtube.com/watch?v=abc123",
            Path::new("/tmp/audio-1.mp3"),
        );

        assert!(args.contains(&OsString::from("--extract-audio")));
        assert!(args.contains(&OsString::from("mp3")));
        assert!(args.contains(&OsString::from("--no-playlist")));
        // URL is always the final argument
        assert_eq!(
            args.last().unwrap(),
            &OsString::from("https://www.youtube.com/watch?v=abc123")
        );
    }

    #[test]
    fn args_include_ffmpeg_location_when_set() {
        let fetcher = YtDlpFetcher::new(
            "yt-dlp".into(),
            Some(PathBuf::from("/opt/bin")),
            Duration::from_secs(60),
        );
        let args = fetcher.build_args("https://youtu.be/x", Path::new("/tmp/a.mp3"));

        let pos = args
            .iter()
            .position(|a| a == &OsString::from("--ffmpeg-location"))
            .unwrap();
        assert_eq!(args[pos + 1], OsString::from("/opt/bin"));
    }

    #[tokio::test]
    async fn slow_tool_is_killed_and_reported_as_timeout() {
        let dir = tempfile::TempDir::new().unwrap();
        let slow_tool = dir.path().join("slow-yt-dlp");
        fs_err::write(&slow_tool, "#!/bin/sh\nsleep 30\n").unwrap();
        use std::os::unix::fs::PermissionsExt;
        fs_err::set_permissions(&slow_tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let fetcher = YtDlpFetcher::new(slow_tool, None, Duration::from_millis(200));
        let err = fetcher
            .fetch("https://youtu.be/x", &dir.path().join("never.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FetchTimeout(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_extraction_failure() {
        let fetcher = YtDlpFetcher::new(
            "definitely-not-a-real-binary".into(),
            None,
            Duration::from_secs(5),
        );
        let err = fetcher
            .fetch("https://youtu.be/x", Path::new("/tmp/never-written.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExtractionFailed(_)));
    }
}
