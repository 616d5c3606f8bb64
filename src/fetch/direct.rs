use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::verify_output_file;
use crate::{Error, Result};

/// Direct-file retrieval via a follow-redirects curl subprocess
pub struct CurlFetcher {
    program: PathBuf,
    timeout: Duration,
}

impl CurlFetcher {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

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

    fn build_args(&self, url: &str, dest: &Path) -> Vec<OsString> {
        vec![
            // Follow redirects, fail on HTTP errors instead of saving the body
            "--location".into(),
            "--fail".into(),
            "--silent".into(),
            "--show-error".into(),
            "--output".into(),
            dest.as_os_str().to_os_string(),
            url.into(),
        ]
    }

    /// Download a direct audio URL into `dest`.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::debug!("Downloading direct file with curl: {}", url);

        let output = Command::new(&self.program)
            .args(self.build_args(url, dest))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(result) => result.map_err(|e| {
                Error::DownloadFailed(format!("failed to run {}: {}", self.program.display(), e))
            })?,
            Err(_) => return Err(Error::FetchTimeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::DownloadFailed(format!(
                "curl failed: {}",
                stderr.trim()
            )));
        }

        if !verify_output_file(dest) {
            return Err(Error::DownloadFailed(
                "curl exited successfully but produced no output file".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_follow_redirects_and_fail_on_http_errors() {
        let fetcher = CurlFetcher::new("curl".into(), Duration::from_secs(60));
        let args = fetcher.build_args("https://example.com/song.mp3", Path::new("/tmp/a.mp3"));

        assert!(args.contains(&OsString::from("--location")));
        assert!(args.contains(&OsString::from("--fail")));
        assert_eq!(
            args.last().unwrap(),
            &OsString::from("https://example.com/song.mp3")
        );
    }

    #[tokio::test]
    async fn slow_tool_is_killed_and_reported_as_timeout() {
        let dir = tempfile::TempDir::new().unwrap();
        let slow_tool = dir.path().join("slow-curl");
        fs_err::write(&slow_tool, "#!/bin/sh\nsleep 30\n").unwrap();
        use std::os::unix::fs::PermissionsExt;
        fs_err::set_permissions(&slow_tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let fetcher = CurlFetcher::new(slow_tool, Duration::from_millis(200));
        let err = fetcher
            .fetch(
                "https://example.com/song.mp3",
                &dir.path().join("never.mp3"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FetchTimeout(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_download_failure() {
        let fetcher = CurlFetcher::new("definitely-not-a-real-binary".into(), Duration::from_secs(5));
        let err = fetcher
            .fetch("https://example.com/song.mp3", Path::new("/tmp/never.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DownloadFailed(_)));
    }
}
