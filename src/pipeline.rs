use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use crate::fetch::{self, AudioFormat, SourceFetcher, SourceKind};
use crate::records::{AudioRecord, MetadataStore, NewAudioRecord};
use crate::storage::ArtifactStore;
use crate::temp::ScratchFile;
use crate::Result;

/// Working state for one request. Owned by the pipeline for the duration
/// of a single call, never shared.
#[derive(Debug)]
struct RetrievalJob {
    source_url: String,
    kind: SourceKind,
    format: AudioFormat,
    file_name: String,
    storage_key: String,
}

impl RetrievalJob {
    fn new(url: &str, kind: SourceKind) -> Self {
        let format = kind.format();
        // Millisecond timestamp plus a short random suffix so overlapping
        // requests can never collide on the temp path or storage key
        let request_id = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            &uuid::Uuid::new_v4().to_string()[..8]
        );
        let file_name = format!("audio-{}.{}", request_id, format.as_str());
        let storage_key = format!("audios/{}", file_name);

        Self {
            source_url: url.to_string(),
            kind,
            format,
            file_name,
            storage_key,
        }
    }
}

/// Result of a successful pipeline run
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub audio_url: String,
    pub record: AudioRecord,
}

/// Orchestrates one request: classify, fetch, upload, resolve, record.
///
/// Stages run strictly in order and any failure short-circuits the rest.
/// The temporary file is removed on every exit path via [`ScratchFile`].
pub struct Pipeline {
    fetcher: Arc<dyn SourceFetcher>,
    store: Arc<dyn ArtifactStore>,
    recorder: Arc<dyn MetadataStore>,
    scratch_dir: TempDir,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        store: Arc<dyn ArtifactStore>,
        recorder: Arc<dyn MetadataStore>,
    ) -> Result<Self> {
        let scratch_dir = TempDir::new()?;
        Ok(Self {
            fetcher,
            store,
            recorder,
            scratch_dir,
        })
    }

    /// Directory holding in-flight downloads
    pub fn scratch_dir(&self) -> &Path {
        self.scratch_dir.path()
    }

    /// Run the full pipeline for one source URL.
    ///
    /// A row is inserted only after the object is uploaded and its public
    /// URL resolved. If the insert fails the uploaded object stays behind
    /// as an orphan; no compensating delete is attempted.
    pub async fn process(&self, url: &str) -> Result<ProcessOutcome> {
        let kind = fetch::classify(url)?;
        let job = RetrievalJob::new(url, kind);

        tracing::info!(
            "Processing {} ({:?}) into {}",
            job.source_url,
            job.kind,
            job.storage_key
        );

        let mut scratch = ScratchFile::reserve(self.scratch_dir.path(), &job.file_name);

        let outcome = self.run_stages(&job, scratch.path()).await;

        scratch.release();
        outcome
    }

    async fn run_stages(&self, job: &RetrievalJob, audio_path: &Path) -> Result<ProcessOutcome> {
        self.fetcher
            .fetch(&job.source_url, job.kind, audio_path)
            .await?;

        let bytes = fs_err::read(audio_path)?;
        let file_size = bytes.len() as i64;

        self.store
            .put(&job.storage_key, bytes, job.format.mime_type())
            .await?;

        let audio_url = self.store.public_url(&job.storage_key)?;

        let record = self
            .recorder
            .insert(NewAudioRecord::processed(
                audio_url.clone(),
                job.source_url.clone(),
                job.file_name.clone(),
                job.storage_key.clone(),
                file_size,
                job.format.mime_type().to_string(),
            ))
            .await?;

        tracing::info!("Processed {} -> {}", job.source_url, audio_url);

        Ok(ProcessOutcome { audio_url, record })
    }
}
