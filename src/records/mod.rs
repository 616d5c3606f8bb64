use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Row to insert for a completed upload. `status` is always the terminal
/// `processed` marker; the service never writes intermediate rows.
#[derive(Debug, Clone, Serialize)]
pub struct NewAudioRecord {
    pub audio_url: String,
    pub source_url: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl NewAudioRecord {
    pub fn processed(
        audio_url: String,
        source_url: String,
        file_name: String,
        file_path: String,
        file_size: i64,
        mime_type: String,
    ) -> Self {
        Self {
            audio_url,
            source_url,
            file_name,
            file_path,
            file_size,
            mime_type,
            status: "processed".to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Stored row as returned by the database, including its assigned id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub audio_url: String,
    pub source_url: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Seam between the orchestrator and the remote metadata table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert one row and return it as stored.
    async fn insert(&self, record: NewAudioRecord) -> Result<AudioRecord>;
}

/// Recorder targeting a PostgREST-style table endpoint
pub struct RestRecorder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestRecorder {
    pub fn new(base_url: String, api_key: String, table: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            table,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.table
        )
    }
}

#[async_trait]
impl MetadataStore for RestRecorder {
    async fn insert(&self, record: NewAudioRecord) -> Result<AudioRecord> {
        tracing::info!("Inserting metadata row for {}", record.file_path);

        let response = self
            .http
            .post(self.endpoint())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(&[&record])
            .send()
            .await
            .map_err(|e| Error::RecordInsertFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RecordInsertFailed(format!(
                "HTTP {}: {}",
                status,
                body.trim()
            )));
        }

        let rows: Vec<AudioRecord> = response
            .json()
            .await
            .map_err(|e| Error::RecordInsertFailed(format!("invalid response body: {}", e)))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::RecordInsertFailed("empty representation returned".into()))
    }
}
