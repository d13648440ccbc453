use serde::{Deserialize, Serialize};

/// Response to `POST /api/upload-chunked?action=init`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadResponse {
    pub success: bool,
    pub file_id: Option<String>,
    pub expected_chunks: Option<u64>,
    pub chunk_size: Option<u64>,
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Response to `POST /api/upload-chunked?action=chunk`.
///
/// The server uses one JSON shape for intermediate acknowledgements, the
/// terminal response, and errors; [`ChunkUploadResponse::outcome`] splits it
/// into the variants callers actually branch on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadResponse {
    pub success: bool,
    pub error: Option<String>,
    pub chunk_index: Option<u64>,
    pub received: Option<bool>,
    pub total_chunks_received: Option<u64>,
    pub expected_chunks: Option<u64>,
    pub url: Option<String>,
    pub id: Option<String>,
    pub expires_at: Option<String>,
    pub message: Option<String>,
}

/// Final result of a completed upload, carried by exactly one chunk response.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub url: String,
    pub id: String,
    pub expires_at: String,
}

#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    /// Intermediate acknowledgement; more chunks are expected.
    Received,
    /// Terminal response; the server has reassembled the file.
    Completed(UploadReceipt),
}

impl ChunkUploadResponse {
    /// The presence of `url` marks the terminal chunk; the server, not the
    /// client's loop counter, decides when the upload is complete.
    pub fn outcome(self) -> Result<ChunkOutcome, String> {
        if !self.success {
            return Err(self
                .error
                .unwrap_or_else(|| "unknown server error".to_string()));
        }
        if let Some(url) = self.url {
            let id = self
                .id
                .ok_or_else(|| "terminal response missing id".to_string())?;
            let expires_at = self
                .expires_at
                .ok_or_else(|| "terminal response missing expiresAt".to_string())?;
            return Ok(ChunkOutcome::Completed(UploadReceipt {
                url,
                id,
                expires_at,
            }));
        }
        Ok(ChunkOutcome::Received)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub url: String,
    pub download_url: Option<String>,
    pub pathname: String,
    pub size: u64,
    pub uploaded_at: String,
}

/// Response to `GET /api/files`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResponse {
    pub success: bool,
    pub files: Option<Vec<FileEntry>>,
    pub count: Option<u64>,
    pub error: Option<String>,
}

/// Body of `DELETE /api/files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileRequest {
    pub pathname: String,
}

/// Minimal acknowledgement shape shared by the remaining endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiAck {
    pub success: bool,
    pub error: Option<String>,
    pub message: Option<String>,
}
