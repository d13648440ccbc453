use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use futures::{StreamExt, stream::BoxStream};
use reqwest::Client;
use tokio::sync::mpsc;
use url::Url;

use crate::rest_types::{
    ApiAck, ChunkOutcome, ChunkUploadResponse, DeleteFileRequest, FileEntry, InitUploadResponse,
    ListFilesResponse, UploadReceipt,
};

const MEBIBYTE: u64 = 1024 * 1024;

/// Chunk size declared by the CLI; the server honors whatever `chunkSize` the
/// init call carries, so tests use smaller values.
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * MEBIBYTE;

const UPLOAD_CHUNKED_ROUTE: &str = "api/upload-chunked";
const FILES_ROUTE: &str = "api/files";

/// Granularity of progress reporting while a chunk body streams out.
const PROGRESS_SUB_CHUNK: usize = 64 * 1024;

#[derive(Clone, Debug, Default)]
pub struct UploadProgress {
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
}

#[derive(Debug)]
pub enum UploadEvent {
    Progress(UploadProgress),
    Complete(UploadReceipt),
}

/// Server-assigned upload session, immutable once the init call succeeds.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub file_id: String,
    pub filename: String,
    pub total_size: u64,
    pub chunk_size: u64,
    pub total_chunks: u64,
}

pub fn total_chunks(total_size: u64, chunk_size: u64) -> u64 {
    total_size.div_ceil(chunk_size)
}

/// Payload length of chunk `chunk_index`: a full chunk everywhere except the
/// tail, which carries whatever remains of the file.
pub fn chunk_payload_len(total_size: u64, chunk_size: u64, chunk_index: u64) -> u64 {
    (total_size - chunk_index * chunk_size).min(chunk_size)
}

pub struct BlobClient {
    client: Client,
    base_url: Url,
    chunk_size: u64,
}

impl BlobClient {
    pub fn new(base_url: Url) -> Self {
        Self::with_chunk_size(base_url, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(base_url: Url, chunk_size: u64) -> Self {
        Self {
            client: Client::new(),
            base_url,
            chunk_size,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn init_upload(&self, filename: &str, total_size: u64) -> Result<UploadSession> {
        let url = self
            .base_url
            .join(UPLOAD_CHUNKED_ROUTE)
            .context("Failed to construct upload URL")?;

        let response = self
            .client
            .post(url)
            .query(&[
                ("action", "init".to_string()),
                ("filename", filename.to_string()),
                ("totalSize", total_size.to_string()),
                ("chunkSize", self.chunk_size.to_string()),
            ])
            .send()
            .await
            .context("Failed to initialize upload session")?;

        if !response.status().is_success() {
            bail!(
                "Failed to initialize upload session: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let init: InitUploadResponse = response
            .json()
            .await
            .context("Failed to parse init response")?;

        if !init.success {
            bail!(
                "Failed to initialize upload session: {}",
                init.error
                    .unwrap_or_else(|| "unknown server error".to_string())
            );
        }
        let file_id = init
            .file_id
            .ok_or_else(|| anyhow!("Init response missing fileId"))?;

        Ok(UploadSession {
            file_id,
            filename: filename.to_string(),
            total_size,
            chunk_size: self.chunk_size,
            total_chunks: total_chunks(total_size, self.chunk_size),
        })
    }

    async fn upload_chunk(
        &self,
        file_id: &str,
        chunk_index: u64,
        data: Vec<u8>,
        progress_tx: mpsc::Sender<u64>,
    ) -> Result<ChunkOutcome> {
        let url = self
            .base_url
            .join(UPLOAD_CHUNKED_ROUTE)
            .context("Failed to construct upload URL")?;

        let pieces: Vec<Vec<u8>> = data
            .chunks(PROGRESS_SUB_CHUNK)
            .map(|piece| piece.to_vec())
            .collect();

        let stream = futures::stream::iter(pieces).map(move |piece| {
            let len = piece.len() as u64;
            let tx = progress_tx.clone();
            let _ = tx.try_send(len);
            Ok::<_, std::io::Error>(piece)
        });

        let body = reqwest::Body::wrap_stream(stream);

        let response = self
            .client
            .post(url)
            .query(&[
                ("action", "chunk".to_string()),
                ("fileId", file_id.to_string()),
                ("chunkIndex", chunk_index.to_string()),
            ])
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!(
                "{} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let parsed: ChunkUploadResponse = response
            .json()
            .await
            .context("Failed to parse chunk response")?;
        parsed.outcome().map_err(|error| anyhow!(error))
    }

    /// Uploads `path` as a sequence of fixed-size chunks, yielding progress
    /// events and finally `Complete` with the server's receipt.
    ///
    /// Validation failures surface before the stream exists, so a bad path
    /// never touches the network. Inside the stream every anomaly is fatal:
    /// no retries, no resume.
    pub fn chunked_upload<'a, P: AsRef<Path> + Send + 'a>(
        &'a self,
        path: P,
    ) -> Result<BoxStream<'a, Result<UploadEvent>>> {
        let metadata = std::fs::metadata(path.as_ref())
            .with_context(|| format!("File '{}' not found", path.as_ref().display()))?;
        if !metadata.is_file() {
            bail!("'{}' is not a regular file", path.as_ref().display());
        }
        let total_size = metadata.len();
        let filename = path
            .as_ref()
            .file_name()
            .ok_or_else(|| anyhow!("'{}' has no file name", path.as_ref().display()))?
            .to_string_lossy()
            .into_owned();

        let stream = async_stream::try_stream! {
            yield UploadEvent::Progress(UploadProgress {
                bytes_uploaded: 0,
                total_bytes: total_size,
            });

            let session = self.init_upload(&filename, total_size).await?;

            let mut file = File::open(path.as_ref())
                .with_context(|| format!("Failed to open '{}'", path.as_ref().display()))?;
            let mut bytes_uploaded = 0u64;

            let (progress_tx, mut progress_rx) = mpsc::channel::<u64>(64);

            let mut receipt = None;
            for chunk_index in 0..session.total_chunks {
                let chunk_len =
                    chunk_payload_len(session.total_size, session.chunk_size, chunk_index);
                let mut chunk_data = vec![0u8; chunk_len as usize];
                file.read_exact(&mut chunk_data).with_context(|| {
                    format!("Failed to read chunk {}/{}", chunk_index + 1, session.total_chunks)
                })?;

                let upload_fut = self.upload_chunk(
                    &session.file_id,
                    chunk_index,
                    chunk_data,
                    progress_tx.clone(),
                );
                tokio::pin!(upload_fut);

                let outcome: Result<ChunkOutcome> = loop {
                    tokio::select! {
                        biased;
                        result = &mut upload_fut => {
                            break result;
                        }
                        Some(bytes) = progress_rx.recv() => {
                            bytes_uploaded += bytes;
                            yield UploadEvent::Progress(UploadProgress {
                                bytes_uploaded,
                                total_bytes: total_size,
                            });
                        }
                    }
                };

                let outcome = outcome.with_context(|| {
                    format!("Failed to upload chunk {}/{}", chunk_index + 1, session.total_chunks)
                })?;

                match outcome {
                    ChunkOutcome::Completed(r) => {
                        receipt = Some(r);
                        break;
                    }
                    ChunkOutcome::Received => {}
                }
            }

            match receipt {
                Some(receipt) => yield UploadEvent::Complete(receipt),
                // The server attaches the download URL to whichever chunk
                // completes the declared size; never seeing one leaves the
                // session in an unknown state. Covers empty files too.
                None => Err(anyhow!(
                    "Upload finished but the server never sent a final response"
                ))?,
            }
        };

        Ok(Box::pin(stream))
    }

    pub async fn list_files(&self) -> Result<Vec<FileEntry>> {
        let url = self
            .base_url
            .join(FILES_ROUTE)
            .context("Failed to construct files URL")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch files")?;

        if !response.status().is_success() {
            bail!(
                "Failed to fetch files: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let list: ListFilesResponse = response
            .json()
            .await
            .context("Failed to parse file list")?;

        if !list.success {
            bail!(
                "Failed to fetch files: {}",
                list.error
                    .unwrap_or_else(|| "unknown server error".to_string())
            );
        }
        Ok(list.files.unwrap_or_default())
    }

    pub async fn delete_file(&self, pathname: &str) -> Result<()> {
        let url = self
            .base_url
            .join(FILES_ROUTE)
            .context("Failed to construct files URL")?;

        let response = self
            .client
            .delete(url)
            .json(&DeleteFileRequest {
                pathname: pathname.to_string(),
            })
            .send()
            .await
            .context("Failed to delete file")?;

        if !response.status().is_success() {
            bail!(
                "Failed to delete file: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }

        let ack: ApiAck = response
            .json()
            .await
            .context("Failed to parse delete response")?;

        if !ack.success {
            bail!(
                "Failed to delete file: {}",
                ack.error
                    .unwrap_or_else(|| "unknown server error".to_string())
            );
        }
        Ok(())
    }

    /// Streams `file_url` into `output`, returning the number of bytes written.
    pub async fn download(&self, file_url: Url, output: &Path) -> Result<u64> {
        let response = self
            .client
            .get(file_url)
            .send()
            .await
            .context("Failed to download file")?;

        if !response.status().is_success() {
            bail!("Failed to download file: {}", response.status());
        }

        let mut out = File::create(output)
            .with_context(|| format!("Failed to create '{}'", output.display()))?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(piece) = stream.next().await {
            let piece = piece.context("Failed to read download stream")?;
            out.write_all(&piece).context("Failed to write output file")?;
            written += piece.len() as u64;
        }
        Ok(written)
    }
}
