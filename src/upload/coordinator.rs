use crate::upload::error::{UploadError, GENERIC_TRANSFER_FAILURE};
use crate::upload::strategy::{bucket_object_url, UploadStrategy};
use crate::upload::types::{
    BatchReport, CandidateFile, FileStatus, UploadResult, UploadStatus, UploadTarget,
    ValidationOutcome,
};
use crate::upload::validation::{validate, AllowList};
use futures::future::join_all;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct UploadUrlRequest<'a> {
    username: &'a str,
    filename: &'a str,
    filetype: &'a str,
}

#[derive(Deserialize)]
struct UploadUrlResponse {
    #[serde(rename = "uploadURL")]
    upload_url: Option<String>,
    error: Option<String>,
}

/// Validates, places and transfers batches of files.
#[derive(Clone)]
pub struct UploadCoordinator {
    client: Client,
    strategy: UploadStrategy,
    allow_list: AllowList,
    status_sender: Option<Sender<FileStatus>>,
}

impl UploadCoordinator {
    pub fn new(client: Client, strategy: UploadStrategy, allow_list: AllowList) -> Self {
        Self {
            client,
            strategy,
            allow_list,
            status_sender: None,
        }
    }

    /// Streams a [`FileStatus`] for every file as the batch progresses.
    pub fn with_status_sender(mut self, sender: Sender<FileStatus>) -> Self {
        self.status_sender = Some(sender);
        self
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn validate(&self, files: Vec<CandidateFile>) -> ValidationOutcome {
        validate(files, &self.allow_list)
    }

    pub async fn request_target(
        &self,
        file: &CandidateFile,
        identity: &str,
    ) -> Result<UploadTarget, UploadError> {
        match &self.strategy {
            UploadStrategy::Direct { bucket_base } => Ok(UploadTarget {
                file_name: file.name.clone(),
                url: bucket_object_url(bucket_base, &file.name),
            }),
            UploadStrategy::Indirect { api_base } => {
                self.request_upload_url(api_base, file, identity).await
            }
        }
    }

    async fn request_upload_url(
        &self,
        api_base: &str,
        file: &CandidateFile,
        identity: &str,
    ) -> Result<UploadTarget, UploadError> {
        let url = format!("{}/upload", api_base);
        debug!("Requesting upload URL for '{}' from {}", file.name, url);

        let response = self
            .client
            .post(&url)
            .json(&UploadUrlRequest {
                username: identity,
                filename: &file.name,
                filetype: file.transfer_content_type(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed = serde_json::from_str::<UploadUrlResponse>(&body).ok();

        if !status.is_success() {
            let reason = parsed
                .and_then(|p| p.error)
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| format!("Failed to get upload URL for {}", file.name));
            return Err(UploadError::DestinationUnavailable(reason));
        }

        match parsed.and_then(|p| p.upload_url).filter(|u| !u.trim().is_empty()) {
            Some(url) => Ok(UploadTarget {
                file_name: file.name.clone(),
                url,
            }),
            None => Err(UploadError::DestinationUnavailable(format!(
                "Malformed upload URL response for {}",
                file.name
            ))),
        }
    }

    /// Writes the whole payload to `target` once. No retries.
    pub async fn transfer(&self, file: &CandidateFile, target: &UploadTarget) -> UploadResult {
        match self.put_object(file, target).await {
            Ok(()) => {
                info!("Uploaded '{}' ({} bytes)", file.name, file.size());
                UploadResult::Succeeded {
                    name: file.name.clone(),
                }
            }
            Err(e) => {
                warn!("Transfer of '{}' failed: {}", file.name, e);
                UploadResult::Failed {
                    name: file.name.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn put_object(&self, file: &CandidateFile, target: &UploadTarget) -> Result<(), UploadError> {
        let response = self
            .client
            .put(&target.url)
            .header(CONTENT_TYPE, file.transfer_content_type())
            .body(file.bytes.clone())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        debug!("Destination answered {} for '{}': {}", status, file.name, body);
        Err(UploadError::TransferFailed(
            destination_message(&body).unwrap_or_else(|| GENERIC_TRANSFER_FAILURE.to_string()),
        ))
    }

    /// Uploads every accepted file concurrently and waits for all of them to settle.
    pub async fn upload_batch(&self, files: Vec<CandidateFile>, identity: &str) -> BatchReport {
        let ValidationOutcome { accepted, rejected } = self.validate(files);

        for rejection in &rejected {
            warn!("Skipping '{}': {}", rejection.name, rejection.reason);
            self.emit(FileStatus {
                name: rejection.name.clone(),
                status: UploadStatus::Skipped(UploadError::from(rejection).to_string()),
            });
        }

        if accepted.is_empty() {
            info!("No accepted files in batch, nothing to upload");
            return BatchReport {
                results: Vec::new(),
                rejected,
            };
        }

        info!(
            "Uploading {} file(s) using the {} strategy",
            accepted.len(),
            self.strategy.name()
        );

        let pipelines = accepted.iter().map(|file| self.run_pipeline(file, identity));
        let results = join_all(pipelines).await;

        let report = BatchReport { results, rejected };
        info!(
            "Batch settled: {} succeeded, {} failed, {} rejected",
            report.succeeded().len(),
            report.failed().len(),
            report.rejected.len()
        );
        report
    }

    async fn run_pipeline(&self, file: &CandidateFile, identity: &str) -> UploadResult {
        self.emit(FileStatus {
            name: file.name.clone(),
            status: UploadStatus::Processing,
        });

        let result = match self.request_target(file, identity).await {
            Ok(target) => self.transfer(file, &target).await,
            Err(e) => {
                warn!("No upload destination for '{}': {}", file.name, e);
                UploadResult::Failed {
                    name: file.name.clone(),
                    reason: e.to_string(),
                }
            }
        };

        self.emit(result.to_status());
        result
    }

    fn emit(&self, status: FileStatus) {
        if let Some(sender) = &self.status_sender {
            sender.send(status).unwrap_or_default();
        }
    }
}

/// Error text reported by a destination: a JSON `error`/`message` field or
/// the `<Message>` element of an object-storage XML error.
fn destination_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return ["error", "message"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
    }

    xml_message(body)
}

/// Text of the first `<Message>` element, with entities and CDATA resolved.
fn xml_message(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut message = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if depth > 0 || e.local_name().as_ref() == b"Message" {
                    depth += 1;
                }
            }
            Ok(Event::End(_)) if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Text(e)) if depth > 0 => {
                push_unescaped(&mut message, &String::from_utf8_lossy(&e));
            }
            Ok(Event::GeneralRef(e)) if depth > 0 => {
                push_unescaped(&mut message, &format!("&{};", String::from_utf8_lossy(&e)));
            }
            Ok(Event::CData(e)) if depth > 0 => {
                message.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => (),
        }
        buf.clear();
    }

    Some(message.trim().to_string()).filter(|m| !m.is_empty())
}

fn push_unescaped(message: &mut String, raw: &str) {
    match unescape(raw) {
        Ok(text) => message.push_str(&text),
        Err(_) => message.push_str(raw),
    }
}
