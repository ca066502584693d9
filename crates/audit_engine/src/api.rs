use audit_core::{JobId, JobRecord, JobStatus};
use audit_logging::{audit_debug, audit_warn};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Response;
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::{ClientError, ClientSettings, CreatedAudit, DownloadInfo};

const HTTP_ERROR: &str = "HTTP error! status";
const RESULT_FETCH_ERROR: &str = "Failed to fetch audit data";
const FILE_FETCH_ERROR: &str = "Failed to download file";

/// The remote audit service.
#[async_trait::async_trait]
pub trait AuditApi: Send + Sync {
    /// `POST /audit`
    async fn create_audit(&self, url: &str) -> Result<CreatedAudit, ClientError>;
    /// `GET /audit/{id}/status`
    async fn audit_status(&self, job_id: &str) -> Result<JobStatus, ClientError>;
    /// `GET /audit/{id}/download`
    async fn download_info(&self, job_id: &str) -> Result<DownloadInfo, ClientError>;
    /// `GET /audit`
    async fn list_audits(&self) -> Result<Vec<JobRecord>, ClientError>;
    /// Raw bytes behind a result reference.
    async fn fetch_bytes(&self, reference: &str) -> Result<Vec<u8>, ClientError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuditRequest<'a> {
    url: &'a str,
    include_screenshot: bool,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuditResponse {
    #[serde(default, deserialize_with = "lenient_id")]
    audit_id: Option<JobId>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadResponse {
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuditListResponse {
    #[serde(default)]
    data: Vec<AuditRecordWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditRecordWire {
    #[serde(default, deserialize_with = "lenient_id")]
    audit_id: Option<JobId>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

impl AuditRecordWire {
    fn into_record(self) -> Option<JobRecord> {
        let job_id = self.audit_id.filter(|id| !id.is_empty())?;
        let status = JobStatus::parse(self.status.as_deref().unwrap_or_default());
        // Only completed records carry a usable result reference.
        let download_ref = self.download_url.filter(|_| status == JobStatus::Completed);
        Some(JobRecord {
            job_id,
            url: self.url.unwrap_or_default(),
            status,
            created_at: self.created_at,
            download_ref,
        })
    }
}

/// Accept ids sent as JSON strings or numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<JobId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(id)) => Some(id),
        Some(serde_json::Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone)]
pub struct ReqwestAuditApi {
    client: reqwest::Client,
    settings: ClientSettings,
}

impl ReqwestAuditApi {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ClientError::network(err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.settings.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::Protocol(format!(
                    "base url {} cannot take a path",
                    self.settings.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T>(&self, url: Url, context: &str) -> Result<T, ClientError>
    where
        T: for<'de> Deserialize<'de>,
    {
        audit_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let response = ensure_success(response, context)?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        decode_json(&body)
    }
}

#[async_trait::async_trait]
impl AuditApi for ReqwestAuditApi {
    async fn create_audit(&self, url: &str) -> Result<CreatedAudit, ClientError> {
        let endpoint = self.endpoint(&["audit"])?;
        let body = serde_json::to_vec(&CreateAuditRequest {
            url,
            include_screenshot: false,
            format: "csv",
        })
        .map_err(|err| ClientError::Protocol(err.to_string()))?;

        audit_debug!("POST {}", endpoint);
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let response = ensure_success(response, HTTP_ERROR)?;

        let content_type = header_str(&response, CONTENT_TYPE.as_str());
        let file_name = header_str(&response, CONTENT_DISPOSITION.as_str())
            .as_deref()
            .and_then(content_disposition_file_name);
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        if content_type.is_some_and(|ct| ct.contains("application/json")) {
            let parsed: CreateAuditResponse = decode_json(&body)?;
            Ok(CreatedAudit::Job {
                audit_id: parsed.audit_id.filter(|id| !id.is_empty()),
            })
        } else {
            Ok(CreatedAudit::File {
                bytes: body.to_vec(),
                file_name,
            })
        }
    }

    async fn audit_status(&self, job_id: &str) -> Result<JobStatus, ClientError> {
        let url = self.endpoint(&["audit", job_id, "status"])?;
        let parsed: StatusResponse = self.get_json(url, HTTP_ERROR).await?;
        Ok(JobStatus::parse(parsed.status.as_deref().unwrap_or_default()))
    }

    async fn download_info(&self, job_id: &str) -> Result<DownloadInfo, ClientError> {
        let url = self.endpoint(&["audit", job_id, "download"])?;
        let parsed: DownloadResponse = self.get_json(url, RESULT_FETCH_ERROR).await?;
        let download_url = parsed
            .download_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ClientError::Protocol("No download URL received from server".into()))?;
        Ok(DownloadInfo {
            download_url,
            file_name: parsed.file_name.filter(|name| !name.is_empty()),
        })
    }

    async fn list_audits(&self) -> Result<Vec<JobRecord>, ClientError> {
        let url = self.endpoint(&["audit"])?;
        let parsed: AuditListResponse = self.get_json(url, HTTP_ERROR).await?;
        let total = parsed.data.len();
        let records: Vec<JobRecord> = parsed
            .data
            .into_iter()
            .filter_map(AuditRecordWire::into_record)
            .collect();
        if records.len() < total {
            audit_warn!(
                "Dropped {} audit records without an id",
                total - records.len()
            );
        }
        Ok(records)
    }

    async fn fetch_bytes(&self, reference: &str) -> Result<Vec<u8>, ClientError> {
        // References are usually absolute; relative ones resolve against the API root.
        let url = Url::parse(reference)
            .or_else(|_| self.settings.base_url.join(reference))
            .map_err(|err| ClientError::Protocol(format!("invalid download reference: {err}")))?;

        audit_debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let response = ensure_success(response, FILE_FETCH_ERROR)?;

        let max_bytes = self.settings.max_download_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(max_bytes, content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

fn ensure_success(response: Response, context: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ClientError::http_status(context, status.as_u16()))
    }
}

fn decode_json<T>(body: &[u8]) -> Result<T, ClientError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_slice(body)
        .map_err(|err| ClientError::Protocol(format!("unexpected response body: {err}")))
}

fn header_str(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

fn too_large(max_bytes: u64, actual: u64) -> ClientError {
    ClientError::network(format!(
        "{FILE_FETCH_ERROR}: response too large (max {max_bytes}, got {actual})"
    ))
}

/// `attachment; filename="report.csv"` -> `report.csv`
pub(crate) fn content_disposition_file_name(header: &str) -> Option<String> {
    header.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::network(format!("request timed out: {err}"));
    }
    ClientError::network(err.to_string())
}
