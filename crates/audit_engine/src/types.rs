use std::path::PathBuf;

use audit_core::{JobId, JobRecord, JobStatus, ValidationError};
use thiserror::Error;

/// Failure talking to the audit service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Non-2xx response (`status` is set) or a network-level failure.
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// The response did not have the expected shape.
    #[error("{0}")]
    Protocol(String),
}

impl ClientError {
    pub(crate) fn http_status(context: &str, status: u16) -> Self {
        Self::Transport {
            status: Some(status),
            message: format!("{context}: {status}"),
        }
    }

    pub(crate) fn network(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status of a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Fetch(#[from] ClientError),
    #[error("Failed to save file: {0}")]
    Save(String),
}

/// Failure anywhere between pressing submit and having a job id or a saved file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Save(#[from] MaterializeError),
}

/// Raw answer of the creation endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedAudit {
    /// JSON body; `audit_id` is `None` when the body had no identifier.
    Job { audit_id: Option<JobId> },
    /// Non-JSON body: the finished CSV itself.
    File {
        bytes: Vec<u8>,
        file_name: Option<String>,
    },
}

/// Interpreted result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    AsyncJobStarted { job_id: JobId },
    SyncFileReady { bytes: Vec<u8>, file_name: String },
}

/// Where a completed audit's CSV can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub download_url: String,
    pub file_name: Option<String>,
}

/// Progress of one poller, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// A non-terminal status; apply it to the ledger.
    StatusObserved { job_id: JobId, status: JobStatus },
    /// The first status response arrived.
    InitialResponse { job_id: JobId },
    Completed {
        job_id: JobId,
        download: DownloadInfo,
    },
    /// The service reported the audit as failed.
    Failed { job_id: JobId },
    /// A status or result request failed; polling stopped.
    Aborted { job_id: JobId, error: ClientError },
    Abandoned { job_id: JobId, attempts: u32 },
}

/// How a poller ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(DownloadInfo),
    Failed,
    Aborted(ClientError),
    Abandoned { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    LedgerLoaded(Result<Vec<JobRecord>, ClientError>),
    AuditAccepted {
        job_id: JobId,
        url: String,
        created_at: String,
    },
    SyncFileSaved {
        file_name: String,
        path: PathBuf,
    },
    SubmissionFailed(SubmitError),
    Poll(PollEvent),
    Materialized {
        file_name: String,
        result: Result<PathBuf, MaterializeError>,
    },
}
