use crate::{JobId, JobRecord, JobStatus, SortKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Startup, or the user asked for a fresh copy of the audit list.
    LedgerRefreshRequested,
    LedgerLoaded(Vec<JobRecord>),
    LedgerLoadFailed { message: String },
    /// User edited the URL input.
    InputChanged(String),
    /// User submitted the current URL input.
    SubmitClicked,
    /// The service accepted the audit and will process it in the background.
    SubmissionAccepted {
        job_id: JobId,
        url: String,
        created_at: String,
    },
    /// The service answered with the CSV itself and it was saved locally.
    SyncFileSaved { file_name: String, path: String },
    SubmissionFailed { message: String },
    /// A poller saw a non-terminal status.
    StatusObserved { job_id: JobId, status: JobStatus },
    /// First status response of a poller.
    InitialStatusReceived { job_id: JobId },
    AuditCompleted {
        job_id: JobId,
        download_ref: String,
        file_name: String,
    },
    AuditFailed { job_id: JobId },
    /// A poll request failed; the poller stopped.
    PollAborted { job_id: JobId, message: String },
    /// The poller ran out of attempts.
    PollAbandoned { job_id: JobId },
    /// User clicked a column header.
    SortToggled(SortKey),
    /// User accepted the pending download offer.
    DownloadOfferAccepted,
    /// User clicked the download action of a ledger row.
    DownloadRowClicked { job_id: JobId },
    DownloadSaved { path: String },
    DownloadFailed { message: String },
    NoticeExpired { token: u64 },
    /// Render tick; no state change.
    Tick,
    NoOp,
}
