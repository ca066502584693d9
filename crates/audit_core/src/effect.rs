use std::time::Duration;

use crate::JobId;

/// Side effects requested by [`crate::update`]; the app runs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the server's audit list and replace the ledger with it.
    LoadLedger,
    /// Create an audit for an already validated URL.
    SubmitAudit { url: String },
    StartPolling { job_id: JobId },
    /// Fetch the bytes behind `reference` and save them as `file_name`.
    Materialize { reference: String, file_name: String },
    /// Deliver `Msg::NoticeExpired { token }` after `after`.
    ScheduleNoticeDismiss { token: u64, after: Duration },
}
