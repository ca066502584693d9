use chrono::DateTime;

use crate::ledger::parse_timestamp_millis;
use crate::validate::display_name;
use crate::{Busy, DownloadOffer, JobId, JobRecord, JobStatus, SortSpec};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub input: String,
    pub busy: Busy,
    pub ledger_loading: bool,
    /// Persistent inline error.
    pub error: Option<String>,
    /// Auto-dismissed success message.
    pub success: Option<String>,
    pub active_job: Option<ActiveJobView>,
    pub download_offer: Option<DownloadOffer>,
    pub sort: SortSpec,
    pub job_count: usize,
    /// Ledger rows in presentation order.
    pub rows: Vec<JobRowView>,
    pub polling: Vec<JobId>,
    pub downloads_in_flight: usize,
    pub last_saved: Option<String>,
    pub settled: bool,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveJobView {
    pub job_id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Download,
    Pending,
    Processing,
    NotAvailable,
}

impl RowAction {
    pub fn label(self) -> &'static str {
        match self {
            RowAction::Download => "Download CSV",
            RowAction::Pending => "Pending...",
            RowAction::Processing => "Processing...",
            RowAction::NotAvailable => "Not available",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub website_name: String,
    pub url_label: String,
    pub created_label: String,
    pub status: JobStatus,
    pub status_label: String,
    pub download_ref: Option<String>,
    pub action: RowAction,
}

impl JobRowView {
    pub(crate) fn from_record(record: &JobRecord) -> Self {
        let action = match (&record.status, &record.download_ref) {
            (JobStatus::Completed, Some(_)) => RowAction::Download,
            (JobStatus::Pending, _) => RowAction::Pending,
            (JobStatus::Processing, _) => RowAction::Processing,
            _ => RowAction::NotAvailable,
        };
        let status_label = match record.status.as_str() {
            "" => "unknown".to_string(),
            other => other.to_string(),
        };
        Self {
            job_id: record.job_id.clone(),
            website_name: display_name(&record.url),
            url_label: if record.url.is_empty() {
                "N/A".to_string()
            } else {
                record.url.clone()
            },
            created_label: created_label(record.created_at.as_deref()),
            status: record.status.clone(),
            status_label,
            download_ref: record.download_ref.clone(),
            action,
        }
    }
}

fn created_label(created_at: Option<&str>) -> String {
    let Some(raw) = created_at.filter(|raw| !raw.is_empty()) else {
        return "Date unknown".to_string();
    };
    parse_timestamp_millis(raw)
        .and_then(DateTime::from_timestamp_millis)
        .map(|when| when.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| raw.to_string())
}
