use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::validate::display_name;

/// Opaque audit identifier assigned by the remote service.
pub type JobId = String;

/// Lifecycle status reported by the audit service.
///
/// Statuses the client does not know about are kept verbatim so newer
/// servers keep working.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Starting,
    Pending,
    Processing,
    Completed,
    Failed,
    Unknown(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "starting" => Self::Starting,
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Starting => "starting",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// One of the statuses the service documents as "still working".
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Starting | Self::Pending | Self::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit request and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: JobId,
    pub url: String,
    pub status: JobStatus,
    /// ISO-8601 timestamp, local creation time for jobs submitted here.
    pub created_at: Option<String>,
    /// Present only once the job completed and its result reference was fetched.
    pub download_ref: Option<String>,
}

impl JobRecord {
    /// A freshly submitted job, before the first status poll.
    pub fn starting(
        job_id: impl Into<JobId>,
        url: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            url: url.into(),
            status: JobStatus::Starting,
            created_at: Some(created_at.into()),
            download_ref: None,
        }
    }

    /// Milliseconds since the epoch; missing or unparseable timestamps count as zero.
    pub fn created_at_millis(&self) -> i64 {
        self.created_at
            .as_deref()
            .and_then(parse_timestamp_millis)
            .unwrap_or(0)
    }
}

pub(crate) fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Derived hostname, see [`display_name`].
    WebsiteName,
    Url,
    CreatedAt,
    Status,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::WebsiteName,
        SortKey::Url,
        SortKey::CreatedAt,
        SortKey::Status,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::WebsiteName => "websiteName",
            SortKey::Url => "url",
            SortKey::CreatedAt => "createdAt",
            SortKey::Status => "status",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Presentation order of the ledger table. `key == None` keeps ledger order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub key: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self {
            key: Some(key),
            direction,
        }
    }

    /// Column-header click: the active ascending key flips to descending,
    /// anything else becomes ascending on `key`.
    pub fn toggled(self, key: SortKey) -> Self {
        let direction = if self.key == Some(key) && self.direction == SortDirection::Ascending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        Self::new(key, direction)
    }
}

fn compare_by_key(key: SortKey, a: &JobRecord, b: &JobRecord) -> Ordering {
    match key {
        SortKey::WebsiteName => display_name(&a.url).cmp(&display_name(&b.url)),
        SortKey::Url => a.url.cmp(&b.url),
        SortKey::CreatedAt => a.created_at_millis().cmp(&b.created_at_millis()),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}

/// Outcome of [`Ledger::update_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerUpdate {
    Applied,
    /// No record with that id; not an error.
    Missing,
    /// The record is already completed or failed and was left untouched.
    Terminal,
}

/// Newest-first collection of job records keyed by job id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ledger {
    records: Vec<JobRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    pub fn get(&self, job_id: &str) -> Option<&JobRecord> {
        self.records.iter().find(|record| record.job_id == job_id)
    }

    /// Prepend `record`. An existing record with the same id is replaced.
    pub fn insert(&mut self, record: JobRecord) {
        self.records.retain(|existing| existing.job_id != record.job_id);
        self.records.insert(0, record);
    }

    /// Set the status (and the download reference, when given) of one record.
    pub fn update_status(
        &mut self,
        job_id: &str,
        status: JobStatus,
        download_ref: Option<String>,
    ) -> LedgerUpdate {
        let Some(record) = self.records.iter_mut().find(|record| record.job_id == job_id) else {
            return LedgerUpdate::Missing;
        };
        if record.status.is_terminal() {
            return LedgerUpdate::Terminal;
        }
        record.status = status;
        if download_ref.is_some() {
            record.download_ref = download_ref;
        }
        LedgerUpdate::Applied
    }

    /// Attach a result reference to a completed record that has none yet.
    pub fn set_download_ref(&mut self, job_id: &str, reference: String) -> bool {
        let Some(record) = self
            .records
            .iter_mut()
            .find(|record| record.job_id == job_id && record.status == JobStatus::Completed)
        else {
            return false;
        };
        if record.download_ref.is_some() {
            return false;
        }
        record.download_ref = Some(reference);
        true
    }

    /// Swap in a server snapshot, dropping local-only state.
    pub fn replace_all(&mut self, records: Vec<JobRecord>) {
        self.records = records;
    }

    /// Records in presentation order; the ledger itself is not reordered.
    pub fn sorted_view(&self, spec: SortSpec) -> Vec<JobRecord> {
        let mut view = self.records.clone();
        if let Some(key) = spec.key {
            // `sort_by` is stable, so ties keep ledger order in both directions.
            view.sort_by(|a, b| {
                let ordering = compare_by_key(key, a, b);
                match spec.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        view
    }
}
