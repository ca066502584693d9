use std::collections::BTreeSet;
use std::time::Duration;

use crate::ledger::{Ledger, SortSpec};
use crate::view_model::{ActiveJobView, AppViewModel, JobRowView};
use crate::{Effect, JobId, JobStatus};

pub const SUCCESS_NOTICE_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreOptions {
    /// How long a success message stays visible.
    pub notice_duration: Duration,
    /// Save a completed audit's CSV without waiting for the user.
    pub auto_download: bool,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            notice_duration: SUCCESS_NOTICE_DURATION,
            auto_download: true,
        }
    }
}

/// Blocking-spinner state of the submit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Busy {
    #[default]
    Idle,
    /// Waiting for the creation response.
    Submitting,
    /// Job accepted, waiting for its first status.
    AwaitingFirstStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveJob {
    pub(crate) job_id: JobId,
    pub(crate) status: JobStatus,
}

/// A completed result the user can save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOffer {
    pub reference: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    options: CoreOptions,
    input: String,
    busy: Busy,
    ledger: Ledger,
    ledger_loading: bool,
    sort: SortSpec,
    error: Option<String>,
    success: Option<String>,
    notice_token: u64,
    active_job: Option<ActiveJob>,
    download_offer: Option<DownloadOffer>,
    polling: BTreeSet<JobId>,
    downloads_in_flight: usize,
    last_saved: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CoreOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn view(&self) -> AppViewModel {
        let rows = self
            .ledger
            .sorted_view(self.sort)
            .iter()
            .map(JobRowView::from_record)
            .collect();
        AppViewModel {
            input: self.input.clone(),
            busy: self.busy,
            ledger_loading: self.ledger_loading,
            error: self.error.clone(),
            success: self.success.clone(),
            active_job: self.active_job.as_ref().map(|job| ActiveJobView {
                job_id: job.job_id.clone(),
                status: job.status.clone(),
            }),
            download_offer: self.download_offer.clone(),
            sort: self.sort,
            job_count: self.ledger.len(),
            rows,
            polling: self.polling.iter().cloned().collect(),
            downloads_in_flight: self.downloads_in_flight,
            last_saved: self.last_saved.clone(),
            settled: self.is_settled(),
            dirty: self.dirty,
        }
    }

    /// Nothing is in flight: no request, poller or download outstanding.
    pub fn is_settled(&self) -> bool {
        self.busy == Busy::Idle
            && !self.ledger_loading
            && self.polling.is_empty()
            && self.downloads_in_flight == 0
    }

    /// Returns whether the view changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn options(&self) -> CoreOptions {
        self.options
    }

    pub(crate) fn busy(&self) -> Busy {
        self.busy
    }

    pub(crate) fn set_busy(&mut self, busy: Busy) {
        self.busy = busy;
    }

    pub(crate) fn input(&self) -> &str {
        &self.input
    }

    pub(crate) fn set_input(&mut self, input: String) {
        self.input = input;
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub(crate) fn set_ledger_loading(&mut self, loading: bool) {
        self.ledger_loading = loading;
    }

    pub(crate) fn sort(&self) -> SortSpec {
        self.sort
    }

    pub(crate) fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Show a success message and clear any error. The returned effect
    /// dismisses it later; a newer message invalidates older timers.
    pub(crate) fn show_success(&mut self, message: impl Into<String>) -> Effect {
        self.success = Some(message.into());
        self.error = None;
        self.notice_token += 1;
        Effect::ScheduleNoticeDismiss {
            token: self.notice_token,
            after: self.options.notice_duration,
        }
    }

    pub(crate) fn expire_notice(&mut self, token: u64) -> bool {
        if token == self.notice_token && self.success.is_some() {
            self.success = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn clear_messages(&mut self) {
        self.error = None;
        self.success = None;
    }

    pub(crate) fn clear_success(&mut self) {
        self.success = None;
    }

    pub(crate) fn set_active_job(&mut self, job_id: JobId, status: JobStatus) {
        self.active_job = Some(ActiveJob { job_id, status });
    }

    pub(crate) fn is_active_job(&self, job_id: &str) -> bool {
        self.active_job
            .as_ref()
            .is_some_and(|job| job.job_id == job_id)
    }

    pub(crate) fn set_active_status(&mut self, job_id: &str, status: JobStatus) {
        if let Some(job) = self.active_job.as_mut().filter(|job| job.job_id == job_id) {
            job.status = status;
        }
    }

    /// Forget the active job if it is `job_id`; releases the spinner.
    pub(crate) fn release_active_job(&mut self, job_id: &str) {
        if self.is_active_job(job_id) {
            self.active_job = None;
            self.busy = Busy::Idle;
        }
    }

    pub(crate) fn clear_active_job(&mut self) {
        self.active_job = None;
    }

    pub(crate) fn set_download_offer(&mut self, offer: Option<DownloadOffer>) {
        self.download_offer = offer;
    }

    pub(crate) fn take_download_offer(&mut self) -> Option<DownloadOffer> {
        self.download_offer.take()
    }

    /// Returns false when `job_id` already has a running poller.
    pub(crate) fn begin_polling(&mut self, job_id: &str) -> bool {
        self.polling.insert(job_id.to_string())
    }

    pub(crate) fn end_polling(&mut self, job_id: &str) {
        self.polling.remove(job_id);
    }

    pub(crate) fn begin_download(&mut self) {
        self.downloads_in_flight += 1;
    }

    pub(crate) fn end_download(&mut self) {
        self.downloads_in_flight = self.downloads_in_flight.saturating_sub(1);
    }

    pub(crate) fn set_last_saved(&mut self, path: String) {
        self.last_saved = Some(path);
    }
}
