//! Audit client core: URL validation, the job ledger, the poll state machine
//! and the pure application state driven by [`update`].
mod effect;
mod ledger;
mod msg;
mod poll;
mod state;
mod update;
mod validate;
mod view_model;

pub use effect::Effect;
pub use ledger::{
    JobId, JobRecord, JobStatus, Ledger, LedgerUpdate, SortDirection, SortKey, SortSpec,
};
pub use msg::Msg;
pub use poll::{
    NextStep, Observed, PollMachine, PollPhase, TickStart, MAX_POLL_ATTEMPTS, POLL_INTERVAL,
};
pub use state::{AppState, Busy, CoreOptions, DownloadOffer, SUCCESS_NOTICE_DURATION};
pub use update::{
    row_file_name, update, MSG_AUDIT_COMPLETED, MSG_AUDIT_FAILED, MSG_AUDIT_STARTED,
    MSG_POLL_TIMEOUT, MSG_SYNC_DOWNLOADED,
};
pub use validate::{display_name, is_valid_url, validate_url, ValidationError};
pub use view_model::{ActiveJobView, AppViewModel, JobRowView, RowAction};
