//! Audit engine: talks to the audit service, runs pollers and saves results.
mod api;
mod engine;
mod filename;
mod materialize;
mod persist;
mod poller;
mod settings;
mod submit;
mod types;

pub use api::{AuditApi, ReqwestAuditApi};
pub use engine::{Clock, EngineConfig, EngineHandle};
pub use filename::{default_csv_file_name, sanitize_file_name};
pub use materialize::Materializer;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poller::{ChannelPollSink, PollSink, Poller, Timer, TokioTimer};
pub use settings::{ClientSettings, PollSettings, DEFAULT_BASE_URL};
pub use submit::{submit_audit, MSG_NO_AUDIT_ID};
pub use types::{
    ClientError, CreatedAudit, DownloadInfo, EngineEvent, MaterializeError, PollEvent,
    PollOutcome, SubmitError, SubmitOutcome,
};
