use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use audit_core::{row_file_name, Effect, Msg};
use audit_engine::{EngineEvent, EngineHandle, PollEvent};
use audit_logging::audit_debug;

/// Something for the main loop to handle.
#[derive(Debug)]
pub enum Inbox {
    Msg(Msg),
    /// A line typed by the user.
    Line(String),
    /// Standard input was closed.
    Closed,
}

/// Executes core effects against the engine and local timers.
pub struct EffectRunner {
    engine: EngineHandle,
    inbox: mpsc::Sender<Inbox>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, inbox: mpsc::Sender<Inbox>) -> Self {
        Self { engine, inbox }
    }

    pub fn run(&self, effect: Effect) {
        audit_debug!("Effect {:?}", effect);
        match effect {
            Effect::LoadLedger => self.engine.load_ledger(),
            Effect::SubmitAudit { url } => self.engine.submit(url),
            Effect::StartPolling { job_id } => self.engine.start_polling(job_id),
            Effect::Materialize {
                reference,
                file_name,
            } => self.engine.materialize(reference, file_name),
            Effect::ScheduleNoticeDismiss { token, after } => {
                let inbox = self.inbox.clone();
                thread::spawn(move || {
                    thread::sleep(after);
                    let _ = inbox.send(Inbox::Msg(Msg::NoticeExpired { token }));
                });
            }
        }
    }

    /// Wait up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(engine_event_to_msg)
    }
}

/// Translate an engine event into the message the core understands.
pub fn engine_event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::LedgerLoaded(Ok(records)) => Msg::LedgerLoaded(records),
        EngineEvent::LedgerLoaded(Err(err)) => Msg::LedgerLoadFailed {
            message: err.to_string(),
        },
        EngineEvent::AuditAccepted {
            job_id,
            url,
            created_at,
        } => Msg::SubmissionAccepted {
            job_id,
            url,
            created_at,
        },
        EngineEvent::SyncFileSaved { file_name, path } => Msg::SyncFileSaved {
            file_name,
            path: path.display().to_string(),
        },
        EngineEvent::SubmissionFailed(err) => Msg::SubmissionFailed {
            message: err.to_string(),
        },
        EngineEvent::Poll(event) => match event {
            PollEvent::StatusObserved { job_id, status } => Msg::StatusObserved { job_id, status },
            PollEvent::InitialResponse { job_id } => Msg::InitialStatusReceived { job_id },
            PollEvent::Completed { job_id, download } => {
                let file_name = download
                    .file_name
                    .unwrap_or_else(|| row_file_name(&job_id));
                Msg::AuditCompleted {
                    job_id,
                    download_ref: download.download_url,
                    file_name,
                }
            }
            PollEvent::Failed { job_id } => Msg::AuditFailed { job_id },
            PollEvent::Aborted { job_id, error } => Msg::PollAborted {
                job_id,
                message: error.to_string(),
            },
            PollEvent::Abandoned { job_id, .. } => Msg::PollAbandoned { job_id },
        },
        EngineEvent::Materialized { result, .. } => match result {
            Ok(path) => Msg::DownloadSaved {
                path: path.display().to_string(),
            },
            Err(err) => Msg::DownloadFailed {
                message: err.to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_engine::{ClientError, DownloadInfo, MaterializeError};
    use pretty_assertions::assert_eq;

    #[test]
    fn completion_without_file_name_uses_row_name() {
        let msg = engine_event_to_msg(EngineEvent::Poll(PollEvent::Completed {
            job_id: "abc".into(),
            download: DownloadInfo {
                download_url: "https://files/abc.csv".into(),
                file_name: None,
            },
        }));
        assert_eq!(
            msg,
            Msg::AuditCompleted {
                job_id: "abc".into(),
                download_ref: "https://files/abc.csv".into(),
                file_name: "audit-abc.csv".into(),
            }
        );
    }

    #[test]
    fn failures_become_user_messages() {
        let msg = engine_event_to_msg(EngineEvent::Materialized {
            file_name: "x.csv".into(),
            result: Err(MaterializeError::Fetch(ClientError::Transport {
                status: Some(404),
                message: "Failed to download file: 404".into(),
            })),
        });
        assert_eq!(
            msg,
            Msg::DownloadFailed {
                message: "Failed to download file: 404".into()
            }
        );

        let msg = engine_event_to_msg(EngineEvent::Poll(PollEvent::Aborted {
            job_id: "abc".into(),
            error: ClientError::Protocol("bad body".into()),
        }));
        assert_eq!(
            msg,
            Msg::PollAborted {
                job_id: "abc".into(),
                message: "bad body".into()
            }
        );
    }
}
