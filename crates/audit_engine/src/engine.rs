use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use audit_core::JobId;
use audit_logging::{audit_error, audit_info, audit_warn};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::materialize::Materializer;
use crate::persist::AtomicFileWriter;
use crate::poller::{ChannelPollSink, Poller, Timer, TokioTimer};
use crate::submit::submit_audit;
use crate::{
    AuditApi, ClientError, ClientSettings, EngineEvent, PollSettings, ReqwestAuditApi,
    SubmitError, SubmitOutcome,
};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct EngineConfig {
    pub client: ClientSettings,
    pub poll: PollSettings,
    pub output_dir: PathBuf,
    /// Source of `created_at` stamps and of the date in default file names.
    pub clock: Clock,
}

impl EngineConfig {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            client: ClientSettings::default(),
            poll: PollSettings::default(),
            output_dir,
            clock: Arc::new(Utc::now),
        }
    }
}

enum EngineCommand {
    LoadLedger,
    Submit { url: String },
    StartPolling { job_id: JobId },
    Materialize { reference: String, file_name: String },
}

struct Worker {
    api: Arc<dyn AuditApi>,
    poller: Poller,
    materializer: Materializer,
    clock: Clock,
    active_pollers: Arc<Mutex<HashSet<JobId>>>,
}

/// Removes a job from the running-poller set when its loop ends, however it ends.
struct PollerGuard {
    job_id: JobId,
    active: Arc<Mutex<HashSet<JobId>>>,
}

impl Drop for PollerGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.job_id);
        }
    }
}

pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, ClientError> {
        let api = Arc::new(ReqwestAuditApi::new(config.client.clone())?);
        Ok(Self::with_parts(config, api, Arc::new(TokioTimer)))
    }

    /// Build an engine over any service implementation and timer.
    pub fn with_parts(config: EngineConfig, api: Arc<dyn AuditApi>, timer: Arc<dyn Timer>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let worker = Arc::new(Worker {
            poller: Poller::new(api.clone(), timer, config.poll),
            materializer: Materializer::new(
                api.clone(),
                AtomicFileWriter::new(config.output_dir.clone()),
            ),
            api,
            clock: config.clock.clone(),
            active_pollers: Arc::new(Mutex::new(HashSet::new())),
        });

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                let worker = worker.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    worker.handle_command(command, event_tx).await;
                });
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn load_ledger(&self) {
        let _ = self.cmd_tx.send(EngineCommand::LoadLedger);
    }

    pub fn submit(&self, url: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { url: url.into() });
    }

    pub fn start_polling(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::StartPolling { job_id });
    }

    pub fn materialize(&self, reference: impl Into<String>, file_name: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Materialize {
            reference: reference.into(),
            file_name: file_name.into(),
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

impl Worker {
    async fn handle_command(&self, command: EngineCommand, event_tx: mpsc::Sender<EngineEvent>) {
        match command {
            EngineCommand::LoadLedger => {
                audit_info!("Loading audit list");
                let result = self.api.list_audits().await;
                if let Err(err) = &result {
                    audit_error!("Failed to fetch audits: {}", err);
                }
                let _ = event_tx.send(EngineEvent::LedgerLoaded(result));
            }
            EngineCommand::Submit { url } => {
                audit_info!("Submitting {}", url);
                let event = self.submit(url).await;
                let _ = event_tx.send(event);
            }
            EngineCommand::StartPolling { job_id } => {
                let Some(_guard) = self.claim_poller(&job_id) else {
                    audit_warn!("Job {} is already being polled", job_id);
                    return;
                };
                audit_info!("Start polling job {}", job_id);
                let sink = ChannelPollSink::new(event_tx);
                self.poller.run(&job_id, &sink).await;
            }
            EngineCommand::Materialize {
                reference,
                file_name,
            } => {
                audit_info!("Downloading {}", file_name);
                let result = self.materializer.materialize(&reference, &file_name).await;
                let _ = event_tx.send(EngineEvent::Materialized { file_name, result });
            }
        }
    }

    async fn submit(&self, url: String) -> EngineEvent {
        let now = (self.clock)();
        match submit_audit(self.api.as_ref(), &url, now.date_naive()).await {
            Ok(SubmitOutcome::AsyncJobStarted { job_id }) => EngineEvent::AuditAccepted {
                job_id,
                url,
                created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
            Ok(SubmitOutcome::SyncFileReady { bytes, file_name }) => {
                match self.materializer.save(&file_name, &bytes) {
                    Ok(path) => EngineEvent::SyncFileSaved { file_name, path },
                    Err(err) => EngineEvent::SubmissionFailed(SubmitError::Save(err)),
                }
            }
            Err(err) => EngineEvent::SubmissionFailed(SubmitError::Client(err)),
        }
    }

    fn claim_poller(&self, job_id: &str) -> Option<PollerGuard> {
        let mut active = self.active_pollers.lock().ok()?;
        if !active.insert(job_id.to_string()) {
            return None;
        }
        Some(PollerGuard {
            job_id: job_id.to_string(),
            active: self.active_pollers.clone(),
        })
    }
}
