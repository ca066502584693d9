use std::sync::{mpsc, Arc};
use std::time::Duration;

use audit_core::{JobStatus, NextStep, PollMachine, TickStart};
use audit_logging::{audit_debug, audit_info, audit_warn};

use crate::{AuditApi, ClientError, EngineEvent, PollEvent, PollOutcome, PollSettings};

/// Waits between poll ticks.
#[async_trait::async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait::async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub trait PollSink: Send + Sync {
    fn emit(&self, event: PollEvent);
}

pub struct ChannelPollSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelPollSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl PollSink for ChannelPollSink {
    fn emit(&self, event: PollEvent) {
        let _ = self.tx.send(EngineEvent::Poll(event));
    }
}

/// Drives one [`PollMachine`] against the service until it reaches a terminal phase.
///
/// Events for one job are emitted strictly in tick order; the next status
/// request is only sent after the previous tick's events went out.
#[derive(Clone)]
pub struct Poller {
    api: Arc<dyn AuditApi>,
    timer: Arc<dyn Timer>,
    settings: PollSettings,
}

impl Poller {
    pub fn new(api: Arc<dyn AuditApi>, timer: Arc<dyn Timer>, settings: PollSettings) -> Self {
        Self {
            api,
            timer,
            settings,
        }
    }

    pub async fn run(&self, job_id: &str, sink: &dyn PollSink) -> PollOutcome {
        let mut machine = PollMachine::new(self.settings.max_attempts);

        loop {
            match machine.begin_tick() {
                TickStart::FetchStatus { attempt } => {
                    audit_debug!("Polling job {} (attempt {})", job_id, attempt + 1);
                }
                TickStart::Abandon { attempts } => {
                    audit_warn!("Job {} still unfinished after {} polls", job_id, attempts);
                    sink.emit(PollEvent::Abandoned {
                        job_id: job_id.to_string(),
                        attempts,
                    });
                    return PollOutcome::Abandoned { attempts };
                }
                TickStart::Finished => {
                    return self.abort(
                        &mut machine,
                        job_id,
                        ClientError::Protocol("poll loop resumed after it finished".into()),
                        sink,
                    );
                }
            }

            let status = match self.api.audit_status(job_id).await {
                Ok(status) => status,
                Err(err) => return self.abort(&mut machine, job_id, err, sink),
            };
            let observed = machine.observe_status(&status);

            if let NextStep::Reschedule { recognized } = observed.next {
                if !recognized {
                    audit_warn!("Unknown audit status: {}", status);
                }
                sink.emit(PollEvent::StatusObserved {
                    job_id: job_id.to_string(),
                    status: status.clone(),
                });
            }
            if observed.first_response {
                sink.emit(PollEvent::InitialResponse {
                    job_id: job_id.to_string(),
                });
            }

            match observed.next {
                NextStep::Reschedule { .. } => {
                    self.timer.sleep(self.settings.interval).await;
                }
                NextStep::FetchResult => {
                    return match self.api.download_info(job_id).await {
                        Ok(download) => {
                            machine.result_fetched();
                            audit_info!("Job {} completed", job_id);
                            sink.emit(PollEvent::Completed {
                                job_id: job_id.to_string(),
                                download: download.clone(),
                            });
                            PollOutcome::Completed(download)
                        }
                        Err(err) => self.abort(&mut machine, job_id, err, sink),
                    };
                }
                NextStep::Failed => {
                    audit_warn!("Job {} reported {}", job_id, JobStatus::Failed);
                    sink.emit(PollEvent::Failed {
                        job_id: job_id.to_string(),
                    });
                    return PollOutcome::Failed;
                }
                NextStep::Ignored => {
                    return self.abort(
                        &mut machine,
                        job_id,
                        ClientError::Protocol("status arrived after polling finished".into()),
                        sink,
                    );
                }
            }
        }
    }

    fn abort(
        &self,
        machine: &mut PollMachine,
        job_id: &str,
        error: ClientError,
        sink: &dyn PollSink,
    ) -> PollOutcome {
        machine.abort();
        audit_warn!("Polling job {} aborted: {}", job_id, error);
        sink.emit(PollEvent::Aborted {
            job_id: job_id.to_string(),
            error: error.clone(),
        });
        PollOutcome::Aborted(error)
    }
}
