use audit_logging::{audit_debug, audit_error, audit_warn};

use crate::ledger::LedgerUpdate;
use crate::validate::validate_url;
use crate::{AppState, Busy, DownloadOffer, Effect, JobRecord, JobStatus, Msg};

pub const MSG_AUDIT_STARTED: &str = "Audit started successfully! Processing...";
pub const MSG_AUDIT_COMPLETED: &str = "Audit completed! Your data is ready for download.";
pub const MSG_SYNC_DOWNLOADED: &str = "CSV file downloaded successfully!";
pub const MSG_AUDIT_FAILED: &str = "Audit processing failed";
pub const MSG_POLL_TIMEOUT: &str =
    "Audit processing is taking longer than expected. Please check back later.";

/// File name used when saving a ledger row's result.
pub fn row_file_name(job_id: &str) -> String {
    format!("audit-{job_id}.csv")
}

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::LedgerRefreshRequested => {
            state.set_ledger_loading(true);
            state.mark_dirty();
            vec![Effect::LoadLedger]
        }
        Msg::LedgerLoaded(records) => {
            state.ledger_mut().replace_all(records);
            state.set_ledger_loading(false);
            state.mark_dirty();
            Vec::new()
        }
        Msg::LedgerLoadFailed { message } => {
            audit_error!("Failed to fetch audits: {}", message);
            state.set_ledger_loading(false);
            state.mark_dirty();
            Vec::new()
        }
        Msg::InputChanged(text) => {
            if state.busy() != Busy::Submitting && state.input() != text {
                state.set_input(text);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SubmitClicked => submit(&mut state),
        Msg::SubmissionAccepted {
            job_id,
            url,
            created_at,
        } => {
            state.set_busy(Busy::AwaitingFirstStatus);
            state.set_active_job(job_id.clone(), JobStatus::Processing);
            let notice = state.show_success(MSG_AUDIT_STARTED);
            state
                .ledger_mut()
                .insert(JobRecord::starting(job_id.clone(), url, created_at));
            state.set_input(String::new());
            state.mark_dirty();

            let mut effects = vec![notice];
            if state.begin_polling(&job_id) {
                effects.push(Effect::StartPolling { job_id });
            } else {
                audit_warn!("Job {} is already being polled", job_id);
            }
            effects
        }
        Msg::SyncFileSaved { file_name, path } => {
            audit_debug!("Synchronous result {} saved to {}", file_name, path);
            state.set_busy(Busy::Idle);
            state.clear_active_job();
            state.set_download_offer(None);
            state.set_input(String::new());
            state.set_last_saved(path);
            state.set_ledger_loading(true);
            let notice = state.show_success(MSG_SYNC_DOWNLOADED);
            state.mark_dirty();
            vec![notice, Effect::LoadLedger]
        }
        Msg::SubmissionFailed { message } => {
            state.set_error(message);
            state.set_busy(Busy::Idle);
            state.mark_dirty();
            Vec::new()
        }
        Msg::StatusObserved { job_id, status } => {
            apply_status(&mut state, &job_id, status.clone(), None);
            state.set_active_status(&job_id, status);
            state.mark_dirty();
            Vec::new()
        }
        Msg::InitialStatusReceived { job_id } => {
            if state.is_active_job(&job_id) && state.busy() == Busy::AwaitingFirstStatus {
                state.set_busy(Busy::Idle);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::AuditCompleted {
            job_id,
            download_ref,
            file_name,
        } => {
            state.end_polling(&job_id);
            let applied = apply_status(
                &mut state,
                &job_id,
                JobStatus::Completed,
                Some(download_ref.clone()),
            );
            if applied == LedgerUpdate::Terminal {
                let already_completed = state
                    .ledger()
                    .get(&job_id)
                    .is_some_and(|record| record.status == JobStatus::Completed);
                if !already_completed {
                    state.release_active_job(&job_id);
                    state.mark_dirty();
                    return (state, Vec::new());
                }
                // A refreshed snapshot got there first.
                state
                    .ledger_mut()
                    .set_download_ref(&job_id, download_ref.clone());
            }
            let was_active = state.is_active_job(&job_id);
            state.release_active_job(&job_id);
            let mut effects = vec![state.show_success(MSG_AUDIT_COMPLETED)];
            if !was_active {
                audit_debug!(
                    "Job {} completed in the background; no download offered",
                    job_id
                );
            } else if state.options().auto_download {
                state.set_download_offer(None);
                state.begin_download();
                effects.push(Effect::Materialize {
                    reference: download_ref,
                    file_name,
                });
            } else {
                state.set_download_offer(Some(DownloadOffer {
                    reference: download_ref,
                    file_name,
                }));
            }
            state.mark_dirty();
            effects
        }
        Msg::AuditFailed { job_id } => {
            state.end_polling(&job_id);
            apply_status(&mut state, &job_id, JobStatus::Failed, None);
            state.release_active_job(&job_id);
            state.set_error(MSG_AUDIT_FAILED);
            state.mark_dirty();
            Vec::new()
        }
        Msg::PollAborted { job_id, message } => {
            state.end_polling(&job_id);
            state.release_active_job(&job_id);
            state.set_error(message);
            state.mark_dirty();
            Vec::new()
        }
        Msg::PollAbandoned { job_id } => {
            state.end_polling(&job_id);
            state.release_active_job(&job_id);
            state.set_error(MSG_POLL_TIMEOUT);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SortToggled(key) => {
            let next = state.sort().toggled(key);
            state.set_sort(next);
            state.mark_dirty();
            Vec::new()
        }
        Msg::DownloadOfferAccepted => match state.take_download_offer() {
            Some(offer) => {
                state.clear_success();
                state.begin_download();
                state.mark_dirty();
                vec![Effect::Materialize {
                    reference: offer.reference,
                    file_name: offer.file_name,
                }]
            }
            None => Vec::new(),
        },
        Msg::DownloadRowClicked { job_id } => {
            let reference = state
                .ledger()
                .get(&job_id)
                .filter(|record| record.status == JobStatus::Completed)
                .and_then(|record| record.download_ref.clone());
            match reference {
                Some(reference) => {
                    state.begin_download();
                    state.mark_dirty();
                    vec![Effect::Materialize {
                        reference,
                        file_name: row_file_name(&job_id),
                    }]
                }
                None => {
                    audit_debug!("Job {} has no downloadable result", job_id);
                    Vec::new()
                }
            }
        }
        Msg::DownloadSaved { path } => {
            state.end_download();
            state.set_last_saved(path);
            state.mark_dirty();
            Vec::new()
        }
        Msg::DownloadFailed { message } => {
            state.end_download();
            state.set_error(message);
            state.mark_dirty();
            Vec::new()
        }
        Msg::NoticeExpired { token } => {
            if state.expire_notice(token) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut AppState) -> Vec<Effect> {
    if state.busy() == Busy::Submitting {
        return Vec::new();
    }
    state.clear_messages();
    state.clear_active_job();
    state.set_download_offer(None);
    state.mark_dirty();

    match validate_url(state.input()) {
        Ok(_) => {
            state.set_busy(Busy::Submitting);
            vec![Effect::SubmitAudit {
                url: state.input().to_string(),
            }]
        }
        Err(err) => {
            state.set_error(err.to_string());
            Vec::new()
        }
    }
}

fn apply_status(
    state: &mut AppState,
    job_id: &str,
    status: JobStatus,
    download_ref: Option<String>,
) -> LedgerUpdate {
    let outcome = state.ledger_mut().update_status(job_id, status, download_ref);
    match outcome {
        LedgerUpdate::Applied => {}
        LedgerUpdate::Missing => {
            audit_debug!("Status for job {} not in ledger; ignored", job_id);
        }
        LedgerUpdate::Terminal => {
            audit_warn!("Job {} already finished; status update ignored", job_id);
        }
    }
    outcome
}
