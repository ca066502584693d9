use std::sync::Once;

use audit_core::{
    update, AppState, Busy, CoreOptions, DownloadOffer, Effect, JobRecord, JobStatus, Msg,
    RowAction, MSG_AUDIT_COMPLETED, MSG_AUDIT_FAILED, MSG_POLL_TIMEOUT,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(audit_logging::initialize_for_tests);
}

const URL: &str = "https://example.com";
const BLOB: &str = "https://files.example.com/abc.csv";

fn started_job(options: CoreOptions) -> AppState {
    let (state, _) = update(
        AppState::with_options(options),
        Msg::InputChanged(URL.to_string()),
    );
    let (state, _) = update(state, Msg::SubmitClicked);
    let (state, _) = update(
        state,
        Msg::SubmissionAccepted {
            job_id: "abc".to_string(),
            url: URL.to_string(),
            created_at: "2026-10-18T12:00:00Z".to_string(),
        },
    );
    state
}

fn observe(state: AppState, status: JobStatus) -> AppState {
    update(
        state,
        Msg::StatusObserved {
            job_id: "abc".to_string(),
            status,
        },
    )
    .0
}

fn complete(state: AppState) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::AuditCompleted {
            job_id: "abc".to_string(),
            download_ref: BLOB.to_string(),
            file_name: "abc.csv".to_string(),
        },
    )
}

fn server_snapshot(status: JobStatus, download_ref: Option<&str>) -> Msg {
    Msg::LedgerLoaded(vec![JobRecord {
        job_id: "abc".to_string(),
        url: URL.to_string(),
        status,
        created_at: Some("2026-10-18T12:00:00Z".to_string()),
        download_ref: download_ref.map(ToOwned::to_owned),
    }])
}

fn running_job(options: CoreOptions) -> AppState {
    let state = observe(started_job(options), JobStatus::Processing);
    update(
        state,
        Msg::InitialStatusReceived {
            job_id: "abc".to_string(),
        },
    )
    .0
}

#[test]
fn processing_then_completed_updates_row_and_downloads() {
    init_logging();
    let state = observe(started_job(CoreOptions::default()), JobStatus::Processing);
    let (state, _) = update(
        state,
        Msg::InitialStatusReceived {
            job_id: "abc".to_string(),
        },
    );

    let record = state.ledger().get("abc").unwrap();
    assert_eq!(record.status, JobStatus::Processing);
    assert_eq!(record.download_ref, None);
    let view = state.view();
    assert_eq!(view.busy, Busy::Idle);
    assert_eq!(view.active_job.as_ref().unwrap().status, JobStatus::Processing);
    assert_eq!(view.rows[0].action, RowAction::Processing);

    let (state, effects) = complete(state);
    assert_eq!(
        effects.last(),
        Some(&Effect::Materialize {
            reference: BLOB.to_string(),
            file_name: "abc.csv".to_string(),
        })
    );
    let record = state.ledger().get("abc").unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.download_ref.as_deref(), Some(BLOB));

    let view = state.view();
    assert_eq!(view.success.as_deref(), Some(MSG_AUDIT_COMPLETED));
    assert_eq!(view.active_job, None);
    assert!(view.polling.is_empty());
    assert_eq!(view.downloads_in_flight, 1);
    assert_eq!(view.rows[0].action, RowAction::Download);
    assert!(!view.settled);

    let (state, _) = update(
        state,
        Msg::DownloadSaved {
            path: "downloads/abc.csv".to_string(),
        },
    );
    assert!(state.view().settled);
}

#[test]
fn without_auto_download_the_result_is_offered() {
    init_logging();
    let options = CoreOptions {
        auto_download: false,
        ..CoreOptions::default()
    };
    let (state, effects) = complete(started_job(options));

    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::Materialize { .. })));
    assert_eq!(
        state.view().download_offer,
        Some(DownloadOffer {
            reference: BLOB.to_string(),
            file_name: "abc.csv".to_string(),
        })
    );

    let (state, effects) = update(state, Msg::DownloadOfferAccepted);
    assert_eq!(
        effects,
        vec![Effect::Materialize {
            reference: BLOB.to_string(),
            file_name: "abc.csv".to_string(),
        }]
    );
    let view = state.view();
    assert_eq!(view.download_offer, None);
    assert_eq!(view.success, None);

    let (_, effects) = update(state, Msg::DownloadOfferAccepted);
    assert!(effects.is_empty());
}

#[test]
fn failed_audit_is_terminal() {
    init_logging();
    let state = observe(started_job(CoreOptions::default()), JobStatus::Pending);
    let (state, _) = update(
        state,
        Msg::AuditFailed {
            job_id: "abc".to_string(),
        },
    );

    let view = state.view();
    assert_eq!(view.error.as_deref(), Some(MSG_AUDIT_FAILED));
    assert_eq!(view.active_job, None);
    assert_eq!(state.ledger().get("abc").unwrap().status, JobStatus::Failed);

    // A late status from a stale source cannot resurrect the job.
    let state = observe(state, JobStatus::Processing);
    assert_eq!(state.ledger().get("abc").unwrap().status, JobStatus::Failed);
    let (state, _) = complete(state);
    let record = state.ledger().get("abc").unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.download_ref, None);
}

#[test]
fn abandoned_poll_shows_timeout_and_clears_active_job() {
    init_logging();
    let mut state = started_job(CoreOptions::default());
    for _ in 0..15 {
        state = observe(state, JobStatus::Pending);
    }
    let (state, effects) = update(
        state,
        Msg::PollAbandoned {
            job_id: "abc".to_string(),
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.error.as_deref(), Some(MSG_POLL_TIMEOUT));
    assert_eq!(view.active_job, None);
    assert_eq!(view.busy, Busy::Idle);
    assert!(view.polling.is_empty());
    assert_eq!(state.ledger().get("abc").unwrap().status, JobStatus::Pending);
}

#[test]
fn aborted_poll_keeps_last_known_status() {
    init_logging();
    let state = observe(started_job(CoreOptions::default()), JobStatus::Processing);
    let (state, _) = update(
        state,
        Msg::PollAborted {
            job_id: "abc".to_string(),
            message: "Failed to fetch audit data: 404".to_string(),
        },
    );

    let view = state.view();
    assert_eq!(view.error.as_deref(), Some("Failed to fetch audit data: 404"));
    assert!(view.settled);
    let record = state.ledger().get("abc").unwrap();
    assert_eq!(record.status, JobStatus::Processing);
    assert_eq!(record.download_ref, None);
}

#[test]
fn unknown_status_is_recorded_verbatim() {
    init_logging();
    let state = observe(
        started_job(CoreOptions::default()),
        JobStatus::parse("queued-for-review"),
    );

    let view = state.view();
    assert_eq!(view.rows[0].status_label, "queued-for-review");
    assert_eq!(view.rows[0].action, RowAction::NotAvailable);
    assert_eq!(view.polling, vec!["abc".to_string()]);
}

#[test]
fn status_for_unknown_job_is_ignored() {
    init_logging();
    let state = started_job(CoreOptions::default());
    let before = state.ledger().clone();
    let (state, effects) = update(
        state,
        Msg::StatusObserved {
            job_id: "zzz".to_string(),
            status: JobStatus::Processing,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.ledger(), &before);
}

#[test]
fn resubmitted_id_does_not_start_a_second_poller() {
    init_logging();
    let state = started_job(CoreOptions::default());
    let (state, _) = update(state, Msg::InputChanged(URL.to_string()));
    let (state, _) = update(state, Msg::SubmitClicked);
    let (state, effects) = update(
        state,
        Msg::SubmissionAccepted {
            job_id: "abc".to_string(),
            url: URL.to_string(),
            created_at: "2026-10-18T12:05:00Z".to_string(),
        },
    );

    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::StartPolling { .. })));
    assert_eq!(state.view().job_count, 1);
}

#[test]
fn row_download_needs_a_completed_record() {
    init_logging();
    let state = started_job(CoreOptions::default());
    let (state, effects) = update(
        state,
        Msg::DownloadRowClicked {
            job_id: "abc".to_string(),
        },
    );
    assert!(effects.is_empty());

    let (state, _) = complete(state);
    let (state, _) = update(
        state,
        Msg::DownloadSaved {
            path: "abc.csv".to_string(),
        },
    );
    let (state, effects) = update(
        state,
        Msg::DownloadRowClicked {
            job_id: "abc".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::Materialize {
            reference: BLOB.to_string(),
            file_name: "audit-abc.csv".to_string(),
        }]
    );

    let (state, _) = update(
        state,
        Msg::DownloadFailed {
            message: "Failed to download file: 403".to_string(),
        },
    );
    let view = state.view();
    assert_eq!(view.error.as_deref(), Some("Failed to download file: 403"));
    assert_eq!(view.downloads_in_flight, 0);
}

#[test]
fn completion_after_refresh_already_marked_completed_still_downloads() {
    init_logging();
    let (state, _) = update(
        running_job(CoreOptions::default()),
        server_snapshot(JobStatus::Completed, Some(BLOB)),
    );
    let (state, effects) = complete(state);

    assert_eq!(
        effects.last(),
        Some(&Effect::Materialize {
            reference: BLOB.to_string(),
            file_name: "abc.csv".to_string(),
        })
    );
    let view = state.view();
    assert_eq!(view.active_job, None);
    assert_eq!(view.busy, Busy::Idle);
    assert_eq!(view.success.as_deref(), Some(MSG_AUDIT_COMPLETED));
    assert!(view.polling.is_empty());
    assert_eq!(view.downloads_in_flight, 1);
}

#[test]
fn completion_fills_reference_missing_from_refreshed_record() {
    init_logging();
    let options = CoreOptions {
        auto_download: false,
        ..CoreOptions::default()
    };
    let (state, _) = update(
        running_job(options),
        server_snapshot(JobStatus::Completed, None),
    );
    assert_eq!(state.view().rows[0].action, RowAction::NotAvailable);

    let (state, effects) = complete(state);
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::Materialize { .. })));
    let record = state.ledger().get("abc").unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.download_ref.as_deref(), Some(BLOB));

    let view = state.view();
    assert_eq!(view.rows[0].action, RowAction::Download);
    assert_eq!(view.active_job, None);
    assert_eq!(
        view.download_offer,
        Some(DownloadOffer {
            reference: BLOB.to_string(),
            file_name: "abc.csv".to_string(),
        })
    );
}

#[test]
fn completion_for_record_refreshed_as_failed_is_ignored() {
    init_logging();
    let (state, _) = update(
        running_job(CoreOptions::default()),
        server_snapshot(JobStatus::Failed, None),
    );
    let (state, effects) = complete(state);

    assert!(effects.is_empty());
    let record = state.ledger().get("abc").unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.download_ref, None);
    let view = state.view();
    assert!(view.polling.is_empty());
    assert_eq!(view.active_job, None);
}

#[test]
fn failure_after_refresh_already_marked_failed_releases_active_job() {
    init_logging();
    let (state, _) = update(
        running_job(CoreOptions::default()),
        server_snapshot(JobStatus::Failed, None),
    );
    let (state, effects) = update(
        state,
        Msg::AuditFailed {
            job_id: "abc".to_string(),
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.error.as_deref(), Some(MSG_AUDIT_FAILED));
    assert_eq!(view.active_job, None);
    assert!(view.settled);
    assert_eq!(state.ledger().get("abc").unwrap().status, JobStatus::Failed);
}

#[test]
fn failure_cannot_overwrite_record_refreshed_as_completed() {
    init_logging();
    let (state, _) = update(
        running_job(CoreOptions::default()),
        server_snapshot(JobStatus::Completed, Some(BLOB)),
    );
    let (state, _) = update(
        state,
        Msg::AuditFailed {
            job_id: "abc".to_string(),
        },
    );

    let record = state.ledger().get("abc").unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.download_ref.as_deref(), Some(BLOB));
    assert_eq!(state.view().active_job, None);
}

#[test]
fn background_completion_does_not_replace_active_offer() {
    init_logging();
    let options = CoreOptions {
        auto_download: false,
        ..CoreOptions::default()
    };
    let state = started_job(options);
    let (state, _) = update(state, Msg::InputChanged("https://other.example".to_string()));
    let (state, _) = update(state, Msg::SubmitClicked);
    let (state, _) = update(
        state,
        Msg::SubmissionAccepted {
            job_id: "def".to_string(),
            url: "https://other.example".to_string(),
            created_at: "2026-10-18T12:01:00Z".to_string(),
        },
    );

    // "abc" is no longer the active job.
    let (state, effects) = complete(state);
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, Effect::Materialize { .. })));
    let view = state.view();
    assert_eq!(view.download_offer, None);
    assert_eq!(view.active_job.as_ref().unwrap().job_id, "def");
    assert_eq!(view.polling, vec!["def".to_string()]);
    let record = state.ledger().get("abc").unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.download_ref.as_deref(), Some(BLOB));
}
