use audit_core::validate_url;
use audit_logging::audit_info;
use chrono::NaiveDate;

use crate::filename::default_csv_file_name;
use crate::{AuditApi, ClientError, CreatedAudit, SubmitOutcome};

pub const MSG_NO_AUDIT_ID: &str = "No audit ID received from server";

/// Validate `url` and ask the service to audit it.
///
/// `today` names a synchronous result when the service sends no file name.
pub async fn submit_audit(
    api: &dyn AuditApi,
    url: &str,
    today: NaiveDate,
) -> Result<SubmitOutcome, ClientError> {
    validate_url(url)?;

    match api.create_audit(url).await? {
        CreatedAudit::Job {
            audit_id: Some(job_id),
        } => {
            audit_info!("Audit {} accepted for {}", job_id, url);
            Ok(SubmitOutcome::AsyncJobStarted { job_id })
        }
        CreatedAudit::Job { audit_id: None } => Err(ClientError::Protocol(MSG_NO_AUDIT_ID.into())),
        CreatedAudit::File { bytes, file_name } => {
            let file_name = file_name.unwrap_or_else(|| default_csv_file_name(today));
            audit_info!(
                "Audit for {} returned {} bytes directly as {}",
                url,
                bytes.len(),
                file_name
            );
            Ok(SubmitOutcome::SyncFileReady { bytes, file_name })
        }
    }
}
