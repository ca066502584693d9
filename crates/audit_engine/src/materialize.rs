use std::path::PathBuf;
use std::sync::Arc;

use audit_logging::{audit_debug, audit_info};

use crate::filename::sanitize_file_name;
use crate::persist::AtomicFileWriter;
use crate::{AuditApi, MaterializeError};

/// Turns a remote result reference into a file in the output directory.
#[derive(Clone)]
pub struct Materializer {
    api: Arc<dyn AuditApi>,
    writer: AtomicFileWriter,
}

impl Materializer {
    pub fn new(api: Arc<dyn AuditApi>, writer: AtomicFileWriter) -> Self {
        Self { api, writer }
    }

    /// Fetch `reference` once and save it as `file_name`. No retry.
    pub async fn materialize(
        &self,
        reference: &str,
        file_name: &str,
    ) -> Result<PathBuf, MaterializeError> {
        audit_debug!("Materializing {} as {}", reference, file_name);
        let bytes = self.api.fetch_bytes(reference).await?;
        self.save(file_name, &bytes)
    }

    /// Save bytes already in hand, e.g. a synchronous audit result.
    pub fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, MaterializeError> {
        let safe_name = sanitize_file_name(file_name);
        let path = self
            .writer
            .write(&safe_name, bytes)
            .map_err(|err| MaterializeError::Save(err.to_string()))?;
        audit_info!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}
