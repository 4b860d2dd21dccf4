mod logic;
pub(crate) mod archive; // Zip extraction and the extraction-directory convention
pub(crate) mod db_restore; // mongorestore invocation
pub(crate) mod s3_download; // S3 listing and backup download

use serde::Serialize;

use crate::config::RestoreConfig;
use crate::errors::RestoreError;

pub use s3_download::BackupEntry;

/// Successful restore outcome, in the shape consumers of the tool expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreSuccess {
    /// Always 0.
    pub error: u8,
    pub message: String,
    #[serde(rename = "backupName")]
    pub backup_name: String,
}

/// Failed outcome of either flow. `code` carries the provider or process
/// failure code when one survived the trip to this boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreFailure {
    /// Always 1.
    pub error: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<RestoreError> for RestoreFailure {
    fn from(err: RestoreError) -> Self {
        RestoreFailure {
            error: 1,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Public entry point for the listing flow: validates the configuration and
/// returns the bucket's backup entries.
pub async fn run_list_flow(
    config: &mut RestoreConfig,
) -> Result<Vec<BackupEntry>, RestoreFailure> {
    logic::perform_list(config).await
}

/// Public entry point for the restore flow: validates the configuration,
/// downloads and extracts the named backup, and runs mongorestore on it.
pub async fn run_restore_flow(
    config: &mut RestoreConfig,
    backup_key: &str,
) -> Result<RestoreSuccess, RestoreFailure> {
    logic::perform_restore_orchestration(config, backup_key).await
}
