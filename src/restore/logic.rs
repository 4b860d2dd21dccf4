// restoretool/src/restore/logic.rs
use log::info;
use std::path::PathBuf;

use crate::config::{RestoreConfig, S3Config};
use crate::errors::RestoreError;

use super::{BackupEntry, RestoreFailure, RestoreSuccess, archive, db_restore, s3_download};

pub(super) async fn perform_list(
    config: &mut RestoreConfig,
) -> Result<Vec<BackupEntry>, RestoreFailure> {
    let s3 = ensure_valid(config).map_err(RestoreFailure::from)?;
    let client = s3_download::build_client(&s3).await;
    s3_download::list_backups(&client, &s3.bucket_name)
        .await
        .map_err(RestoreFailure::from)
}

pub(super) async fn perform_restore_orchestration(
    config: &mut RestoreConfig,
    backup_key: &str,
) -> Result<RestoreSuccess, RestoreFailure> {
    let s3 = ensure_valid(config).map_err(RestoreFailure::from)?;
    info!("restoring {backup_key} from bucket {}", s3.bucket_name);

    let client = s3_download::build_client(&s3).await;
    let extracted = fetch_and_extract(&client, &s3, backup_key)
        .await
        .map_err(fetch_failure)?;
    db_restore::run_mongorestore(config, &extracted)
        .await
        .map_err(RestoreFailure::from)
}

/// Validation gate shared by both flows. No S3 client exists until this
/// passes.
fn ensure_valid(config: &mut RestoreConfig) -> Result<S3Config, RestoreError> {
    if !config.validate()? {
        return Err(RestoreError::InvalidConfiguration);
    }
    config.s3_config().ok_or(RestoreError::InvalidConfiguration)
}

async fn fetch_and_extract(
    client: &aws_sdk_s3::Client,
    s3: &S3Config,
    backup_key: &str,
) -> Result<PathBuf, RestoreError> {
    let archive_path = s3_download::download_backup(client, &s3.bucket_name, backup_key).await?;
    archive::extract_backup(&archive_path)
}

/// Download and extraction failures forward only their message; the provider
/// code is lost at this boundary. Restore-stage failures keep theirs.
fn fetch_failure(err: RestoreError) -> RestoreFailure {
    RestoreFailure {
        error: 1,
        message: err.to_string(),
        code: None,
    }
}
