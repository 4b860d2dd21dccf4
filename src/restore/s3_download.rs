// restoretool/src/restore/s3_download.rs
use aws_sdk_s3 as s3;
use log::{debug, info};
use s3::config::Region;
use s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::S3Config;
use crate::errors::RestoreError;

/// One row of the bucket listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub key: String,
    pub size: Option<i64>,
    pub last_modified: Option<String>,
}

/// Builds a fresh S3 client from the explicit credentials in the validated
/// configuration. Nothing process-wide is mutated; every flow gets its own
/// client.
pub async fn build_client(s3_config: &S3Config) -> s3::Client {
    let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
        .region(Region::new(s3_config.region.clone()))
        .credentials_provider(s3::config::Credentials::new(
            &s3_config.access_key,
            &s3_config.secret_key,
            None,     // session_token
            None,     // expiry
            "Static", // provider_name
        ));
    if let Some(endpoint_url) = &s3_config.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }
    let sdk_config = loader.load().await;
    s3::Client::new(&sdk_config)
}

/// Lists the backup archives in the bucket. A single listing call, like the
/// rest of the pipeline: no pagination, no retry.
pub async fn list_backups(
    client: &s3::Client,
    bucket: &str,
) -> Result<Vec<BackupEntry>, RestoreError> {
    debug!("listing objects in bucket {bucket}");
    let response = client
        .list_objects_v2()
        .bucket(bucket)
        .send()
        .await
        .map_err(store_error)?;

    let entries = response
        .contents()
        .iter()
        .map(|object| BackupEntry {
            key: object.key().unwrap_or_default().to_string(),
            size: object.size(),
            last_modified: object.last_modified().and_then(|when| {
                chrono::DateTime::from_timestamp(when.secs(), when.subsec_nanos())
                    .map(|timestamp| timestamp.to_rfc3339())
            }),
        })
        .collect();
    Ok(entries)
}

/// Streams one backup object into the system temporary directory and returns
/// the file it was written to.
///
/// The destination is named after the object key and is not locked: two
/// concurrent downloads of the same key race on the same path. Downloaded
/// files are left behind after the restore finishes.
pub async fn download_backup(
    client: &s3::Client,
    bucket: &str,
    key: &str,
) -> Result<PathBuf, RestoreError> {
    let destination = download_destination(key);
    info!(
        "downloading s3://{bucket}/{key} to {}",
        destination.display()
    );

    if let Some(parent) = destination.parent() {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut object = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(store_error)?;

    let mut output_file = File::create(&destination).await?;
    let mut total_bytes: u64 = 0;
    loop {
        match object.body.try_next().await {
            Ok(Some(chunk)) => {
                output_file.write_all(&chunk).await?;
                total_bytes += chunk.len() as u64;
            }
            Ok(None) => break,
            Err(err) => {
                // Close the partial file before surfacing the stream error.
                let _ = output_file.shutdown().await;
                return Err(RestoreError::Store {
                    code: None,
                    message: err.to_string(),
                });
            }
        }
    }
    output_file.flush().await?;

    debug!("downloaded {total_bytes} bytes from s3://{bucket}/{key}");
    Ok(destination)
}

/// Local download path for a backup key: the system temp dir plus the key.
pub(crate) fn download_destination(key: &str) -> PathBuf {
    std::env::temp_dir().join(key)
}

/// Maps an SDK failure to a store error carrying the provider's code and
/// message when the service returned them, and the full error chain (DNS,
/// connector, timeout) when it did not.
fn store_error<E, R>(err: SdkError<E, R>) -> RestoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_string);
    let message = match err.message() {
        Some(message) => message.to_string(),
        None => DisplayErrorContext(&err).to_string(),
    };
    RestoreError::Store { code, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_destination_lives_in_the_temp_dir() {
        let destination = download_destination("sales_2024.zip");
        assert!(destination.starts_with(std::env::temp_dir()));
        assert!(destination.ends_with("sales_2024.zip"));
    }

    #[test]
    fn listing_entries_serialize_with_external_field_names() {
        let entry = BackupEntry {
            key: "sales_2024.zip".to_string(),
            size: Some(1024),
            last_modified: Some("2024-06-01T00:00:00+00:00".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({
                "key": "sales_2024.zip",
                "size": 1024,
                "lastModified": "2024-06-01T00:00:00+00:00"
            })
        );
    }
}
