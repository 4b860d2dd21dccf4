// restoretool/src/restore/db_restore.rs
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use which::which;

use super::RestoreSuccess;
use crate::config::{MongoConnection, RestoreConfig};
use crate::errors::RestoreError;

/// Cap on captured mongorestore stdout/stderr.
const MAX_TOOL_OUTPUT_BYTES: u64 = 500 * 1024;

const SUCCESS_MESSAGE: &str = "Successfully restored backup";

/// Finds the mongorestore executable in the system PATH.
fn find_mongorestore_executable() -> Result<PathBuf, RestoreError> {
    which("mongorestore").map_err(|_| process_error(
        None,
        "mongorestore executable not found in PATH. Please ensure MongoDB Database Tools are installed and in your PATH.",
    ))
}

/// Splits the extracted path into the source directory handed to
/// mongorestore.
///
/// The backup producer places the dump in a subdirectory named after the
/// original database: the part of the archive file name before the first
/// underscore. The appended separator matches whichever kind the path
/// already uses.
pub(crate) fn derive_restore_source(extracted_path: &str) -> (String, String) {
    let file = extracted_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(extracted_path);
    let original_db = file.split('_').next().unwrap_or(file).to_string();
    let separator = if extracted_path.contains('/') { '/' } else { '\\' };
    let source = format!("{extracted_path}{separator}{original_db}");
    (source, original_db)
}

fn wants_gzip(extracted_path: &str) -> bool {
    Path::new(extracted_path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Builds the mongorestore argument vector. Each derived value is a discrete
/// argument; nothing passes through a shell.
pub(crate) fn build_restore_args(
    connection: &MongoConnection,
    drop: bool,
    gzip: bool,
    restore_source: &str,
) -> Result<Vec<String>, RestoreError> {
    let database = connection
        .database
        .as_deref()
        .filter(|db| !db.is_empty())
        .ok_or(RestoreError::Descriptor("database name"))?;
    let target = connection
        .hosts
        .first()
        .ok_or(RestoreError::Descriptor("host"))?;

    let username = connection.username.as_deref().filter(|u| !u.is_empty());
    let password = connection.password.as_deref().filter(|p| !p.is_empty());

    let mut args = vec![
        "-h".to_string(),
        target.host.clone(),
        format!("--port={}", target.port),
        "-d".to_string(),
        database.to_string(),
    ];

    // A password without a username falls back to the unauthenticated form.
    match (username, password) {
        (Some(user), Some(pass)) => {
            args.extend([
                "-p".to_string(),
                pass.to_string(),
                "-u".to_string(),
                user.to_string(),
            ]);
        }
        (Some(user), None) => {
            args.extend(["-u".to_string(), user.to_string()]);
        }
        _ => {}
    }

    if gzip {
        args.push("--gzip".to_string());
    }
    if drop {
        args.push("--drop".to_string());
    }
    args.push(restore_source.to_string());
    Ok(args)
}

/// Runs mongorestore against the extracted backup directory.
pub async fn run_mongorestore(
    config: &RestoreConfig,
    extracted_path: &Path,
) -> Result<RestoreSuccess, RestoreError> {
    let connection = config
        .mongo()
        .ok_or(RestoreError::Descriptor("parsed connection descriptor"))?;

    let extracted = extracted_path.to_string_lossy();
    let gzip = wants_gzip(&extracted);
    let (restore_source, original_db) = derive_restore_source(&extracted);
    debug!("restore source {restore_source} (original database {original_db})");

    let args = build_restore_args(connection, config.drop, gzip, &restore_source)?;
    let mongorestore = find_mongorestore_executable()?;
    info!("running {} {}", mongorestore.display(), args.join(" "));

    let mut child = Command::new(&mongorestore)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            process_error(
                err.raw_os_error(),
                format!("failed to spawn {}: {}", mongorestore.display(), err),
            )
        })?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| process_error(None, "child stdout was not captured"))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| process_error(None, "child stderr was not captured"))?;

    let joined = tokio::try_join!(
        read_capped(&mut stdout_pipe),
        read_capped(&mut stderr_pipe)
    );
    let (stdout, stderr) = match joined {
        Ok(streams) => streams,
        Err(err) => {
            let _ = child.kill().await;
            return Err(process_error(
                None,
                format!("failed reading mongorestore output: {err}"),
            ));
        }
    };

    let status = child.wait().await?;
    if !status.success() {
        let stderr_text = String::from_utf8_lossy(&stderr);
        let message = if stderr_text.trim().is_empty() {
            format!("mongorestore exited with status {status}")
        } else {
            format!("mongorestore failed: {}", stderr_text.trim())
        };
        error!("{message}");
        return Err(RestoreError::RestoreProcess {
            code: status.code(),
            message,
        });
    }

    debug!(
        "mongorestore finished: {}",
        String::from_utf8_lossy(&stdout).trim()
    );
    Ok(RestoreSuccess {
        error: 0,
        message: SUCCESS_MESSAGE.to_string(),
        backup_name: original_db,
    })
}

/// Reads a child stream to EOF, failing as soon as the cap is exceeded so the
/// caller can kill a runaway child instead of waiting for it to finish.
async fn read_capped<R>(stream: &mut R) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut limited = stream.take(MAX_TOOL_OUTPUT_BYTES + 1);
    limited.read_to_end(&mut buffer).await?;
    if buffer.len() as u64 > MAX_TOOL_OUTPUT_BYTES {
        return Err(std::io::Error::other(format!(
            "output exceeded {MAX_TOOL_OUTPUT_BYTES} bytes"
        )));
    }
    Ok(buffer)
}

fn process_error(code: Option<i32>, message: impl Into<String>) -> RestoreError {
    RestoreError::RestoreProcess {
        code,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostPort;

    fn connection(username: Option<&str>, password: Option<&str>) -> MongoConnection {
        MongoConnection {
            database: Some("sales".to_string()),
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            hosts: vec![HostPort {
                host: "db.example.com".to_string(),
                port: 27017,
            }],
        }
    }

    #[test]
    fn derives_the_original_database_from_the_last_segment() {
        let (source, original_db) = derive_restore_source("/tmp/mydb_2023-01-01");
        assert_eq!(original_db, "mydb");
        assert_eq!(source, "/tmp/mydb_2023-01-01/mydb");
    }

    #[test]
    fn derives_a_backslash_separator_for_windows_style_paths() {
        let (source, original_db) = derive_restore_source(r"C:\Temp\mydb_2023");
        assert_eq!(original_db, "mydb");
        assert_eq!(source, r"C:\Temp\mydb_2023\mydb");
    }

    #[test]
    fn gzip_only_for_a_gz_extension_case_insensitive() {
        assert!(wants_gzip("/tmp/backup.GZ"));
        assert!(!wants_gzip("/tmp/backup.bson"));
        assert!(!wants_gzip("/tmp/sales_2024"));
    }

    #[test]
    fn base_command_form_without_credentials() {
        let args =
            build_restore_args(&connection(None, None), false, false, "/tmp/sales_2024/sales")
                .unwrap();
        assert_eq!(
            args,
            vec![
                "-h",
                "db.example.com",
                "--port=27017",
                "-d",
                "sales",
                "/tmp/sales_2024/sales"
            ]
        );
    }

    #[test]
    fn credentialed_form_orders_password_before_username() {
        let args = build_restore_args(
            &connection(Some("admin"), Some("secret")),
            false,
            false,
            "/tmp/sales_2024/sales",
        )
        .unwrap();
        assert_eq!(
            args,
            vec![
                "-h",
                "db.example.com",
                "--port=27017",
                "-d",
                "sales",
                "-p",
                "secret",
                "-u",
                "admin",
                "/tmp/sales_2024/sales"
            ]
        );
    }

    #[test]
    fn username_only_form() {
        let args = build_restore_args(
            &connection(Some("admin"), None),
            false,
            false,
            "/tmp/sales_2024/sales",
        )
        .unwrap();
        assert_eq!(
            args,
            vec![
                "-h",
                "db.example.com",
                "--port=27017",
                "-d",
                "sales",
                "-u",
                "admin",
                "/tmp/sales_2024/sales"
            ]
        );
    }

    #[test]
    fn password_only_falls_back_to_the_base_form() {
        let args = build_restore_args(
            &connection(None, Some("secret")),
            false,
            false,
            "/tmp/sales_2024/sales",
        )
        .unwrap();
        assert!(!args.contains(&"-p".to_string()));
        assert!(!args.contains(&"-u".to_string()));
    }

    #[test]
    fn empty_credentials_count_as_absent() {
        let args = build_restore_args(
            &connection(Some(""), Some("")),
            false,
            false,
            "/tmp/sales_2024/sales",
        )
        .unwrap();
        assert!(!args.contains(&"-u".to_string()));
    }

    #[test]
    fn gzip_and_drop_flags_precede_the_source_path() {
        let args =
            build_restore_args(&connection(None, None), true, true, "/tmp/sales_2024/sales")
                .unwrap();
        assert_eq!(
            args,
            vec![
                "-h",
                "db.example.com",
                "--port=27017",
                "-d",
                "sales",
                "--gzip",
                "--drop",
                "/tmp/sales_2024/sales"
            ]
        );
    }

    #[test]
    fn a_missing_database_name_is_rejected() {
        let mut conn = connection(None, None);
        conn.database = None;
        assert!(build_restore_args(&conn, false, false, "/tmp/x").is_err());
    }

    #[test]
    fn an_empty_host_list_is_rejected() {
        let mut conn = connection(None, None);
        conn.hosts.clear();
        assert!(build_restore_args(&conn, false, false, "/tmp/x").is_err());
    }
}
