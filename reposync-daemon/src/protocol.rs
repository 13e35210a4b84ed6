//! Newline-delimited JSON protocol spoken over `~/.reposync/daemon.sock`.
//!
//! Requests are one JSON object per line (`{"cmd": "...", "repo": "..."}`),
//! answered by one [`DaemonResponse`] line. `subscribe` is the exception: after
//! the first response the daemon keeps writing one response per [`RepoEvent`]
//! until the client disconnects.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use reposync_core::RepoName;
use reposync_sync::{JobReport, OverallStatus, RepoSnapshot};

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;

/// JSON newline-delimited request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonRequest {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

impl DaemonRequest {
    pub fn new(cmd: &str, repo: Option<String>) -> Self {
        Self {
            cmd: cmd.to_string(),
            repo,
        }
    }
}

/// JSON newline-delimited response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Payload of the `status` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub overall: OverallStatus,
    pub client_name: String,
    /// Repositories with a job, front first.
    pub queued: Vec<RepoName>,
    pub repos: Vec<RepoSnapshot>,
}

/// Pushed to `subscribe` clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RepoEvent {
    StateChanged { snapshot: RepoSnapshot },
    Removed { repo: RepoName },
    JobFinished { report: JobReport },
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Send one JSON request to the daemon socket and return one response.
pub fn send_request(home: &Path, request: &DaemonRequest) -> Result<DaemonResponse, DaemonError> {
    let (mut reader, socket) = open(home, request)?;
    read_response(&mut reader, &socket)
}

pub fn request_status(home: &Path) -> Result<StatusPayload, DaemonError> {
    let request = DaemonRequest::new("status", None);

    let mut last_not_running: Option<DaemonError> = None;
    for attempt in 0..5 {
        match send_request(home, &request) {
            Ok(response) => return Ok(serde_json::from_value(response_into_data(response)?)?),
            Err(err @ DaemonError::DaemonNotRunning { .. }) => {
                last_not_running = Some(err);
                if attempt < 4 {
                    sleep(Duration::from_millis(100));
                    continue;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_not_running.unwrap_or_else(|| {
        DaemonError::Protocol("daemon status retry loop exited unexpectedly".to_string())
    }))
}

pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    let response = send_request(home, &DaemonRequest::new("stop", None))?;
    response_into_data(response).map(|_| ())
}

/// Ask for a sync of `repo`, or of every repository. Returns the names that
/// got a new job.
pub fn request_sync(home: &Path, repo: Option<String>) -> Result<Vec<RepoName>, DaemonError> {
    let response = send_request(home, &DaemonRequest::new("sync", repo))?;
    Ok(serde_json::from_value(response_into_data(response)?)?)
}

pub fn request_pause(home: &Path, repo: String) -> Result<(), DaemonError> {
    let response = send_request(home, &DaemonRequest::new("pause", Some(repo)))?;
    response_into_data(response).map(|_| ())
}

/// Stream events to `on_event` until it returns `false` or the daemon closes
/// the connection.
pub fn subscribe(
    home: &Path,
    mut on_event: impl FnMut(RepoEvent) -> bool,
) -> Result<(), DaemonError> {
    let (mut reader, socket) = open(home, &DaemonRequest::new("subscribe", None))?;
    response_into_data(read_response(&mut reader, &socket)?)?;

    loop {
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .map_err(|e| io_err(&socket, e))?;
        if read == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }
        let response: DaemonResponse = serde_json::from_str(line.trim_end())?;
        let event: RepoEvent = serde_json::from_value(response_into_data(response)?)?;
        if !on_event(event) {
            return Ok(());
        }
    }
}

fn open(
    home: &Path,
    request: &DaemonRequest,
) -> Result<(BufReader<UnixStream>, std::path::PathBuf), DaemonError> {
    let socket = socket_path(home);
    if !socket.exists() {
        return Err(DaemonError::DaemonNotRunning { socket });
    }

    let mut stream = UnixStream::connect(&socket).map_err(|err| {
        if matches!(
            err.kind(),
            std::io::ErrorKind::NotFound
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
        ) {
            DaemonError::DaemonNotRunning {
                socket: socket.clone(),
            }
        } else {
            io_err(&socket, err)
        }
    })?;

    let payload = serde_json::to_string(request)?;
    stream
        .write_all(payload.as_bytes())
        .map_err(|e| io_err(&socket, e))?;
    stream.write_all(b"\n").map_err(|e| io_err(&socket, e))?;
    stream.flush().map_err(|e| io_err(&socket, e))?;

    Ok((BufReader::new(stream), socket))
}

fn read_response(
    reader: &mut BufReader<UnixStream>,
    socket: &Path,
) -> Result<DaemonResponse, DaemonError> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| io_err(socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(
            "daemon closed connection before responding".to_string(),
        ));
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

fn response_into_data(response: DaemonResponse) -> Result<Value, DaemonError> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(DaemonError::Protocol(
            response
                .error
                .unwrap_or_else(|| "unknown daemon error".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn request_omits_missing_repo() {
        let encoded = serde_json::to_string(&DaemonRequest::new("status", None)).expect("encode");
        assert_eq!(encoded, r#"{"cmd":"status"}"#);
        let decoded: DaemonRequest = serde_json::from_str(r#"{"cmd":"sync"}"#).expect("decode");
        assert!(decoded.repo.is_none());
    }

    #[test]
    fn removed_event_is_tagged() {
        let event = RepoEvent::Removed {
            repo: RepoName::from("notes"),
        };
        assert_eq!(
            serde_json::to_value(&event).expect("encode"),
            json!({"event": "removed", "repo": "notes"})
        );
    }

    #[test]
    fn error_response_becomes_protocol_error() {
        let err = response_into_data(DaemonResponse::error("unknown repository 'x'")).unwrap_err();
        assert!(matches!(err, DaemonError::Protocol(ref m) if m.contains("unknown repository")));
    }

    #[test]
    fn missing_socket_reports_not_running() {
        let home = TempDir::new().expect("home");
        let err = send_request(home.path(), &DaemonRequest::new("status", None)).unwrap_err();
        assert!(matches!(err, DaemonError::DaemonNotRunning { .. }));
    }
}
