//! Daemon process: the control loop, settings watcher, socket server and
//! signal handling, plus the in-process one-shot run used by `sync --once`.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use reposync_core::{settings, RepoName, Settings};
use reposync_git::{CommandExecutor, GitExecutor};
use reposync_sync::JobReport;

use crate::control::{ControlHandle, ControlLoop};
use crate::error::{io_err, DaemonError};
use crate::hub::EventHub;
use crate::paths::{reposync_root, socket_path, DEBOUNCE_WINDOW};
use crate::protocol::{DaemonRequest, DaemonResponse};

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon runtime.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let settings = load_settings(home.clone()).await?;
    let executor = GitExecutor::for_settings(&settings);
    tracing::info!(
        git = %executor.git().display(),
        repos = settings.repos.len(),
        "starting reposync daemon"
    );

    let hub = EventHub::default();
    let mut control = ControlLoop::new(&settings, Box::new(executor), hub.clone())?;
    let handle = control.handle();
    control.start();

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let control_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = control.run(shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let handle = handle.clone();
        tokio::spawn(async move {
            let result = watcher_task(home, handle, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        tokio::spawn(async move {
            let result = socket_server_task(
                home,
                handle,
                hub,
                shutdown.clone(),
                shutdown.subscribe(),
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (control_result, watcher_result, socket_result, signal_result) =
        tokio::join!(control_handle, watcher_handle, socket_handle, signal_handle);

    handle_join("control_loop", control_result)?;
    handle_join("settings_watcher", watcher_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// One-shot runs
// ---------------------------------------------------------------------------

/// Sync `target` (or every repository) in the foreground with the configured
/// git, without timers or a socket, and return the job reports.
pub fn run_once_blocking(
    home: &Path,
    target: Option<RepoName>,
) -> Result<Vec<JobReport>, DaemonError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(async move {
        let settings = load_settings(home.to_path_buf()).await?;
        let executor = GitExecutor::for_settings(&settings);
        run_once_with(&settings, Box::new(executor), target).await
    })
}

/// Same as [`run_once_blocking`] with an explicit executor.
pub async fn run_once_with(
    settings: &Settings,
    executor: Box<dyn CommandExecutor>,
    target: Option<RepoName>,
) -> Result<Vec<JobReport>, DaemonError> {
    let mut control = ControlLoop::new(settings, executor, EventHub::default())?.without_timers();
    control.enqueue(target.as_ref())?;
    control.run_until_idle().await
}

// ---------------------------------------------------------------------------
// Settings watcher
// ---------------------------------------------------------------------------

async fn watcher_task(
    home: PathBuf,
    control: ControlHandle,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let root = reposync_root(&home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }
    // Events arrive with canonical paths on some platforms.
    let root = fs::canonicalize(&root).unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(&root, RecursiveMode::NonRecursive)?;
    tracing::debug!(path = %root.display(), "watching settings directory");

    let mut debounce = Debounce::new(DEBOUNCE_WINDOW);

    loop {
        let deadline = debounce.deadline();
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if !debounce.fire(Instant::now()) {
                    continue;
                }
                match load_settings(home.clone()).await {
                    Ok(settings) => control.settings_changed(settings)?,
                    Err(err) => {
                        tracing::warn!(error = %err, "settings reload failed, keeping current configuration");
                    }
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if is_relevant_event_kind(&event.kind)
                    && event.paths.iter().any(|path| is_settings_file(path))
                {
                    debounce.touch(Instant::now());
                }
            }
        }
    }

    Ok(())
}

/// Trailing-edge debounce: fires once, `window` after the last touch.
#[derive(Debug)]
struct Debounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn is_settings_file(path: &Path) -> bool {
    path.file_name() == Some(std::ffi::OsStr::new(settings::SETTINGS_FILE))
}

async fn load_settings(home: PathBuf) -> Result<Settings, DaemonError> {
    let settings = tokio::task::spawn_blocking(move || settings::load_at(&home))
        .await
        .map_err(|err| DaemonError::Protocol(format!("settings load join error: {err}")))??;
    Ok(settings)
}

// ---------------------------------------------------------------------------
// Socket server
// ---------------------------------------------------------------------------

async fn socket_server_task(
    home: PathBuf,
    control: ControlHandle,
    hub: EventHub,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let control = control.clone();
                let hub = hub.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, control, hub, shutdown_tx).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    control: ControlHandle,
    hub: EventHub,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let repo = request.repo.map(RepoName::from);
        let response = match request.cmd.as_str() {
            "status" => match control.status().await {
                Ok(payload) => DaemonResponse::ok(serde_json::to_value(payload)?),
                Err(err) => DaemonResponse::error(err.to_string()),
            },
            "sync" => match control.sync(repo).await {
                Ok(enqueued) => DaemonResponse::ok(json!(enqueued)),
                Err(err) => DaemonResponse::error(err.to_string()),
            },
            "pause" => match repo {
                Some(repo) => match control.pause(repo).await {
                    Ok(()) => DaemonResponse::ok(json!({ "paused": true })),
                    Err(err) => DaemonResponse::error(err.to_string()),
                },
                None => DaemonResponse::error("pause requires a repository"),
            },
            "subscribe" => {
                // Subscribe before acknowledging so no event is missed.
                let events = hub.subscribe();
                write_response(&mut writer, &DaemonResponse::ok(json!({ "subscribed": true })))
                    .await?;
                return stream_events(lines, writer, events, shutdown_tx.subscribe()).await;
            }
            "stop" => {
                let _ = shutdown_tx.send(());
                write_response(&mut writer, &DaemonResponse::ok(json!({ "stopping": true })))
                    .await?;
                break;
            }
            other => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

async fn stream_events(
    mut lines: tokio::io::Lines<BufReader<tokio::net::unix::OwnedReadHalf>>,
    mut writer: OwnedWriteHalf,
    mut events: broadcast::Receiver<crate::protocol::RepoEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            line = lines.next_line() => {
                // Subscribers send nothing; EOF or an error means they left.
                if !matches!(line, Ok(Some(_))) {
                    break;
                }
            }
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber lagging, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let response = DaemonResponse::ok(serde_json::to_value(event)?);
                if write_response(&mut writer, &response).await.is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let root = reposync_root(home);
    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    }
    Ok(())
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
