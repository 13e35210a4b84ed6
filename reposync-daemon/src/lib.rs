//! reposync daemon: control loop + command worker + settings watcher + socket server.
//!
//! - [`control`]: the single task that owns the orchestrator
//! - [`bridge`]: the worker thread that runs git
//! - [`hub`]: event fan-out to `subscribe` clients
//! - [`protocol`]: socket wire types and the blocking client

pub mod bridge;
pub mod control;
mod error;
pub mod hub;
pub mod paths;
pub mod protocol;
mod runtime;

pub use bridge::{WorkRequest, Worker, WORKER_THREAD_NAME};
pub use control::{ControlEvent, ControlHandle, ControlLoop};
pub use error::DaemonError;
pub use hub::EventHub;
pub use protocol::{
    request_pause, request_status, request_stop, request_sync, send_request, subscribe,
    DaemonRequest, DaemonResponse, RepoEvent, StatusPayload,
};
pub use runtime::{run, run_once_blocking, run_once_with, start_blocking};
