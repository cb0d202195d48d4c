//! Rendering backend running as a child process.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  {"id":7,"cmd":...}\n   ┌──────────────────┐
//! │ ProcessBackend│ ───────── stdin ──────► │ rendering engine │
//! │               │                         │   (child proc)   │
//! │  pending map  │ ◄──────── stdout ────── │                  │
//! └──────┬────────┘  {"id":7,"ok":true}\n   └──────────────────┘
//!        │
//!        └─ reader task routes each response to its oneshot waiter
//! ```
//!
//! Requests carry a monotonically increasing id so responses may arrive in
//! any order. Each request has a timeout; a timed-out or orphaned request
//! fails with `RemoteFailure`. When the engine exits every pending request
//! fails and later requests fail immediately.

use super::backend::RenderBackend;
use super::command::{RenderCommand, RenderResponse};
use crate::content::BoxFuture;
use crate::error::StageError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, trace, warn};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How to launch the rendering engine.
#[derive(Debug, Clone)]
pub struct ProcessBackendConfig {
    pub command: PathBuf,
    pub args: Vec<String>,
    pub request_timeout: Duration,
}

impl ProcessBackendConfig {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct RequestEnvelope<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a RenderCommand,
}

#[derive(Deserialize)]
struct ResponseEnvelope {
    id: u64,
    #[serde(flatten)]
    response: RenderResponse,
}

type PendingMap = DashMap<u64, oneshot::Sender<RenderResponse>>;

/// Rendering backend speaking JSON lines with a child process.
pub struct ProcessBackend {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    pending: Arc<PendingMap>,
    exited: Arc<AtomicBool>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl ProcessBackend {
    /// Spawns the engine and starts the response reader.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: &ProcessBackendConfig) -> Result<Self, StageError> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StageError::io(&config.command, e))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            StageError::remote("spawn", "rendering process has no stdin")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            StageError::remote("spawn", "rendering process has no stdout")
        })?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "octostage::render::engine", "{}", line);
                }
            });
        }

        let pending: Arc<PendingMap> = Arc::new(DashMap::new());
        let exited = Arc::new(AtomicBool::new(false));
        tokio::spawn(read_responses(
            stdout,
            Arc::clone(&pending),
            Arc::clone(&exited),
        ));

        info!(
            command = %config.command.display(),
            pid = ?child.id(),
            "Rendering process started"
        );

        Ok(Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            pending,
            exited,
            next_id: AtomicU64::new(1),
            request_timeout: config.request_timeout,
        })
    }

    /// Returns true once the engine's output stream has closed.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Number of requests waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Kills the engine process.
    pub async fn shutdown(&self) {
        let mut child = self.child.lock().await;
        if let Err(e) = child.kill().await {
            debug!(error = %e, "Rendering process already stopped");
        }
        self.exited.store(true, Ordering::Release);
    }

    async fn round_trip(&self, command: RenderCommand) -> Result<RenderResponse, StageError> {
        let name = command.name();
        if self.has_exited() {
            return Err(StageError::remote(name, "rendering process has exited"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_vec(&RequestEnvelope {
            id,
            command: &command,
        })
        .map_err(|e| StageError::remote(name, format!("cannot encode request: {}", e)))?;
        line.push(b'\n');

        let (tx, rx) = oneshot::channel();
        let _registration = PendingRequest::register(&self.pending, id, tx);
        if self.has_exited() {
            return Err(StageError::remote(name, "rendering process has exited"));
        }

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.write_all(&line).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            return Err(StageError::remote(
                name,
                format!("cannot write to rendering process: {}", e),
            ));
        }
        trace!(id, command = name, "Request sent");

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(StageError::remote(name, "rendering process has exited")),
            Err(_) => Err(StageError::remote(
                name,
                format!("no response within {:?}", self.request_timeout),
            )),
        }
    }
}

/// Entry in the pending map, removed when the request finishes or is dropped.
struct PendingRequest<'a> {
    pending: &'a PendingMap,
    id: u64,
}

impl<'a> PendingRequest<'a> {
    fn register(pending: &'a PendingMap, id: u64, tx: oneshot::Sender<RenderResponse>) -> Self {
        pending.insert(id, tx);
        Self { pending, id }
    }
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        // Already gone when the reader delivered the response
        self.pending.remove(&self.id);
    }
}

/// Routes response lines to their waiters until the engine closes stdout.
async fn read_responses(stdout: ChildStdout, pending: Arc<PendingMap>, exited: Arc<AtomicBool>) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ResponseEnvelope>(&line) {
                    Ok(envelope) => match pending.remove(&envelope.id) {
                        Some((_, tx)) => {
                            let _ = tx.send(envelope.response);
                        }
                        None => {
                            debug!(id = envelope.id, "Response for unknown or expired request")
                        }
                    },
                    Err(e) => warn!(error = %e, "Unparseable line from rendering process"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed reading from rendering process");
                break;
            }
        }
    }

    exited.store(true, Ordering::Release);
    // Dropping the senders fails every outstanding request
    pending.clear();
    info!("Rendering process output closed");
}

impl RenderBackend for ProcessBackend {
    fn execute(&self, command: RenderCommand) -> BoxFuture<'_, Result<RenderResponse, StageError>> {
        Box::pin(self.round_trip(command))
    }
}
