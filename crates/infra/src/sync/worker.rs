//! Sync worker hosting a [`SyncEngine`] on the tokio runtime.
//!
//! The worker owns the engine inside a single task and feeds it three
//! inputs: host commands from [`SyncHandle`]s, timers fired by the
//! [`TimerScheduler`], and finished submissions. Engine state is therefore
//! only touched from one place, and at most one submission runs at a time
//! because the engine hands out one [`Dispatch`] per completion.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use notesync_domain::SyncConfig;
//! use notesync_infra::auth::StaticTokenProvider;
//! use notesync_infra::sync::{BatchSyncClient, SyncWorker};
//!
//! # async fn example() -> notesync_domain::Result<()> {
//! let mut config = SyncConfig::with_endpoint("https://notes.example.com/api/batch-sync");
//! config.api_token = Some("token".into());
//! let tokens = Arc::new(StaticTokenProvider::from_config(&config)?);
//! let client = Arc::new(BatchSyncClient::from_config(&config, tokens)?);
//!
//! let (mut worker, mut events) = SyncWorker::new(config, client)?;
//! worker.start()?;
//! let handle = worker.handle()?;
//! handle.flush_now()?;
//! while let Some(event) = events.recv().await {
//!     tracing::info!(?event, "sync event");
//! }
//! worker.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use notesync_core::{BatchSubmitter, Dispatch, SyncEngine, Timer};
use notesync_domain::{
    HostMessage, Result, SyncConfig, SyncError, SyncEvent, SyncItem, SyncStatus,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::errors::WorkerError;
use crate::scheduling::TimerScheduler;

const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

enum Command {
    Host(HostMessage),
    Status(oneshot::Sender<SyncStatus>),
}

/// Cloneable sender side of a running worker.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SyncHandle {
    /// Deliver a host message.
    ///
    /// # Errors
    /// Returns `SyncError::Channel` once the worker has stopped.
    pub fn send(&self, message: HostMessage) -> Result<()> {
        self.commands
            .send(Command::Host(message))
            .map_err(|_| SyncError::Channel("sync worker is not running".into()))
    }

    pub fn enqueue(&self, items: Vec<SyncItem>) -> Result<()> {
        self.send(HostMessage::Enqueue(items))
    }

    pub fn flush_now(&self) -> Result<()> {
        self.send(HostMessage::FlushNow)
    }

    pub fn clear(&self) -> Result<()> {
        self.send(HostMessage::ClearQueue)
    }

    pub fn set_connectivity(&self, online: bool) -> Result<()> {
        self.send(HostMessage::SetConnectivity(online))
    }

    /// Decode a JSON host message and deliver it.
    ///
    /// # Errors
    /// Returns `SyncError::InvalidPayload` when `raw` is not a valid message;
    /// nothing is delivered in that case.
    pub fn dispatch_json(&self, raw: &str) -> Result<()> {
        let message: HostMessage = serde_json::from_str(raw)
            .map_err(|e| SyncError::InvalidPayload(format!("invalid host message: {e}")))?;
        self.send(message)
    }

    /// Snapshot of queue, timers and counters.
    pub async fn status(&self) -> Result<SyncStatus> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Status(reply))
            .map_err(|_| SyncError::Channel("sync worker is not running".into()))?;
        rx.await.map_err(|_| SyncError::Channel("sync worker stopped before replying".into()))
    }
}

impl std::fmt::Debug for SyncHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandle").field("closed", &self.commands.is_closed()).finish()
    }
}

/// Background sync worker with explicit lifecycle management.
pub struct SyncWorker {
    config: SyncConfig,
    submitter: Arc<dyn BatchSubmitter>,
    events: mpsc::UnboundedSender<SyncEvent>,
    cancellation: CancellationToken,
    commands: Option<mpsc::UnboundedSender<Command>>,
    task_handle: Option<JoinHandle<()>>,
}

impl SyncWorker {
    /// Create a stopped worker and the receiver for its [`SyncEvent`]s.
    ///
    /// # Errors
    /// Returns `SyncError::Config` if `config` does not validate.
    pub fn new(
        config: SyncConfig,
        submitter: Arc<dyn BatchSubmitter>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SyncEvent>)> {
        config.validate()?;
        let (events, rx) = mpsc::unbounded_channel();
        let worker = Self {
            config,
            submitter,
            events,
            cancellation: CancellationToken::new(),
            commands: None,
            task_handle: None,
        };
        Ok((worker, rx))
    }

    /// Spawn the worker task. The engine starts empty and online.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> std::result::Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        info!("Starting sync worker");

        self.cancellation = CancellationToken::new();
        let (commands, inbox) = mpsc::unbounded_channel();

        let config = self.config.clone();
        let submitter = Arc::clone(&self.submitter);
        let events = self.events.clone();
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::run_loop(config, submitter, events, inbox, cancel).await;
        });

        self.commands = Some(commands);
        self.task_handle = Some(handle);
        info!("Sync worker started");

        Ok(())
    }

    /// Stop the worker and wait for its task to finish.
    ///
    /// A submission still in flight is abandoned and reports nothing.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> std::result::Result<(), WorkerError> {
        if !self.is_running() {
            return Err(WorkerError::NotRunning);
        }

        info!("Stopping sync worker");

        self.cancellation.cancel();
        self.commands = None;

        if let Some(handle) = self.task_handle.take() {
            match tokio::time::timeout(DEFAULT_JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Sync worker task panicked: {}", e);
                    return Err(WorkerError::TaskJoinFailed(e.to_string()));
                }
                Err(_) => {
                    warn!("Sync worker task did not complete within timeout");
                    return Err(WorkerError::Timeout { seconds: DEFAULT_JOIN_TIMEOUT.as_secs() });
                }
            }
        }

        info!("Sync worker stopped");
        self.cancellation = CancellationToken::new();

        Ok(())
    }

    /// Returns true when a worker task is active.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// A sender for host messages.
    ///
    /// # Errors
    /// Returns [`WorkerError::NotRunning`] before `start` or after `stop`.
    pub fn handle(&self) -> std::result::Result<SyncHandle, WorkerError> {
        self.commands
            .as_ref()
            .map(|commands| SyncHandle { commands: commands.clone() })
            .ok_or(WorkerError::NotRunning)
    }

    async fn run_loop(
        config: SyncConfig,
        submitter: Arc<dyn BatchSubmitter>,
        events: mpsc::UnboundedSender<SyncEvent>,
        mut inbox: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) {
        let (scheduler, mut timers) = TimerScheduler::new();
        let scheduler = Arc::new(scheduler);
        let mut engine = SyncEngine::new(&config, scheduler.clone());
        engine.start();

        let mut submissions: JoinSet<(u64, Result<Value>)> = JoinSet::new();

        loop {
            let dispatch = tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Sync worker loop cancelled");
                    break;
                }
                command = inbox.recv() => match command {
                    Some(Command::Host(message)) => engine.handle(message),
                    Some(Command::Status(reply)) => {
                        let _ = reply.send(engine.status());
                        None
                    }
                    None => {
                        debug!("All command senders dropped");
                        break;
                    }
                },
                Some(timer) = timers.recv() => Self::on_timer(&mut engine, timer),
                Some(joined) = submissions.join_next() => {
                    Self::on_submission(&mut engine, &events, joined)
                }
            };

            if let Some(dispatch) = dispatch {
                Self::spawn_submission(&mut submissions, &submitter, dispatch);
            }
        }

        scheduler.shutdown();
        submissions.abort_all();
    }

    fn on_timer(engine: &mut SyncEngine, timer: Timer) -> Option<Dispatch> {
        debug!(timer_id = timer.id, kind = ?timer.kind, "Timer fired");
        engine.on_timer(timer)
    }

    fn on_submission(
        engine: &mut SyncEngine,
        events: &mpsc::UnboundedSender<SyncEvent>,
        joined: std::result::Result<(u64, Result<Value>), JoinError>,
    ) -> Option<Dispatch> {
        let (batch_id, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Submission task failed");
                let batch_id = engine.in_flight_batch()?;
                (batch_id, Err(SyncError::Internal(format!("submission task failed: {e}"))))
            }
        };

        let completion = engine.on_submit_result(batch_id, result);
        if let Some(event) = completion.event {
            if events.send(event).is_err() {
                debug!("Event receiver dropped; discarding sync event");
            }
        }
        completion.dispatch
    }

    fn spawn_submission(
        submissions: &mut JoinSet<(u64, Result<Value>)>,
        submitter: &Arc<dyn BatchSubmitter>,
        dispatch: Dispatch,
    ) {
        debug!(batch_id = dispatch.batch_id, items = dispatch.item_ids.len(), "Submitting batch");
        let submitter = Arc::clone(submitter);
        submissions.spawn(async move {
            let result = submitter.submit(&dispatch.request).await;
            (dispatch.batch_id, result)
        });
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SyncWorker dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
