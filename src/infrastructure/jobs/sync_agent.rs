use crate::application::ports::connectivity::ConnectivityService;
use crate::application::services::sync_engine::SyncEngine;
use crate::domain::entities::{DrainReport, DrainTrigger};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

#[derive(Debug)]
pub enum AgentCommand {
    Drain {
        trigger: DrainTrigger,
        reply: Option<oneshot::Sender<Result<DrainReport, AppError>>>,
    },
    Shutdown,
}

/// Data behind the offline indicator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAgentStatus {
    pub online: bool,
    pub pending_count: u64,
    pub is_syncing: bool,
    pub last_report: Option<DrainReport>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct AgentState {
    is_syncing: bool,
    last_report: Option<DrainReport>,
    last_error: Option<String>,
}

/// Owns the drain schedule. Timer ticks, reconnects and manual requests are all handled by
/// one task, so drains never overlap.
pub struct SyncAgent;

impl SyncAgent {
    pub fn spawn(
        engine: Arc<SyncEngine>,
        connectivity: Arc<dyn ConnectivityService>,
        config: &SyncConfig,
    ) -> SyncAgentHandle {
        let (commands, mut rx) = mpsc::channel(config.command_buffer.max(1));
        let state = Arc::new(RwLock::new(AgentState::default()));
        let auto_sync = config.auto_sync;
        let sync_on_reconnect = config.sync_on_reconnect;
        let period = Duration::from_secs(config.sync_interval.max(1));

        let task_engine = Arc::clone(&engine);
        let task_state = Arc::clone(&state);
        let mut online_rx = connectivity.subscribe();

        let task = tokio::spawn(async move {
            // the first tick completes immediately and doubles as the startup sync
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut first_tick = true;
            let mut watching = sync_on_reconnect;

            tracing::info!(
                target: "sync::agent",
                interval_secs = period.as_secs(),
                auto_sync,
                sync_on_reconnect,
                "sync agent started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick(), if auto_sync => {
                        let trigger = if first_tick {
                            DrainTrigger::Startup
                        } else {
                            DrainTrigger::Timer
                        };
                        first_tick = false;
                        let _ = run_drain(&task_engine, &task_state, trigger).await;
                    }
                    changed = online_rx.changed(), if watching => {
                        match changed {
                            Ok(()) => {
                                let online = *online_rx.borrow_and_update();
                                if online {
                                    tracing::info!(target: "sync::agent", "back online; draining");
                                    let _ = run_drain(
                                        &task_engine,
                                        &task_state,
                                        DrainTrigger::Reconnected,
                                    )
                                    .await;
                                }
                            }
                            Err(_) => watching = false,
                        }
                    }
                    command = rx.recv() => {
                        match command {
                            Some(AgentCommand::Drain { trigger, reply }) => {
                                let result = run_drain(&task_engine, &task_state, trigger).await;
                                if let Some(reply) = reply {
                                    let _ = reply.send(result);
                                }
                            }
                            Some(AgentCommand::Shutdown) | None => break,
                        }
                    }
                }
            }

            tracing::info!(target: "sync::agent", "sync agent stopped");
        });

        SyncAgentHandle {
            commands,
            engine,
            connectivity,
            state,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }
}

async fn run_drain(
    engine: &SyncEngine,
    state: &RwLock<AgentState>,
    trigger: DrainTrigger,
) -> Result<DrainReport, AppError> {
    state.write().await.is_syncing = true;
    let result = engine.drain(trigger).await;

    let mut guard = state.write().await;
    guard.is_syncing = false;
    match &result {
        Ok(report) => {
            guard.last_error = report.failures.first().map(|failure| failure.message.clone());
            guard.last_report = Some(report.clone());
        }
        Err(err) => guard.last_error = Some(err.to_string()),
    }
    result
}

#[derive(Clone)]
pub struct SyncAgentHandle {
    commands: mpsc::Sender<AgentCommand>,
    engine: Arc<SyncEngine>,
    connectivity: Arc<dyn ConnectivityService>,
    state: Arc<RwLock<AgentState>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SyncAgentHandle {
    /// Manual "sync now": queues a drain behind any running one and waits for its report.
    pub async fn sync_now(&self) -> Result<DrainReport, AppError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(AgentCommand::Drain {
                trigger: DrainTrigger::Manual,
                reply: Some(reply),
            })
            .await
            .map_err(|_| agent_stopped())?;
        response.await.map_err(|_| agent_stopped())?
    }

    /// Fire-and-forget drain request. A full command buffer already holds a pending drain, so
    /// the request is dropped.
    pub fn request_drain(&self, trigger: DrainTrigger) -> Result<(), AppError> {
        match self.commands.try_send(AgentCommand::Drain {
            trigger,
            reply: None,
        }) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(
                    target: "sync::agent",
                    trigger = trigger.as_str(),
                    "drain request dropped; buffer full"
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(agent_stopped()),
        }
    }

    pub async fn status(&self) -> Result<SyncAgentStatus, AppError> {
        let pending_count = self.engine.pending_count().await?;
        let state = self.state.read().await;
        Ok(SyncAgentStatus {
            online: self.connectivity.current(),
            pending_count,
            is_syncing: state.is_syncing,
            last_report: state.last_report.clone(),
            last_error: state.last_error.clone(),
        })
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(AgentCommand::Shutdown).await;
        if let Some(task) = self.task.lock().await.take()
            && let Err(err) = task.await
        {
            tracing::warn!(target: "sync::agent", error = %err, "sync agent task ended abnormally");
        }
    }
}

fn agent_stopped() -> AppError {
    AppError::Internal("sync agent is not running".to_string())
}
