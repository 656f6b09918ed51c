//! Per-lamp command queue
//!
//! Each lamp's [`LampController`] is owned by a single task that drains a
//! bounded channel. Every command (module report, forced resync, reset) is
//! handled to completion, device write included, before the next one is
//! taken. Two reports for the same lamp can therefore never interleave, and
//! a resync can never run in the middle of a report. Different lamps run
//! fully in parallel.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use hs_error::{HueStatusError, Result};

use crate::lamp::{LampController, LampSnapshot, ResyncOutcome, StatusChange};

enum LampCommand {
    Register {
        instance: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Report {
        instance: String,
        status: String,
        message: String,
        reply: oneshot::Sender<Result<StatusChange>>,
    },
    ForceResync {
        reply: oneshot::Sender<Result<ResyncOutcome>>,
    },
    Reset {
        reply: oneshot::Sender<Result<bool>>,
    },
    Snapshot {
        reply: oneshot::Sender<LampSnapshot>,
    },
}

/// Cloneable sender side of a lamp task
#[derive(Clone)]
pub struct LampHandle {
    name: String,
    tx: mpsc::Sender<LampCommand>,
}

/// Spawn the task owning `controller`.
///
/// The task ends once every [`LampHandle`] is dropped.
pub fn spawn_lamp(controller: LampController, capacity: usize) -> (LampHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = LampHandle {
        name: controller.name().to_string(),
        tx,
    };
    let task = tokio::spawn(run_lamp(controller, rx));
    (handle, task)
}

async fn run_lamp(mut controller: LampController, mut rx: mpsc::Receiver<LampCommand>) {
    debug!(lamp = %controller.name(), "Lamp task started");

    while let Some(command) = rx.recv().await {
        match command {
            LampCommand::Register { instance, reply } => {
                let _ = reply.send(controller.register(&instance));
            }
            LampCommand::Report {
                instance,
                status,
                message,
                reply,
            } => {
                let result = controller
                    .apply_module_status(&instance, &status, &message)
                    .await;
                let _ = reply.send(result);
            }
            LampCommand::ForceResync { reply } => {
                let _ = reply.send(controller.force_resync().await);
            }
            LampCommand::Reset { reply } => {
                let _ = reply.send(controller.reset_to_initial().await);
            }
            LampCommand::Snapshot { reply } => {
                let _ = reply.send(controller.snapshot());
            }
        }
    }

    info!(lamp = %controller.name(), "Lamp task stopped");
}

impl LampHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> LampCommand,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| HueStatusError::LampUnavailable(self.name.clone()))?;
        rx.await
            .map_err(|_| HueStatusError::LampUnavailable(self.name.clone()))
    }

    pub async fn register(&self, instance: &str) -> Result<()> {
        let instance = instance.to_string();
        self.request(|reply| LampCommand::Register { instance, reply })
            .await?
    }

    pub async fn report(&self, instance: &str, status: &str, message: &str) -> Result<StatusChange> {
        let (instance, status, message) =
            (instance.to_string(), status.to_string(), message.to_string());
        self.request(|reply| LampCommand::Report {
            instance,
            status,
            message,
            reply,
        })
        .await?
    }

    pub async fn force_resync(&self) -> Result<ResyncOutcome> {
        self.request(|reply| LampCommand::ForceResync { reply })
            .await?
    }

    pub async fn reset(&self) -> Result<bool> {
        self.request(|reply| LampCommand::Reset { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<LampSnapshot> {
        self.request(|reply| LampCommand::Snapshot { reply }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MemoryLink;
    use crate::reporter::ReporterFanout;
    use crate::state::{LampState, StatusStateTable};
    use crate::status::Status;
    use std::sync::Arc;
    use std::time::Duration;

    fn spawn_with(link: Arc<MemoryLink>) -> (LampHandle, JoinHandle<()>) {
        let controller = LampController::new(
            "Desk",
            "Desk",
            LampState::new(1000, 254, 254, false),
            StatusStateTable::default(),
            link,
            Arc::new(ReporterFanout::default()),
        );
        spawn_lamp(controller, 8)
    }

    #[tokio::test]
    async fn test_handle_roundtrip() {
        let link = Arc::new(MemoryLink::new().with_lamp("Desk", LampState::new(1000, 254, 254, false)));
        let (handle, _task) = spawn_with(link.clone());

        handle.register("ci").await.unwrap();
        let change = handle.report("ci", "working", "building").await.unwrap();
        assert_eq!(change, StatusChange::Changed { from: None, to: Some(Status::Working) });

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_status, Some(Status::Working));
        assert!(snapshot.is_dirty);

        assert!(handle.reset().await.unwrap());
        assert_eq!(link.state_of("Desk").unwrap().hue, 1000);
    }

    #[tokio::test]
    async fn test_errors_flow_back_to_caller() {
        let link = Arc::new(MemoryLink::new().with_lamp("Desk", LampState::new(1, 1, 1, false)));
        let (handle, _task) = spawn_with(link.clone());

        let err = handle.report("ghost", "ok", "hi").await.unwrap_err();
        assert!(matches!(err, HueStatusError::UnknownInstance { .. }));

        handle.register("ci").await.unwrap();
        let err = handle.register("ci").await.unwrap_err();
        assert!(matches!(err, HueStatusError::DuplicateInstance { .. }));
        assert!(link.writes().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reports_are_serialized() {
        let link = Arc::new(
            MemoryLink::new()
                .with_lamp("Desk", LampState::new(1000, 254, 254, false))
                .with_write_delay(Duration::from_millis(20)),
        );
        let (handle, _task) = spawn_with(link.clone());
        handle.register("a").await.unwrap();
        handle.register("b").await.unwrap();

        let a = handle.clone();
        let b = handle.clone();
        let first = tokio::spawn(async move { a.report("a", "ok", "green").await });
        let second = tokio::spawn(async move { b.report("b", "alert", "red").await });
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        // Whatever order the reports landed in, the last write is the resolved status
        let writes = link.writes_for("Desk");
        assert!(!writes.is_empty() && writes.len() <= 2);
        assert_eq!(writes.last().copied(), Some(LampState::new(0, 254, 254, true).to_write()));
        assert_eq!(link.state_of("Desk"), Some(LampState::new(0, 254, 254, true)));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_status, Some(Status::Alert));
    }

    #[tokio::test]
    async fn test_handle_fails_once_task_is_gone() {
        let link = Arc::new(MemoryLink::new().with_lamp("Desk", LampState::new(1, 1, 1, false)));
        let (handle, task) = spawn_with(link);
        task.abort();
        let _ = task.await;

        let err = handle.force_resync().await.unwrap_err();
        assert!(matches!(err, HueStatusError::LampUnavailable(ref name) if name == "Desk"));
    }
}
