//! Forced resync scheduler
//!
//! Lamps can drift: someone flips the wall switch, a phone app changes the
//! colour, the bulb power-cycles. Every interval the scheduler asks every
//! lamp to re-push its resolved status.
//!
//! Each lamp's resync runs as its own task. A lamp whose previous resync has
//! not finished yet is skipped for that tick, so a stalled bridge call for
//! one lamp neither delays nor queues up work for the others.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{self, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use hs_error::{HueStatusError, Result};

use crate::lamp::ResyncOutcome;
use crate::lamp_task::LampHandle;

/// Counters over the lifetime of a scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub resynced: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Lamps skipped because their previous resync was still running
    pub overlapped: u64,
}

pub struct ReconciliationScheduler {
    interval: Duration,
    lamps: Vec<LampHandle>,
}

impl ReconciliationScheduler {
    pub fn new(interval: Duration, lamps: Vec<LampHandle>) -> Self {
        Self { interval, lamps }
    }

    /// Start ticking until `shutdown` flips to true (or its sender is dropped).
    ///
    /// Consumes the scheduler; there is no restart.
    pub fn start(self, shutdown: watch::Receiver<bool>) -> JoinHandle<SchedulerStats> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) -> SchedulerStats {
        info!(
            lamps = self.lamps.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Reconciliation scheduler started"
        );

        let mut stats = SchedulerStats::default();
        let mut running = ResyncTasks::default();

        // First resync one full interval after start
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    stats.ticks += 1;
                    let mut started = 0usize;
                    for lamp in &self.lamps {
                        if running.is_running(lamp.name()) {
                            warn!(lamp = lamp.name(), "Previous resync still running, skipping this tick");
                            stats.overlapped += 1;
                            continue;
                        }
                        let handle = lamp.clone();
                        running.spawn(lamp.name(), async move { handle.force_resync().await });
                        started += 1;
                    }
                    debug!(tick = stats.ticks, started, "Resync tick");
                }
                Some((name, result)) = running.join_next(), if !running.is_empty() => {
                    record(&mut stats, &name, result);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        running.shutdown().await;
        info!(
            ticks = stats.ticks,
            resynced = stats.resynced,
            failed = stats.failed,
            "Reconciliation scheduler stopped"
        );
        stats
    }
}

/// Resync tasks in flight, keyed by task id so a task that panics or is
/// cancelled still frees its lamp
#[derive(Default)]
struct ResyncTasks {
    tasks: JoinSet<Result<ResyncOutcome>>,
    lamps: HashMap<task::Id, String>,
}

impl ResyncTasks {
    fn is_running(&self, lamp: &str) -> bool {
        self.lamps.values().any(|name| name == lamp)
    }

    fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn spawn<F>(&mut self, lamp: &str, resync: F)
    where
        F: Future<Output = Result<ResyncOutcome>> + Send + 'static,
    {
        let id = self.tasks.spawn(resync).id();
        self.lamps.insert(id, lamp.to_string());
    }

    /// Next finished resync. A task that did not run to completion is
    /// reported as a failed resync of its lamp.
    async fn join_next(&mut self) -> Option<(String, Result<ResyncOutcome>)> {
        let joined = self.tasks.join_next_with_id().await?;
        Some(match joined {
            Ok((id, result)) => (self.lamps.remove(&id).unwrap_or_default(), result),
            Err(e) => {
                let name = self.lamps.remove(&e.id()).unwrap_or_default();
                let reason = HueStatusError::generic(format!("resync task did not complete: {}", e));
                (name, Err(reason))
            }
        })
    }

    async fn shutdown(&mut self) {
        self.tasks.shutdown().await;
        self.lamps.clear();
    }
}

fn record(stats: &mut SchedulerStats, lamp: &str, result: Result<ResyncOutcome>) {
    match result {
        Ok(ResyncOutcome::Resynced(status)) => {
            debug!(lamp, %status, "Lamp resynced");
            stats.resynced += 1;
        }
        Ok(ResyncOutcome::Skipped) => {
            stats.skipped += 1;
        }
        Err(e) => {
            warn!(lamp, error = %e, "Forced resync failed");
            stats.failed += 1;
        }
    }
}
