//! Timeout manager and its coordinator loop.
//!
//! # Responsibilities
//! - Own the zone map, the global task list and the freeze list
//! - Apply every mutation on a single coordinator task
//! - Hand out timeout scopes and freeze guards to callers on any thread
//!
//! # Design Decisions
//! - Callers never touch coordinator state; they post [`Command`]s on an
//!   unbounded channel, which is safe and non-blocking from worker threads
//! - Commands take priority over timer expiries, so a freeze posted before
//!   an expiry is applied first
//! - A zone is dropped from the map as soon as its last participant exits

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use crate::config::{ResumeMode, TimeoutConfig};
use crate::observability::metrics;
use crate::timeout::error::{ScopeKind, TimeoutReason};
use crate::timeout::freeze::{BlockingFreezeGuard, FreezeEntry, FreezeGuard, FreezeId, FreezeSet};
use crate::timeout::global::{Firing, GlobalPhase, GlobalTask};
use crate::timeout::scope::TimeoutScope;
use crate::timeout::task::{TaskHandle, TaskId};
use crate::timeout::timer::{Expiry, TimerOwner, TimerSource};
use crate::timeout::zone::{Zone, ZoneState};

/// Zone name selecting the all-zones fallback deadline.
pub const ALL_ZONES: &str = "global";

/// Requests posted to the coordinator.
#[derive(Debug)]
pub(crate) enum Command {
    EnterZone {
        zone: String,
        duration: Duration,
        entered_at: Instant,
        task: TaskHandle,
    },
    ExitZone {
        zone: String,
        id: TaskId,
    },
    EnterGlobal {
        duration: Duration,
        cool_down: Duration,
        entered_at: Instant,
        task: TaskHandle,
    },
    ExitGlobal {
        id: TaskId,
    },
    Freeze {
        id: FreezeId,
        zone: Option<String>,
        ack: Option<oneshot::Sender<()>>,
    },
    Thaw {
        id: FreezeId,
        ack: Option<oneshot::Sender<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
}

/// Point-in-time view of one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSnapshot {
    pub name: String,
    pub state: ZoneState,
    pub participants: usize,
    /// The shared window, as fixed (or tightened) by the participants.
    pub timeout: Duration,
    /// Whether the zone's timer is currently counting.
    pub running: bool,
}

/// Point-in-time view of the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Live zones, sorted by name.
    pub zones: Vec<ZoneSnapshot>,
    pub global_tasks: usize,
    pub freezes: usize,
}

impl Snapshot {
    pub fn zones_done(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn freezes_done(&self) -> bool {
        self.freezes == 0
    }

    pub fn zone(&self, name: &str) -> Option<&ZoneSnapshot> {
        self.zones.iter().find(|zone| zone.name == name)
    }
}

/// Handle to the timeout coordinator. Cheap to clone and usable from any
/// thread.
#[derive(Debug, Clone)]
pub struct TimeoutManager {
    commands: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
    default_cool_down: Duration,
}

impl TimeoutManager {
    /// Create a manager and the coordinator that serves it. The coordinator
    /// must be driven with [`Coordinator::run`].
    pub fn new(config: &TimeoutConfig) -> (Self, Coordinator) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (timers, expiries) = TimerSource::new();

        let manager = Self {
            commands,
            next_id: Arc::new(AtomicU64::new(1)),
            default_cool_down: config.default_cool_down(),
        };
        let coordinator = Coordinator {
            commands: command_rx,
            expiries,
            timers,
            zones: HashMap::new(),
            globals: Vec::new(),
            freezes: FreezeSet::default(),
            resume_mode: config.resume_mode,
        };
        (manager, coordinator)
    }

    /// Create a manager and spawn its coordinator on the current runtime.
    pub fn spawn(config: &TimeoutConfig, shutdown: broadcast::Receiver<()>) -> Self {
        let (manager, coordinator) = Self::new(config);
        tokio::spawn(coordinator.run(shutdown));
        manager
    }

    /// Bound work by `duration`. With `zone_name == ALL_ZONES` the deadline is
    /// a global one bound to the work itself; otherwise the work joins the
    /// named zone and shares its timer. `cool_down` only applies to global
    /// deadlines and falls back to the configured default.
    pub fn async_timeout(
        &self,
        duration: Duration,
        zone_name: &str,
        cool_down: Option<Duration>,
    ) -> TimeoutScope {
        let kind = if zone_name == ALL_ZONES {
            ScopeKind::Global
        } else {
            ScopeKind::Zone(zone_name.to_string())
        };
        TimeoutScope::new(self.clone(), kind, duration, cool_down.unwrap_or(self.default_cool_down))
    }

    /// Global deadline with the default cool-down.
    pub fn timeout(&self, duration: Duration) -> TimeoutScope {
        self.async_timeout(duration, ALL_ZONES, None)
    }

    /// Deadline shared with every concurrent scope of the same zone.
    pub fn zone_timeout(&self, duration: Duration, zone: &str) -> TimeoutScope {
        self.async_timeout(duration, zone, None)
    }

    /// Freeze countdowns from async code. Resolves once the covered timers
    /// are stopped. `None` freezes every zone; `Some(zone)` freezes that zone
    /// and every global deadline.
    pub async fn freeze(&self, zone: Option<&str>) -> FreezeGuard {
        let (ack, applied) = oneshot::channel();
        let id = self.post_freeze(zone, Some(ack));
        let _ = applied.await;
        FreezeGuard::new(self.commands.clone(), id)
    }

    /// Freeze countdowns from a blocking worker thread. Returns immediately.
    pub fn freeze_blocking(&self, zone: Option<&str>) -> BlockingFreezeGuard {
        let id = self.post_freeze(zone, None);
        BlockingFreezeGuard::new(self.commands.clone(), id)
    }

    fn post_freeze(&self, zone: Option<&str>, ack: Option<oneshot::Sender<()>>) -> FreezeId {
        let id = self.next_id();
        let zone = zone.filter(|name| *name != ALL_ZONES).map(str::to_string);
        self.send(Command::Freeze { id, zone, ack });
        id
    }

    /// Current coordinator state, or `None` once it has stopped.
    pub async fn snapshot(&self) -> Option<Snapshot> {
        let (reply, rx) = oneshot::channel();
        if !self.send(Command::Snapshot { reply }) {
            return None;
        }
        rx.await.ok()
    }

    /// Whether the coordinator is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn send(&self, command: Command) -> bool {
        match self.commands.send(command) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("Timeout coordinator stopped, command dropped");
                false
            }
        }
    }
}

/// The single task that owns every zone, global task and freeze.
pub struct Coordinator {
    commands: mpsc::UnboundedReceiver<Command>,
    expiries: mpsc::UnboundedReceiver<Expiry>,
    timers: TimerSource,
    zones: HashMap<String, Zone>,
    globals: Vec<GlobalTask>,
    freezes: FreezeSet,
    resume_mode: ResumeMode,
}

impl Coordinator {
    /// Serve commands until shutdown is signalled or every manager handle,
    /// scope and guard is gone. Live scopes are then ended with
    /// [`TimeoutReason::Stopped`].
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(resume_mode = ?self.resume_mode, "Timeout coordinator starting");
        let mut shutdown_open = true;

        loop {
            tokio::select! {
                biased;
                signal = shutdown.recv(), if shutdown_open => match signal {
                    Err(broadcast::error::RecvError::Closed) => shutdown_open = false,
                    _ => {
                        tracing::info!("Timeout coordinator received shutdown, exiting loop");
                        break;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        tracing::info!("All timeout manager handles dropped, exiting loop");
                        break;
                    }
                },
                Some(expiry) = self.expiries.recv() => self.on_expiry(expiry),
            }
        }

        self.abandon_all();
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::EnterZone { task, .. } | Command::EnterGlobal { task, .. }
                if task.is_finished() =>
            {
                tracing::debug!(task = task.id(), "Scope finished before registration, skipping");
            }
            Command::EnterZone { zone, duration, entered_at, task } => {
                self.enter_zone(zone, duration, entered_at, task)
            }
            Command::ExitZone { zone, id } => self.exit_zone(&zone, id),
            Command::EnterGlobal { duration, cool_down, entered_at, task } => {
                let mut global = GlobalTask::new(task, duration, cool_down);
                global.start(entered_at, self.freezes.globals_frozen(), &mut self.timers);
                tracing::debug!(
                    task = global.id(),
                    timeout_ms = duration.as_millis() as u64,
                    "Global task entered"
                );
                self.globals.push(global);
            }
            Command::ExitGlobal { id } => self.globals.retain(|global| global.id() != id),
            Command::Freeze { id, zone, ack } => {
                self.freeze(FreezeEntry { id, zone });
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
            Command::Thaw { id, ack } => {
                self.thaw(id);
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn enter_zone(
        &mut self,
        name: String,
        duration: Duration,
        entered_at: Instant,
        task: TaskHandle,
    ) {
        let frozen = self.freezes.zone_frozen(&name);
        let zone = self
            .zones
            .entry(name.clone())
            .or_insert_with(|| Zone::new(name, duration));

        if !zone.enter_task(task, entered_at, duration, frozen, &mut self.timers) {
            metrics::record_refused();
        }
        metrics::record_live_zones(self.zones.len());
    }

    fn exit_zone(&mut self, name: &str, id: TaskId) {
        let Some(zone) = self.zones.get_mut(name) else {
            return;
        };
        if zone.exit_task(id) {
            self.zones.remove(name);
            metrics::record_live_zones(self.zones.len());
        }
    }

    fn on_expiry(&mut self, expiry: Expiry) {
        match expiry.owner {
            TimerOwner::Zone(name) => {
                if let Some(zone) = self.zones.get_mut(&name) {
                    if zone.expire(expiry.id).is_some() {
                        metrics::record_expired("zone");
                    }
                }
            }
            TimerOwner::Global(task_id) => {
                let zones_pending = self.zones.values().any(|zone| !zone.state().is_terminal());
                let globals_pending = self.globals.iter().any(|global| {
                    global.id() != task_id && global.phase() != GlobalPhase::TimedOut
                });
                let others_pending = zones_pending || globals_pending;

                let Some(global) = self.globals.iter_mut().find(|g| g.id() == task_id) else {
                    return;
                };
                let firing = global.on_timer(expiry.id, others_pending, &mut self.timers);
                if firing == Firing::Cancelled {
                    metrics::record_expired("global");
                }
            }
        }
    }

    fn freeze(&mut self, entry: FreezeEntry) {
        tracing::debug!(
            freeze = entry.id,
            zone = ?entry.zone,
            active = self.freezes.len() + 1,
            "Freeze entered"
        );
        metrics::record_freeze(if entry.zone.is_some() { "zone" } else { "global" });

        for global in &mut self.globals {
            global.stop();
        }
        for zone in self.zones.values_mut() {
            if entry.covers_zone(zone.name()) {
                zone.stop();
            }
        }
        self.freezes.push(entry);
    }

    fn thaw(&mut self, id: FreezeId) {
        let Some(entry) = self.freezes.remove(id) else {
            tracing::debug!(freeze = id, "Freeze not registered, ignoring exit");
            return;
        };
        tracing::debug!(
            freeze = id,
            zone = ?entry.zone,
            active = self.freezes.len(),
            "Freeze exited"
        );

        if !self.freezes.globals_frozen() {
            for global in &mut self.globals {
                global.reset(self.resume_mode, &mut self.timers);
            }
        }
        for zone in self.zones.values_mut() {
            if entry.covers_zone(zone.name()) && !self.freezes.zone_frozen(zone.name()) {
                zone.reset(self.resume_mode, &mut self.timers);
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        let mut zones: Vec<ZoneSnapshot> = self
            .zones
            .values()
            .map(|zone| ZoneSnapshot {
                name: zone.name().to_string(),
                state: zone.state(),
                participants: zone.participant_count(),
                timeout: zone.duration(),
                running: zone.is_running(),
            })
            .collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));

        Snapshot {
            zones,
            global_tasks: self.globals.len(),
            freezes: self.freezes.len(),
        }
    }

    fn abandon_all(&mut self) {
        for zone in self.zones.values_mut() {
            zone.abandon(TimeoutReason::Stopped);
        }
        for global in &mut self.globals {
            global.abandon(TimeoutReason::Stopped);
        }
        self.zones.clear();
        self.globals.clear();
        metrics::record_live_zones(0);
        tracing::info!("Timeout coordinator stopped");
    }
}
