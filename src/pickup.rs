//! Progress state machine for the pickup currently being driven to.
//!
//! ```text
//!            start                 within threshold
//!   Idle ─────────────▶ EnRoute ─────────────────────▶ Arrived ◀──┐
//!    ▲                     │                          │   │       │ wait timer
//!    │        cancel       │             more time    │   │       │
//!    ├─────────────────────┘         ┌────────────────┘   │       │
//!    │                               ▼                    │       │
//!    │  confirm / auto-advance    Waiting ────────────────┼───────┘
//!    └────────────────────────────────────────────────────┘
//! ```
//!
//! `Completed` and `Cancelled` are terminal for a cycle: the outcome is
//! appended to the ledger and the machine is back in `Idle` straight away.
//!
//! Timers belong to the machine. At most one is armed; replacing or clearing
//! it drops its [`TimerHandle`], which cancels it. Each arming also gets a
//! token, and a callback whose token no longer matches the armed timer does
//! nothing.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::PickupError;
use crate::geo::Coordinate;
use crate::route::RouteResult;
use crate::timer::TimerHandle;

/// Distance under which the vehicle counts as arrived.
pub const DEFAULT_ARRIVAL_THRESHOLD_KM: f64 = 0.1;
pub const DEFAULT_WAIT: Duration = Duration::from_secs(10);
pub const DEFAULT_AUTO_ADVANCE: Duration = Duration::from_secs(30);
/// Finished cycles kept in the ledger; the oldest is evicted past this.
pub const OUTCOME_LEDGER_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupStatus {
    Idle,
    EnRoute,
    Arrived,
    Waiting,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PickupConfig {
    /// Strict upper bound on the vehicle-to-target distance for arrival.
    pub arrival_threshold_km: f64,
    /// How long "need more time" holds before returning to `Arrived`.
    #[serde(rename = "wait_secs", deserialize_with = "duration_from_secs")]
    pub wait: Duration,
    /// How long `Arrived` holds before the cycle completes on its own.
    #[serde(rename = "auto_advance_secs", deserialize_with = "duration_from_secs")]
    pub auto_advance: Duration,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            arrival_threshold_km: DEFAULT_ARRIVAL_THRESHOLD_KM,
            wait: DEFAULT_WAIT,
            auto_advance: DEFAULT_AUTO_ADVANCE,
        }
    }
}

impl PickupConfig {
    #[must_use]
    pub fn with_arrival_threshold_km(mut self, km: f64) -> Self {
        self.arrival_threshold_km = km;
        self
    }

    #[must_use]
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    #[must_use]
    pub fn with_auto_advance(mut self, auto_advance: Duration) -> Self {
        self.auto_advance = auto_advance;
        self
    }
}

fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

/// Distance update surfaced for a position received while en route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupProgress {
    pub status: PickupStatus,
    pub distance_km: f64,
}

/// Ledger entry for a finished cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupOutcome {
    pub target: Coordinate,
    /// `Completed` or `Cancelled`.
    pub status: PickupStatus,
    /// Set when the auto-advance timer completed the cycle.
    pub automatic: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickupEvent {
    StatusChanged {
        from: PickupStatus,
        to: PickupStatus,
    },
    Progress(PickupProgress),
    Finished(PickupOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    AutoAdvance,
    Wait,
}

#[derive(Debug)]
struct ArmedTimer {
    kind: TimerKind,
    token: u64,
    _handle: TimerHandle,
}

#[derive(Debug)]
struct ActiveCycle {
    target: Coordinate,
    route: RouteResult,
    started_at: DateTime<Utc>,
    last_distance_km: Option<f64>,
}

#[derive(Debug)]
struct PickupState {
    status: PickupStatus,
    cycle: Option<ActiveCycle>,
    timer: Option<ArmedTimer>,
    next_token: u64,
    outcomes: VecDeque<PickupOutcome>,
    // Pruned on the next emit once the receiver is dropped.
    subscribers: Vec<Sender<PickupEvent>>,
}

impl PickupState {
    fn emit(&mut self, event: PickupEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_status(&mut self, to: PickupStatus) {
        let from = self.status;
        self.status = to;
        info!(?from, ?to, "pickup status changed");
        self.emit(PickupEvent::StatusChanged { from, to });
    }

    fn invalid(&self, operation: &'static str) -> PickupError {
        PickupError::InvalidOperation {
            operation,
            status: self.status,
        }
    }

    /// Close the active cycle, record it and return to `Idle`.
    fn finish(&mut self, status: PickupStatus, automatic: bool) -> Option<PickupOutcome> {
        self.timer = None;
        let cycle = self.cycle.take()?;
        let outcome = PickupOutcome {
            target: cycle.target,
            status,
            automatic,
            started_at: cycle.started_at,
            finished_at: Utc::now(),
        };
        if self.outcomes.len() == OUTCOME_LEDGER_CAPACITY {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(outcome);
        self.status = PickupStatus::Idle;
        info!(?status, automatic, "pickup cycle finished");
        self.emit(PickupEvent::Finished(outcome));
        Some(outcome)
    }
}

struct Shared {
    config: PickupConfig,
    state: Mutex<PickupState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PickupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The single pickup cycle of the process. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PickupLifecycle {
    shared: Arc<Shared>,
}

impl Default for PickupLifecycle {
    fn default() -> Self {
        Self::new(PickupConfig::default())
    }
}

impl PickupLifecycle {
    pub fn new(config: PickupConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(PickupState {
                    status: PickupStatus::Idle,
                    cycle: None,
                    timer: None,
                    next_token: 0,
                    outcomes: VecDeque::new(),
                    subscribers: Vec::new(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &PickupConfig {
        &self.shared.config
    }

    pub fn status(&self) -> PickupStatus {
        self.shared.lock().status
    }

    pub fn target(&self) -> Option<Coordinate> {
        self.shared.lock().cycle.as_ref().map(|c| c.target)
    }

    pub fn active_route(&self) -> Option<RouteResult> {
        self.shared.lock().cycle.as_ref().map(|c| c.route.clone())
    }

    /// Distance computed from the most recent position while en route.
    pub fn last_distance_km(&self) -> Option<f64> {
        self.shared.lock().cycle.as_ref().and_then(|c| c.last_distance_km)
    }

    /// Finished cycles, oldest first.
    ///
    /// Holds at most [`OUTCOME_LEDGER_CAPACITY`] entries. Hosts that need a
    /// full history should persist from [`PickupEvent::Finished`].
    pub fn outcomes(&self) -> Vec<PickupOutcome> {
        self.shared.lock().outcomes.iter().copied().collect()
    }

    /// Receive every subsequent [`PickupEvent`], including timer-driven ones.
    pub fn subscribe(&self) -> Receiver<PickupEvent> {
        let (tx, rx) = mpsc::channel();
        self.shared.lock().subscribers.push(tx);
        rx
    }

    /// Begin a cycle toward `target` along `route`. Only valid from `Idle`.
    pub fn start(&self, target: Coordinate, route: RouteResult) -> Result<(), PickupError> {
        let mut state = self.shared.lock();
        if state.status != PickupStatus::Idle {
            return Err(state.invalid("start a pickup"));
        }
        debug!(
            lat = target.lat,
            lng = target.lng,
            algorithm = %route.algorithm(),
            distance_km = route.distance_km(),
            "starting pickup"
        );
        state.cycle = Some(ActiveCycle {
            target,
            route,
            started_at: Utc::now(),
            last_distance_km: None,
        });
        state.set_status(PickupStatus::EnRoute);
        Ok(())
    }

    /// Feed a vehicle position. Returns the distance to the target when en
    /// route, transitioning to `Arrived` once it drops below the threshold.
    pub fn on_position(&self, position: Coordinate) -> Option<PickupProgress> {
        let mut state = self.shared.lock();
        if state.status != PickupStatus::EnRoute {
            return None;
        }
        let cycle = state.cycle.as_mut()?;
        let distance_km = cycle.target.distance_km(&position);
        cycle.last_distance_km = Some(distance_km);

        if distance_km < self.shared.config.arrival_threshold_km {
            state.set_status(PickupStatus::Arrived);
            arm(&self.shared, &mut state, TimerKind::AutoAdvance);
        }

        let progress = PickupProgress {
            status: state.status,
            distance_km,
        };
        state.emit(PickupEvent::Progress(progress));
        Some(progress)
    }

    /// "Need more time": hold in `Waiting` and (re-)arm the wait timer.
    pub fn request_more_time(&self) -> Result<(), PickupError> {
        let mut state = self.shared.lock();
        match state.status {
            PickupStatus::Arrived => state.set_status(PickupStatus::Waiting),
            PickupStatus::Waiting => {}
            _ => return Err(state.invalid("request more time")),
        }
        arm(&self.shared, &mut state, TimerKind::Wait);
        Ok(())
    }

    /// Confirm the pickup happened.
    pub fn confirm(&self) -> Result<PickupOutcome, PickupError> {
        let mut state = self.shared.lock();
        match state.status {
            PickupStatus::Arrived | PickupStatus::Waiting => state
                .finish(PickupStatus::Completed, false)
                .ok_or_else(|| state.invalid("confirm a pickup")),
            _ => Err(state.invalid("confirm a pickup")),
        }
    }

    /// Abandon the current pickup.
    pub fn cancel(&self) -> Result<PickupOutcome, PickupError> {
        let mut state = self.shared.lock();
        match state.status {
            PickupStatus::EnRoute | PickupStatus::Arrived => state
                .finish(PickupStatus::Cancelled, false)
                .ok_or_else(|| state.invalid("cancel a pickup")),
            _ => Err(state.invalid("cancel a pickup")),
        }
    }
}

fn arm(shared: &Arc<Shared>, state: &mut PickupState, kind: TimerKind) {
    let token = state.next_token;
    state.next_token += 1;
    let delay = match kind {
        TimerKind::AutoAdvance => shared.config.auto_advance,
        TimerKind::Wait => shared.config.wait,
    };
    let weak = Arc::downgrade(shared);
    let handle = TimerHandle::arm(delay, move || {
        if let Some(shared) = weak.upgrade() {
            on_timer(&shared, kind, token);
        }
    });
    debug!(?kind, ?delay, "timer armed");
    state.timer = Some(ArmedTimer {
        kind,
        token,
        _handle: handle,
    });
}

fn on_timer(shared: &Arc<Shared>, kind: TimerKind, token: u64) {
    let mut state = shared.lock();
    let current = state.timer.as_ref().map(|t| (t.kind, t.token));
    if current != Some((kind, token)) {
        debug!(?kind, "ignoring stale timer");
        return;
    }

    match (kind, state.status) {
        (TimerKind::AutoAdvance, PickupStatus::Arrived) => {
            state.finish(PickupStatus::Completed, true);
        }
        (TimerKind::Wait, PickupStatus::Waiting) => {
            state.set_status(PickupStatus::Arrived);
            arm(shared, &mut state, TimerKind::AutoAdvance);
        }
        _ => {
            state.timer = None;
        }
    }
}
