//! Live vehicle position relay.
//!
//! Holds the single last-known [`VehiclePosition`] and fans every update out
//! to the observers connected at that moment. A newly connected observer gets
//! exactly one catch-up snapshot of the current position, never a history.
//!
//! # Locking
//!
//! The observer list lock is taken before the position lock on both the
//! update and the connect path. Updates and connects are therefore
//! serialised: a new observer sees its snapshot first and then every later
//! update, in the order the relay received them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::Coordinate;

/// Last-known vehicle position. Superseded values are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePosition {
    pub lat: f64,
    pub lng: f64,
    pub observed_at: DateTime<Utc>,
}

impl VehiclePosition {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
}

/// Unicast acknowledgement returned to the sender of a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionAck {
    pub status: AckStatus,
    /// Serialised as RFC 3339.
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Receiving end of a relay subscription.
///
/// Dropping it disconnects the observer; the relay prunes it on the next
/// broadcast.
#[derive(Debug)]
pub struct Observer {
    id: ObserverId,
    updates: Receiver<VehiclePosition>,
}

impl Observer {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Block until the next position arrives.
    pub fn recv(&self) -> Option<VehiclePosition> {
        self.updates.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<VehiclePosition> {
        self.updates.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<VehiclePosition> {
        self.updates.try_recv().ok()
    }

    /// Everything already queued, without blocking.
    pub fn drain(&self) -> Vec<VehiclePosition> {
        self.updates.try_iter().collect()
    }
}

struct ObserverSlot {
    id: ObserverId,
    sender: Sender<VehiclePosition>,
}

#[derive(Default)]
pub struct LocationRelay {
    current: RwLock<Option<VehiclePosition>>,
    observers: Mutex<Vec<ObserverSlot>>,
    next_id: AtomicU64,
}

impl LocationRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new vehicle position and broadcast it to every live observer.
    pub fn on_vehicle_position(&self, coord: Coordinate) -> PositionAck {
        let now = Utc::now();
        let position = VehiclePosition {
            lat: coord.lat,
            lng: coord.lng,
            observed_at: now,
        };

        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(position);

        let before = observers.len();
        observers.retain(|slot| slot.sender.send(position).is_ok());
        if observers.len() < before {
            debug!(pruned = before - observers.len(), "dropped disconnected observers");
        }

        PositionAck {
            status: AckStatus::Success,
            time: now,
        }
    }

    /// Subscribe a new observer, delivering the current position if any.
    pub fn connect_observer(&self) -> Observer {
        let (sender, updates) = mpsc::channel();
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(position) = *self.current.read().unwrap_or_else(PoisonError::into_inner) {
            // Receiver is still in hand, so this cannot fail.
            let _ = sender.send(position);
        }
        observers.push(ObserverSlot { id, sender });
        debug!(observer = id.0, total = observers.len(), "observer connected");

        Observer { id, updates }
    }

    pub fn disconnect_observer(&self, id: ObserverId) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.retain(|slot| slot.id != id);
        debug!(observer = id.0, total = observers.len(), "observer disconnected");
    }

    /// Consistent snapshot of the last-known position.
    pub fn current_position(&self) -> Option<VehiclePosition> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_snapshot_before_first_update() {
        let relay = LocationRelay::new();
        let observer = relay.connect_observer();
        assert!(observer.try_recv().is_none());
        assert!(relay.current_position().is_none());
    }

    #[test]
    fn test_ack_and_register_overwrite() {
        let relay = LocationRelay::new();
        let ack = relay.on_vehicle_position(Coordinate::new(27.67, 85.32));
        assert_eq!(ack.status, AckStatus::Success);

        relay.on_vehicle_position(Coordinate::new(27.68, 85.33));
        let current = relay.current_position().expect("position recorded");
        assert_eq!(current.coordinate(), Coordinate::new(27.68, 85.33));
    }

    #[test]
    fn test_dropped_observer_is_pruned() {
        let relay = LocationRelay::new();
        let observer = relay.connect_observer();
        let _kept = relay.connect_observer();
        assert_eq!(relay.observer_count(), 2);

        drop(observer);
        relay.on_vehicle_position(Coordinate::new(1.0, 1.0));
        assert_eq!(relay.observer_count(), 1);
    }

    #[test]
    fn test_explicit_disconnect() {
        let relay = LocationRelay::new();
        let observer = relay.connect_observer();
        relay.disconnect_observer(observer.id());
        assert_eq!(relay.observer_count(), 0);

        relay.on_vehicle_position(Coordinate::new(1.0, 1.0));
        assert!(observer.try_recv().is_none());
    }

    #[test]
    fn test_ack_serialises() {
        let relay = LocationRelay::new();
        let ack = relay.on_vehicle_position(Coordinate::new(1.0, 1.0));
        let json = serde_json::to_value(ack).expect("should serialise");
        assert_eq!(json["status"], "success");

        let time = json["time"].as_str().expect("time is a string");
        let parsed = DateTime::parse_from_rfc3339(time).expect("RFC 3339 timestamp");
        assert_eq!(parsed.with_timezone(&Utc), ack.time);
    }

    #[test]
    fn test_position_serialises_observed_at_as_string() {
        let relay = LocationRelay::new();
        relay.on_vehicle_position(Coordinate::new(27.67, 85.32));
        let position = relay.current_position().expect("position recorded");

        let json = serde_json::to_value(position).expect("should serialise");
        assert_eq!(json["lat"], 27.67);
        let observed_at = json["observedAt"].as_str().expect("observedAt is a string");
        assert!(DateTime::parse_from_rfc3339(observed_at).is_ok());
    }
}
