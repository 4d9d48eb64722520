//! Shared vehicle record and execution flags
//!
//! Both are shared between the command loop and the chain task. The vehicle
//! record sits behind one mutex so readers never see a half-reset record;
//! the two flags are independent atomics.

use crate::{NedPosition, VehicleControl};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Builds a fresh vehicle handle on first access after a reset
pub type VehicleFactory = Arc<dyn Fn() -> Arc<dyn VehicleControl> + Send + Sync>;

#[derive(Default)]
struct StateRecord {
    handle: Option<Arc<dyn VehicleControl>>,
    offboard_active: bool,
    position: Option<NedPosition>,
}

/// Consistent copy of the record at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSnapshot {
    pub has_handle: bool,
    pub offboard_active: bool,
    pub position: Option<NedPosition>,
}

pub struct VehicleState {
    factory: VehicleFactory,
    record: Mutex<StateRecord>,
}

impl VehicleState {
    pub fn new(factory: VehicleFactory) -> Self {
        Self {
            factory,
            record: Mutex::new(StateRecord::default()),
        }
    }

    /// State whose factory always hands out the same vehicle.
    pub fn with_vehicle(vehicle: Arc<dyn VehicleControl>) -> Self {
        Self::new(Arc::new(move || vehicle.clone()))
    }

    /// Current handle, created on first access.
    pub fn vehicle(&self) -> Arc<dyn VehicleControl> {
        let mut record = self.record.lock();
        record
            .handle
            .get_or_insert_with(|| (self.factory)())
            .clone()
    }

    /// Drop the handle and forget offboard state in one step.
    pub fn reset(&self) {
        *self.record.lock() = StateRecord::default();
    }

    pub fn offboard_active(&self) -> bool {
        self.record.lock().offboard_active
    }

    pub fn set_offboard_active(&self, active: bool) {
        self.record.lock().offboard_active = active;
    }

    /// Tracked setpoint position. Only defined while offboard is active.
    pub fn position(&self) -> Option<NedPosition> {
        let record = self.record.lock();
        if record.offboard_active {
            record.position
        } else {
            None
        }
    }

    pub fn set_position(&self, position: NedPosition) {
        self.record.lock().position = Some(position);
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let record = self.record.lock();
        StateSnapshot {
            has_handle: record.handle.is_some(),
            offboard_active: record.offboard_active,
            position: record.position,
        }
    }
}

/// Stop-request and chain-in-progress flags
#[derive(Debug, Default)]
pub struct ExecutionFlags {
    stop_requested: AtomicBool,
    command_executing: AtomicBool,
}

impl ExecutionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn clear_stop(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    pub fn is_executing(&self) -> bool {
        self.command_executing.load(Ordering::SeqCst)
    }

    /// Claim the executing flag. Returns false if a chain already holds it.
    /// A successful claim also clears any stale stop request.
    pub fn try_begin(&self) -> bool {
        let claimed = self
            .command_executing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if claimed {
            self.clear_stop();
        }
        claimed
    }

    pub fn finish(&self) {
        self.command_executing.store(false, Ordering::SeqCst);
        self.stop_requested.store(false, Ordering::SeqCst);
    }
}
