//! flight-control: validated execution of parsed voice commands
//!
//! This crate owns the vehicle side of the pilot: the [`VehicleControl`]
//! abstraction, the per-command executor with its offboard state machine, the
//! chain runner that honours STOP between steps, and the command loop that
//! ties a transcript source to all of it. The default build enables a `mock`
//! feature carrying an in-process [`SimVehicle`] so binaries and tests run
//! without an autopilot.

mod error;
pub use error::{FlightError, Result};

mod config;
pub use config::{FlightConfig, MotionConfig, RetryPolicy, Timeouts, MAX_RETRY_DELAY};

pub mod frame;
pub use frame::{NedPosition, PositionNedYaw};

mod vehicle;
pub use vehicle::{FlightMode, VehicleControl};

#[cfg(feature = "mock")]
mod sim;

#[cfg(feature = "mock")]
pub use sim::{Fault, SimOp, SimVehicle, VehicleCall, CALL_LOG_CAPACITY};

mod state;
pub use state::{ExecutionFlags, StateSnapshot, VehicleFactory, VehicleState};

pub mod preflight;

mod executor;
pub use executor::{log_command, log_failure, CommandExecutor, CommandOutcome};

mod session;
pub use session::Session;

mod orchestrator;
pub use orchestrator::{ChainOutcome, ChainRunner, LogOnlyPower, PowerControl};

mod command_loop;
pub use command_loop::{CommandLoop, LoopExit};

use std::future::Future;
use std::time::Duration;

/// Run `fut` under `budget`, reporting expiry as [`FlightError::Timeout`].
///
/// The inner future is dropped on expiry; any vehicle call it was awaiting
/// is abandoned, not cancelled on the vehicle.
pub async fn with_timeout<T, F>(operation: &'static str, budget: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => Err(FlightError::Timeout { operation, budget }),
    }
}

/// Initialize the flight control system
pub fn init() -> Result<()> {
    tracing::info!(mock = cfg!(feature = "mock"), "Initializing flight control");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_maps_to_flight_error() {
        let err = with_timeout("handshake", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, FlightError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FlightError::Timeout { operation: "handshake", .. }));
    }

    #[tokio::test]
    async fn inner_error_passes_through() {
        let err = with_timeout("handshake", Duration::from_secs(1), async {
            Err::<(), _>(FlightError::NotConnected)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FlightError::NotConnected));
    }
}
