//! Connection lifecycle: connect with retry, cleanup on exit

use crate::state::VehicleState;
use crate::{with_timeout, FlightConfig, FlightError, Result, VehicleControl};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const LINK_POLL: Duration = Duration::from_millis(100);

pub struct Session {
    state: Arc<VehicleState>,
    config: FlightConfig,
}

impl Session {
    pub fn new(state: Arc<VehicleState>, config: FlightConfig) -> Self {
        Self { state, config }
    }

    pub fn state(&self) -> &Arc<VehicleState> {
        &self.state
    }

    /// Connect to the configured address, retrying with exponential backoff.
    ///
    /// Every failure class is retried. Once the attempt cap is reached the
    /// error is [`FlightError::Connection`], the only fatal error.
    pub async fn connect(&self) -> Result<()> {
        let retry = self.config.retry;
        let attempts = retry.max_attempts.max(1);
        let vehicle = self.state.vehicle();

        for attempt in 1..=attempts {
            info!(
                address = %self.config.connection_address,
                "Attempting to connect to drone (Attempt {}/{})...",
                attempt,
                attempts
            );

            match self.attempt(vehicle.as_ref()).await {
                Ok(()) => {
                    info!("Connection stable.");
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    let delay = retry.delay_for(attempt);
                    warn!("Connection attempt failed: {}. Retrying in {:?}...", e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        "Maximum connection attempts reached. Unable to connect to the drone. Last error: {}",
                        e
                    );
                }
            }
        }

        Err(FlightError::Connection(format!(
            "drone connection failed after {} attempts",
            attempts
        )))
    }

    async fn attempt(&self, vehicle: &dyn VehicleControl) -> Result<()> {
        let budget = self.config.timeouts.connection;
        with_timeout(
            "connect",
            budget,
            vehicle.connect(&self.config.connection_address),
        )
        .await?;
        self.wait_for_link(vehicle).await?;

        info!("Successfully connected to the drone. Verifying stability...");
        tokio::time::sleep(self.config.retry.stability_delay).await;

        self.wait_for_link(vehicle).await.map_err(|e| {
            FlightError::Connection(format!("connection lost during verification ({})", e))
        })
    }

    async fn wait_for_link(&self, vehicle: &dyn VehicleControl) -> Result<()> {
        with_timeout("link confirmation", self.config.timeouts.connection, async {
            loop {
                if vehicle.is_connected().await? {
                    return Ok::<(), FlightError>(());
                }
                tokio::time::sleep(LINK_POLL).await;
            }
        })
        .await
    }

    /// Leave offboard if active, then drop the handle. Never fails.
    pub async fn cleanup(&self) {
        if self.state.offboard_active() {
            let vehicle = self.state.vehicle();
            match with_timeout(
                "offboard stop",
                self.config.timeouts.offboard,
                vehicle.stop_offboard(),
            )
            .await
            {
                Ok(()) => info!("Offboard mode stopped."),
                Err(e) if e.is_timeout() => {
                    error!("Timeout while stopping offboard mode during cleanup")
                }
                Err(e) => error!("Error disabling offboard mode: {}", e),
            }
        }
        self.state.reset();
        info!("Cleanup complete.");
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{Fault, NedPosition, SimOp, SimVehicle, VehicleCall};

    fn fast_config() -> FlightConfig {
        let mut config = FlightConfig::default();
        config.timeouts.connection = Duration::from_millis(50);
        config.timeouts.offboard = Duration::from_millis(30);
        config.retry.initial_delay = Duration::from_millis(5);
        config.retry.stability_delay = Duration::from_millis(1);
        config
    }

    fn session_for(sim: Arc<SimVehicle>) -> Session {
        Session::new(Arc::new(VehicleState::with_vehicle(sim)), fast_config())
    }

    fn connects(sim: &SimVehicle) -> usize {
        sim.calls()
            .iter()
            .filter(|c| matches!(c, VehicleCall::Connect(_)))
            .count()
    }

    #[tokio::test]
    async fn connects_first_try() {
        let sim = Arc::new(SimVehicle::new());
        let session = session_for(sim.clone());
        session.connect().await.unwrap();
        assert_eq!(
            sim.calls(),
            vec![VehicleCall::Connect("udp://:14540".to_string())]
        );
    }

    #[tokio::test]
    async fn retries_after_refusal_and_hang() {
        let sim = Arc::new(SimVehicle::new());
        sim.fail_times(SimOp::Connect, Fault::Reject, 1);
        let session = session_for(sim.clone());

        session.connect().await.unwrap();
        assert_eq!(connects(&sim), 2);

        let sim = Arc::new(SimVehicle::new());
        sim.fail_times(SimOp::Connect, Fault::Hang, 2);
        let session = session_for(sim.clone());
        session.connect().await.unwrap();
        assert_eq!(connects(&sim), 3);
    }

    #[tokio::test]
    async fn gives_up_with_fatal_error() {
        let sim = Arc::new(SimVehicle::new());
        sim.fail_always(SimOp::Connect, Fault::Reject);
        let session = session_for(sim.clone());

        let err = session.connect().await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(connects(&sim), 3);
    }

    #[tokio::test]
    async fn cleanup_stops_offboard_and_resets() {
        let sim = Arc::new(SimVehicle::airborne());
        let session = session_for(sim.clone());
        session.state().set_offboard_active(true);
        session.state().set_position(NedPosition::ORIGIN);

        session.cleanup().await;
        assert_eq!(sim.calls(), vec![VehicleCall::StopOffboard]);
        assert!(!session.state().snapshot().has_handle);
        assert!(!session.state().offboard_active());
    }

    #[tokio::test]
    async fn cleanup_survives_hung_offboard_stop() {
        let sim = Arc::new(SimVehicle::airborne());
        sim.fail_always(SimOp::StopOffboard, Fault::Hang);
        let session = session_for(sim.clone());
        session.state().set_offboard_active(true);

        session.cleanup().await;
        assert!(!session.state().offboard_active());
        assert!(!session.state().snapshot().has_handle);
    }

    #[tokio::test]
    async fn cleanup_without_offboard_issues_no_call() {
        let sim = Arc::new(SimVehicle::airborne());
        let session = session_for(sim.clone());
        session.cleanup().await;
        assert!(sim.calls().is_empty());
    }
}
