use crate::{NedPosition, PositionNedYaw, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Autopilot flight mode as reported by telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightMode {
    Unknown,
    Ready,
    Takeoff,
    Hold,
    Mission,
    ReturnToLaunch,
    Land,
    Offboard,
    Manual,
    Posctl,
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlightMode::Unknown => "UNKNOWN",
            FlightMode::Ready => "READY",
            FlightMode::Takeoff => "TAKEOFF",
            FlightMode::Hold => "HOLD",
            FlightMode::Mission => "MISSION",
            FlightMode::ReturnToLaunch => "RETURN_TO_LAUNCH",
            FlightMode::Land => "LAND",
            FlightMode::Offboard => "OFFBOARD",
            FlightMode::Manual => "MANUAL",
            FlightMode::Posctl => "POSCTL",
        };
        f.write_str(s)
    }
}

/// Actuation and telemetry surface of an autopilot.
///
/// Implementations report firmware refusals as
/// [`FlightError::ActionRejected`](crate::FlightError::ActionRejected) or
/// [`FlightError::OffboardRejected`](crate::FlightError::OffboardRejected).
/// Callers impose their own timeouts; an implementation may block for as long
/// as the link does.
#[async_trait]
pub trait VehicleControl: Send + Sync {
    /// Open the transport at `address` (e.g. "udp://:14540").
    async fn connect(&self, address: &str) -> Result<()>;
    async fn is_connected(&self) -> Result<bool>;

    async fn arm(&self) -> Result<()>;
    async fn disarm(&self) -> Result<()>;
    async fn set_takeoff_altitude(&self, altitude_m: f64) -> Result<()>;
    async fn takeoff(&self) -> Result<()>;
    async fn land(&self) -> Result<()>;
    async fn hold(&self) -> Result<()>;
    async fn return_to_launch(&self) -> Result<()>;

    async fn start_offboard(&self) -> Result<()>;
    async fn stop_offboard(&self) -> Result<()>;
    async fn set_position_ned(&self, setpoint: PositionNedYaw) -> Result<()>;

    async fn armed(&self) -> Result<bool>;
    async fn in_air(&self) -> Result<bool>;
    async fn heading_deg(&self) -> Result<f64>;
    async fn position_ned(&self) -> Result<NedPosition>;
    async fn flight_mode(&self) -> Result<FlightMode>;
}
