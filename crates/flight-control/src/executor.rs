//! Executes one parsed command against the vehicle
//!
//! Every command reads live telemetry for its preconditions, releases
//! offboard control first when it hands control back to the autopilot, and
//! wraps each vehicle call in the time budget of its operation class.
//! Translations and rotations lazily bring the vehicle into offboard mode and
//! track the commanded position locally in the NED frame.

use crate::config::{MotionConfig, Timeouts};
use crate::frame::{self, wrap_degrees};
use crate::state::{ExecutionFlags, VehicleState};
use crate::{preflight, with_timeout, FlightConfig, FlightError, NedPosition, Result, VehicleControl};
use intent_parser::{CommandType, ConversionCache, ParsedCommand, Unit};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a single command ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed,
    /// Not attempted because a stop was already requested
    Skipped,
    /// Setpoint sent, but the post-motion wait was cut short by a stop
    Interrupted,
    /// Power-off requested; the session must end
    Shutdown,
}

pub struct CommandExecutor {
    state: Arc<VehicleState>,
    flags: Arc<ExecutionFlags>,
    timeouts: Timeouts,
    motion: MotionConfig,
    conversions: ConversionCache,
}

impl CommandExecutor {
    pub fn new(state: Arc<VehicleState>, flags: Arc<ExecutionFlags>, config: &FlightConfig) -> Self {
        Self {
            state,
            flags,
            timeouts: config.timeouts,
            motion: config.motion,
            conversions: ConversionCache::default(),
        }
    }

    pub fn state(&self) -> &Arc<VehicleState> {
        &self.state
    }

    pub fn flags(&self) -> &Arc<ExecutionFlags> {
        &self.flags
    }

    pub async fn execute(&self, cmd: &ParsedCommand) -> Result<CommandOutcome> {
        if self.flags.stop_requested() && cmd.command != CommandType::Stop {
            info!("Skipping {} due to STOP request", cmd.command);
            return Ok(CommandOutcome::Skipped);
        }

        let vehicle = self.state.vehicle();
        let vehicle = vehicle.as_ref();

        preflight::check(vehicle, cmd.command, self.timeouts.telemetry).await?;

        if cmd.command.releases_offboard() && self.state.offboard_active() {
            self.release_offboard(vehicle).await?;
        }

        log_command(cmd);
        match cmd.command {
            CommandType::Arm => self.action("arm", vehicle.arm()).await?,
            CommandType::Disarm => self.action("disarm", vehicle.disarm()).await?,
            CommandType::Stop => self.action("hold", vehicle.hold()).await?,
            CommandType::Return => {
                self.action("return to launch", vehicle.return_to_launch())
                    .await?
            }
            CommandType::Land => self.action("land", vehicle.land()).await?,
            CommandType::Shutdown => return Ok(CommandOutcome::Shutdown),
            CommandType::Takeoff => self.takeoff(vehicle, cmd).await?,
            command if command.is_translation() => {
                let distance_m = self.distance_m(cmd);
                return with_timeout(
                    "movement",
                    self.timeouts.movement,
                    self.translate(vehicle, command, distance_m),
                )
                .await;
            }
            command => {
                let angle_deg = self.angle_deg(cmd);
                return with_timeout(
                    "rotation",
                    self.timeouts.movement,
                    self.rotate(vehicle, command, angle_deg),
                )
                .await;
            }
        }

        Ok(CommandOutcome::Completed)
    }

    async fn action<F>(&self, operation: &'static str, call: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        with_timeout(operation, self.timeouts.action, call).await
    }

    async fn takeoff(&self, vehicle: &dyn VehicleControl, cmd: &ParsedCommand) -> Result<()> {
        let mode = self.read_flight_mode(vehicle).await;
        info!("Takeoff initiated in flight mode: {}", mode);

        let altitude_m = cmd
            .magnitude
            .map(|m| self.to_meters(m, cmd.unit))
            .unwrap_or(self.motion.default_takeoff_altitude_m);

        self.action("set takeoff altitude", vehicle.set_takeoff_altitude(altitude_m))
            .await?;
        self.action("takeoff", vehicle.takeoff()).await
    }

    /// Leave offboard before handing control back. A timeout still marks
    /// offboard inactive locally and aborts the command.
    async fn release_offboard(&self, vehicle: &dyn VehicleControl) -> Result<()> {
        match with_timeout("offboard stop", self.timeouts.offboard, vehicle.stop_offboard()).await {
            Ok(()) => {
                self.state.set_offboard_active(false);
                Ok(())
            }
            Err(e) if e.is_timeout() => {
                error!("Offboard stop timed out");
                self.state.set_offboard_active(false);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Enter offboard mode holding the current pose, or return the tracked
    /// position if already there.
    async fn ensure_offboard(
        &self,
        vehicle: &dyn VehicleControl,
        command: CommandType,
    ) -> Result<NedPosition> {
        if let Some(position) = self.state.position() {
            return Ok(position);
        }

        preflight::check(vehicle, command, self.timeouts.telemetry).await?;

        let mode = self.read_flight_mode(vehicle).await;
        info!("Switching from {} to OFFBOARD mode", mode);

        let yaw = self.read_heading(vehicle).await;
        let position = match with_timeout(
            "position telemetry",
            self.timeouts.telemetry,
            vehicle.position_ned(),
        )
        .await
        {
            Ok(position) => position,
            Err(e) => {
                error!("Could not get NED position. Setting to origin: {}", e);
                NedPosition::ORIGIN
            }
        };
        self.state.set_position(position);

        // Stream the current pose first so entering offboard does not jump.
        with_timeout(
            "offboard setpoint",
            self.timeouts.offboard,
            vehicle.set_position_ned(position.with_yaw(yaw)),
        )
        .await?;
        with_timeout("offboard start", self.timeouts.offboard, vehicle.start_offboard()).await?;
        self.state.set_offboard_active(true);

        tokio::time::sleep(self.motion.offboard_settle).await;
        Ok(position)
    }

    async fn translate(
        &self,
        vehicle: &dyn VehicleControl,
        command: CommandType,
        distance_m: f64,
    ) -> Result<CommandOutcome> {
        let current = self.ensure_offboard(vehicle, command).await?;
        let yaw = self.read_heading(vehicle).await;

        let delta = frame::displacement(command, distance_m, yaw).ok_or_else(|| {
            FlightError::Unclassified(format!("no direction vector for {}", command))
        })?;
        let target = current + delta;

        with_timeout(
            "position setpoint",
            self.timeouts.offboard,
            vehicle.set_position_ned(target.with_yaw(yaw)),
        )
        .await?;
        self.state.set_position(target);
        debug!(command = %command, "Setpoint {} yaw {:.1}", target, yaw);

        Ok(self.wait_interruptibly("Movement").await)
    }

    async fn rotate(
        &self,
        vehicle: &dyn VehicleControl,
        command: CommandType,
        angle_deg: f64,
    ) -> Result<CommandOutcome> {
        let current = self.ensure_offboard(vehicle, command).await?;
        let yaw = self.read_heading(vehicle).await;

        let target_yaw = match command {
            CommandType::RotateRight => wrap_degrees(yaw + angle_deg),
            _ => wrap_degrees(yaw - angle_deg),
        };

        with_timeout(
            "yaw setpoint",
            self.timeouts.offboard,
            vehicle.set_position_ned(current.with_yaw(target_yaw)),
        )
        .await?;
        debug!(command = %command, "Yaw {:.1} -> {:.1}", yaw, target_yaw);

        Ok(self.wait_interruptibly("Rotation").await)
    }

    /// Let the motion play out, giving up early once a stop is requested.
    async fn wait_interruptibly(&self, kind: &str) -> CommandOutcome {
        for _ in 0..self.motion.interrupt_poll_count {
            if self.flags.stop_requested() {
                info!("{} command interrupted!", kind);
                return CommandOutcome::Interrupted;
            }
            tokio::time::sleep(self.motion.interrupt_poll_interval).await;
        }
        CommandOutcome::Completed
    }

    async fn read_heading(&self, vehicle: &dyn VehicleControl) -> f64 {
        match with_timeout("heading telemetry", self.timeouts.telemetry, vehicle.heading_deg()).await {
            Ok(yaw) => yaw,
            Err(e) => {
                error!("Error getting current yaw: {}", e);
                0.0
            }
        }
    }

    async fn read_flight_mode(&self, vehicle: &dyn VehicleControl) -> crate::FlightMode {
        with_timeout("flight mode telemetry", self.timeouts.telemetry, vehicle.flight_mode())
            .await
            .unwrap_or_else(|e| {
                warn!("Error checking flight mode: {}", e);
                crate::FlightMode::Unknown
            })
    }

    fn to_meters(&self, value: f64, unit: Option<Unit>) -> f64 {
        self.conversions.convert(value, unit.unwrap_or(Unit::Meters))
    }

    fn distance_m(&self, cmd: &ParsedCommand) -> f64 {
        if cmd.unit.map_or(false, |u| u.is_angular()) {
            warn!("{} given in degrees, treating as meters", cmd.command);
        }
        cmd.magnitude
            .map(|m| self.to_meters(m, cmd.unit))
            .unwrap_or(self.motion.default_step_m)
    }

    /// Spoken rotation magnitudes are always degrees.
    fn angle_deg(&self, cmd: &ParsedCommand) -> f64 {
        if let Some(unit) = cmd.unit.filter(|u| !u.is_angular() && *u != Unit::Meters) {
            warn!("{} given in {}, treating as degrees", cmd.command, unit);
        }
        cmd.magnitude.unwrap_or(self.motion.default_rotation_deg)
    }
}

/// `Command: <TYPE> [<magnitude> [<unit>]]`
pub fn log_command(cmd: &ParsedCommand) {
    info!(
        command = %cmd.command,
        magnitude = ?cmd.magnitude,
        unit = ?cmd.unit,
        "Command: {}",
        cmd
    );
}

/// Log a failed command with enough context to reconstruct the attempt.
pub fn log_failure(cmd: &ParsedCommand, err: &FlightError) {
    let what = match err {
        FlightError::Timeout { .. } => "timed out",
        FlightError::ActionRejected(_) => "action error",
        FlightError::OffboardRejected(_) => "offboard error",
        FlightError::Precondition { .. } => "precondition failed",
        FlightError::TelemetryUnavailable(_) => "telemetry unavailable",
        FlightError::Connection(_) | FlightError::NotConnected => "connection error",
        FlightError::Unclassified(_) => "unexpected error",
    };
    error!(
        command = %cmd.command,
        magnitude = ?cmd.magnitude,
        unit = ?cmd.unit,
        "{} {}: {}",
        cmd,
        what,
        err
    );
}
