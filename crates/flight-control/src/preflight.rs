//! Live safety preconditions checked before each actuation

use crate::{with_timeout, FlightError, Result, VehicleControl};
use intent_parser::CommandType;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Armed,
    Airborne,
    Grounded,
}

impl Requirement {
    fn violation(&self) -> &'static str {
        match self {
            Requirement::Armed => "vehicle is not armed",
            Requirement::Airborne => "vehicle is not in the air, take off first",
            Requirement::Grounded => "vehicle is in the air, land first",
        }
    }
}

/// What must hold on the vehicle before `command` may actuate.
pub fn requirements(command: CommandType) -> &'static [Requirement] {
    match command {
        CommandType::Arm | CommandType::Shutdown => &[],
        CommandType::Disarm => &[Requirement::Grounded],
        CommandType::Takeoff => &[Requirement::Armed],
        CommandType::Stop
        | CommandType::Return
        | CommandType::Land
        | CommandType::Forward
        | CommandType::Backward
        | CommandType::Up
        | CommandType::Down
        | CommandType::Left
        | CommandType::Right
        | CommandType::RotateLeft
        | CommandType::RotateRight => &[Requirement::Armed, Requirement::Airborne],
    }
}

/// Read live telemetry and fail on the first unmet requirement.
///
/// Local flags are never consulted. A telemetry read that fails or times out
/// counts as unmet: the check cannot confirm the vehicle is safe to command.
pub async fn check(
    vehicle: &dyn VehicleControl,
    command: CommandType,
    telemetry_budget: Duration,
) -> Result<()> {
    for requirement in requirements(command) {
        let reading = match requirement {
            Requirement::Armed => {
                with_timeout("armed telemetry", telemetry_budget, vehicle.armed()).await
            }
            Requirement::Airborne | Requirement::Grounded => {
                with_timeout("in-air telemetry", telemetry_budget, vehicle.in_air()).await
            }
        };

        let satisfied = match reading {
            Ok(value) => match requirement {
                Requirement::Armed | Requirement::Airborne => value,
                Requirement::Grounded => !value,
            },
            Err(e) => {
                tracing::error!(command = %command, "Error reading {:?} state: {}", requirement, e);
                return Err(FlightError::precondition(
                    command,
                    format!("could not confirm {:?} state ({})", requirement, e),
                ));
            }
        };

        if !satisfied {
            return Err(FlightError::precondition(command, requirement.violation()));
        }
    }
    Ok(())
}
