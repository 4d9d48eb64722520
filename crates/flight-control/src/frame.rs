//! Local North-East-Down frame arithmetic

use intent_parser::CommandType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Position in the local tangent frame, meters. Down is positive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NedPosition {
    pub north_m: f64,
    pub east_m: f64,
    pub down_m: f64,
}

impl NedPosition {
    pub const ORIGIN: NedPosition = NedPosition {
        north_m: 0.0,
        east_m: 0.0,
        down_m: 0.0,
    };

    pub fn new(north_m: f64, east_m: f64, down_m: f64) -> Self {
        Self {
            north_m,
            east_m,
            down_m,
        }
    }

    pub fn with_yaw(self, yaw_deg: f64) -> PositionNedYaw {
        PositionNedYaw {
            position: self,
            yaw_deg,
        }
    }
}

impl Add for NedPosition {
    type Output = NedPosition;

    fn add(self, rhs: NedPosition) -> NedPosition {
        NedPosition::new(
            self.north_m + rhs.north_m,
            self.east_m + rhs.east_m,
            self.down_m + rhs.down_m,
        )
    }
}

impl fmt::Display for NedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N {:.2} E {:.2} D {:.2}",
            self.north_m, self.east_m, self.down_m
        )
    }
}

/// Offboard position setpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionNedYaw {
    pub position: NedPosition,
    pub yaw_deg: f64,
}

/// Unit displacement for a translation command in body axes
/// (forward, right, down).
pub fn direction_vector(command: CommandType) -> Option<[f64; 3]> {
    match command {
        CommandType::Forward => Some([1.0, 0.0, 0.0]),
        CommandType::Backward => Some([-1.0, 0.0, 0.0]),
        CommandType::Left => Some([0.0, -1.0, 0.0]),
        CommandType::Right => Some([0.0, 1.0, 0.0]),
        CommandType::Up => Some([0.0, 0.0, -1.0]),
        CommandType::Down => Some([0.0, 0.0, 1.0]),
        _ => None,
    }
}

/// Rotate a body-axis displacement by heading into the NED frame. The
/// vertical component is independent of yaw.
pub fn body_to_ned(body: [f64; 3], yaw_deg: f64) -> NedPosition {
    let (sin, cos) = yaw_deg.to_radians().sin_cos();
    let [x, y, z] = body;
    NedPosition::new(x * cos - y * sin, x * sin + y * cos, z)
}

/// Displacement for `command` moving `distance_m` while facing `yaw_deg`.
pub fn displacement(command: CommandType, distance_m: f64, yaw_deg: f64) -> Option<NedPosition> {
    let [x, y, z] = direction_vector(command)?;
    Some(body_to_ned(
        [x * distance_m, y * distance_m, z * distance_m],
        yaw_deg,
    ))
}

/// Normalize a heading into (-180, 180].
pub fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
