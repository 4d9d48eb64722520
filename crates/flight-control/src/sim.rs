//! In-process simulated vehicle for simulation mode and tests

use crate::frame::wrap_degrees;
use crate::{FlightError, FlightMode, NedPosition, PositionNedYaw, Result, VehicleControl};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Operations a fault can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    Connect,
    Arm,
    Disarm,
    Takeoff,
    Land,
    Hold,
    ReturnToLaunch,
    StartOffboard,
    StopOffboard,
    SetPosition,
    Armed,
    InAir,
    Heading,
    Position,
    FlightMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Never complete; the caller's timeout fires.
    Hang,
    /// Fail immediately with the error class the real link would report.
    Reject,
}

/// Record of an actuation call, in issue order
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleCall {
    Connect(String),
    Arm,
    Disarm,
    SetTakeoffAltitude(f64),
    Takeoff,
    Land,
    Hold,
    ReturnToLaunch,
    StartOffboard,
    StopOffboard,
    SetPosition(PositionNedYaw),
}

/// Most recent calls kept by [`SimVehicle::calls`]; older ones are dropped.
pub const CALL_LOG_CAPACITY: usize = 1024;

#[derive(Debug)]
struct SimState {
    connected: bool,
    armed: bool,
    in_air: bool,
    offboard: bool,
    setpoint_streamed: bool,
    heading_deg: f64,
    position: NedPosition,
    takeoff_altitude_m: f64,
    mode: FlightMode,
    calls: VecDeque<VehicleCall>,
    faults: HashMap<SimOp, (Fault, Option<u32>)>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            connected: false,
            armed: false,
            in_air: false,
            offboard: false,
            setpoint_streamed: false,
            heading_deg: 0.0,
            position: NedPosition::ORIGIN,
            takeoff_altitude_m: 2.5,
            mode: FlightMode::Ready,
            calls: VecDeque::new(),
            faults: HashMap::new(),
        }
    }
}

/// Simulated autopilot.
///
/// State changes happen instantly. The rules mirror what PX4 enforces:
/// no takeoff while disarmed, no disarm while airborne, and offboard start
/// is refused until at least one setpoint has been sent.
#[derive(Debug, Default)]
pub struct SimVehicle {
    state: Mutex<SimState>,
}

impl SimVehicle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connected, armed and hovering at 2.5 m above the origin.
    pub fn airborne() -> Self {
        let sim = Self::new();
        {
            let mut s = sim.state.lock();
            s.connected = true;
            s.armed = true;
            s.in_air = true;
            s.position = NedPosition::new(0.0, 0.0, -2.5);
            s.mode = FlightMode::Hold;
        }
        sim
    }

    /// Connected and disarmed on the ground.
    pub fn grounded() -> Self {
        let sim = Self::new();
        sim.state.lock().connected = true;
        sim
    }

    pub fn set_heading(&self, heading_deg: f64) {
        self.state.lock().heading_deg = heading_deg;
    }

    pub fn set_position(&self, position: NedPosition) {
        self.state.lock().position = position;
    }

    /// Attach a fault to every future call of `op`.
    pub fn fail_always(&self, op: SimOp, fault: Fault) {
        self.state.lock().faults.insert(op, (fault, None));
    }

    /// Attach a fault to the next `times` calls of `op`.
    pub fn fail_times(&self, op: SimOp, fault: Fault, times: u32) {
        if times > 0 {
            self.state.lock().faults.insert(op, (fault, Some(times)));
        }
    }

    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    pub fn calls(&self) -> Vec<VehicleCall> {
        self.state.lock().calls.iter().cloned().collect()
    }

    pub fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    pub fn is_in_air(&self) -> bool {
        self.state.lock().in_air
    }

    pub fn is_offboard(&self) -> bool {
        self.state.lock().offboard
    }

    pub fn current_position(&self) -> NedPosition {
        self.state.lock().position
    }

    pub fn current_heading(&self) -> f64 {
        self.state.lock().heading_deg
    }

    pub fn mode(&self) -> FlightMode {
        self.state.lock().mode
    }

    fn take_fault(&self, op: SimOp) -> Option<Fault> {
        let mut s = self.state.lock();
        let (fault, remaining) = s.faults.get(&op).copied()?;
        match remaining {
            Some(n) if n <= 1 => {
                s.faults.remove(&op);
            }
            Some(n) => {
                s.faults.insert(op, (fault, Some(n - 1)));
            }
            None => {}
        }
        Some(fault)
    }

    /// Apply any pending fault for `op`. The mutex is released before
    /// suspending so a hung call never blocks other readers.
    async fn gate(&self, op: SimOp) -> Result<()> {
        match self.take_fault(op) {
            None => Ok(()),
            Some(Fault::Hang) => {
                std::future::pending::<()>().await;
                Ok(())
            }
            Some(Fault::Reject) => Err(rejection(op)),
        }
    }

    fn record(&self, call: VehicleCall) {
        let mut s = self.state.lock();
        if s.calls.len() == CALL_LOG_CAPACITY {
            s.calls.pop_front();
        }
        s.calls.push_back(call);
    }
}

fn rejection(op: SimOp) -> FlightError {
    match op {
        SimOp::Connect => FlightError::Connection("simulated link refused".to_string()),
        SimOp::StartOffboard | SimOp::StopOffboard | SimOp::SetPosition => {
            FlightError::OffboardRejected(format!("{:?} refused by simulator", op))
        }
        SimOp::Armed | SimOp::InAir | SimOp::Heading | SimOp::Position | SimOp::FlightMode => {
            FlightError::TelemetryUnavailable(format!("{:?} stream closed", op))
        }
        _ => FlightError::ActionRejected(format!("{:?} refused by simulator", op)),
    }
}

#[async_trait]
impl VehicleControl for SimVehicle {
    async fn connect(&self, address: &str) -> Result<()> {
        self.record(VehicleCall::Connect(address.to_string()));
        self.gate(SimOp::Connect).await?;
        self.state.lock().connected = true;
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool> {
        Ok(self.state.lock().connected)
    }

    async fn arm(&self) -> Result<()> {
        self.gate(SimOp::Arm).await?;
        self.record(VehicleCall::Arm);
        let mut s = self.state.lock();
        s.armed = true;
        Ok(())
    }

    async fn disarm(&self) -> Result<()> {
        self.gate(SimOp::Disarm).await?;
        self.record(VehicleCall::Disarm);
        let mut s = self.state.lock();
        if s.in_air {
            return Err(FlightError::ActionRejected(
                "cannot disarm while airborne".to_string(),
            ));
        }
        s.armed = false;
        Ok(())
    }

    async fn set_takeoff_altitude(&self, altitude_m: f64) -> Result<()> {
        self.gate(SimOp::Takeoff).await?;
        self.record(VehicleCall::SetTakeoffAltitude(altitude_m));
        self.state.lock().takeoff_altitude_m = altitude_m;
        Ok(())
    }

    async fn takeoff(&self) -> Result<()> {
        self.gate(SimOp::Takeoff).await?;
        self.record(VehicleCall::Takeoff);
        let mut s = self.state.lock();
        if !s.armed {
            return Err(FlightError::ActionRejected("vehicle not armed".to_string()));
        }
        s.in_air = true;
        s.position.down_m = -s.takeoff_altitude_m;
        s.mode = FlightMode::Hold;
        Ok(())
    }

    async fn land(&self) -> Result<()> {
        self.gate(SimOp::Land).await?;
        self.record(VehicleCall::Land);
        let mut s = self.state.lock();
        s.in_air = false;
        s.offboard = false;
        s.position.down_m = 0.0;
        s.mode = FlightMode::Land;
        Ok(())
    }

    async fn hold(&self) -> Result<()> {
        self.gate(SimOp::Hold).await?;
        self.record(VehicleCall::Hold);
        let mut s = self.state.lock();
        s.offboard = false;
        s.mode = FlightMode::Hold;
        Ok(())
    }

    async fn return_to_launch(&self) -> Result<()> {
        self.gate(SimOp::ReturnToLaunch).await?;
        self.record(VehicleCall::ReturnToLaunch);
        let mut s = self.state.lock();
        s.offboard = false;
        s.in_air = false;
        s.position = NedPosition::ORIGIN;
        s.mode = FlightMode::ReturnToLaunch;
        Ok(())
    }

    async fn start_offboard(&self) -> Result<()> {
        self.gate(SimOp::StartOffboard).await?;
        self.record(VehicleCall::StartOffboard);
        let mut s = self.state.lock();
        if !s.setpoint_streamed {
            return Err(FlightError::OffboardRejected(
                "no setpoint received before start".to_string(),
            ));
        }
        s.offboard = true;
        s.mode = FlightMode::Offboard;
        Ok(())
    }

    async fn stop_offboard(&self) -> Result<()> {
        self.gate(SimOp::StopOffboard).await?;
        self.record(VehicleCall::StopOffboard);
        let mut s = self.state.lock();
        s.offboard = false;
        s.setpoint_streamed = false;
        s.mode = FlightMode::Hold;
        Ok(())
    }

    async fn set_position_ned(&self, setpoint: PositionNedYaw) -> Result<()> {
        self.gate(SimOp::SetPosition).await?;
        self.record(VehicleCall::SetPosition(setpoint));
        let mut s = self.state.lock();
        s.setpoint_streamed = true;
        if s.offboard {
            s.position = setpoint.position;
            s.heading_deg = wrap_degrees(setpoint.yaw_deg);
        }
        Ok(())
    }

    async fn armed(&self) -> Result<bool> {
        self.gate(SimOp::Armed).await?;
        Ok(self.state.lock().armed)
    }

    async fn in_air(&self) -> Result<bool> {
        self.gate(SimOp::InAir).await?;
        Ok(self.state.lock().in_air)
    }

    async fn heading_deg(&self) -> Result<f64> {
        self.gate(SimOp::Heading).await?;
        Ok(self.state.lock().heading_deg)
    }

    async fn position_ned(&self) -> Result<NedPosition> {
        self.gate(SimOp::Position).await?;
        Ok(self.state.lock().position)
    }

    async fn flight_mode(&self) -> Result<FlightMode> {
        self.gate(SimOp::FlightMode).await?;
        Ok(self.state.lock().mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn takeoff_requires_arming() {
        let sim = SimVehicle::grounded();
        assert!(matches!(
            sim.takeoff().await,
            Err(FlightError::ActionRejected(_))
        ));
        sim.arm().await.unwrap();
        sim.set_takeoff_altitude(4.0).await.unwrap();
        sim.takeoff().await.unwrap();
        assert!(sim.is_in_air());
        assert_eq!(sim.current_position().down_m, -4.0);
    }

    #[tokio::test]
    async fn offboard_needs_a_setpoint_first() {
        let sim = SimVehicle::airborne();
        assert!(matches!(
            sim.start_offboard().await,
            Err(FlightError::OffboardRejected(_))
        ));
        let sp = NedPosition::new(0.0, 0.0, -2.5).with_yaw(0.0);
        sim.set_position_ned(sp).await.unwrap();
        sim.start_offboard().await.unwrap();
        assert!(sim.is_offboard());
        assert_eq!(sim.mode(), FlightMode::Offboard);
    }

    #[tokio::test]
    async fn one_shot_fault_clears_itself() {
        let sim = SimVehicle::grounded();
        sim.fail_times(SimOp::Arm, Fault::Reject, 1);
        assert!(sim.arm().await.is_err());
        assert!(sim.arm().await.is_ok());
        assert_eq!(sim.calls(), vec![VehicleCall::Arm]);
    }

    #[tokio::test]
    async fn hung_call_never_returns() {
        let sim = SimVehicle::grounded();
        sim.fail_always(SimOp::Arm, Fault::Hang);
        let res = tokio::time::timeout(std::time::Duration::from_millis(20), sim.arm()).await;
        assert!(res.is_err());
        assert!(!sim.is_armed());
    }

    #[tokio::test]
    async fn call_log_keeps_most_recent() {
        let sim = SimVehicle::airborne();
        for i in 0..CALL_LOG_CAPACITY + 10 {
            let sp = NedPosition::new(i as f64, 0.0, -2.5).with_yaw(0.0);
            sim.set_position_ned(sp).await.unwrap();
        }
        let calls = sim.calls();
        assert_eq!(calls.len(), CALL_LOG_CAPACITY);
        assert_eq!(
            calls.first(),
            Some(&VehicleCall::SetPosition(
                NedPosition::new(10.0, 0.0, -2.5).with_yaw(0.0)
            ))
        );
        assert_eq!(
            calls.last(),
            Some(&VehicleCall::SetPosition(
                NedPosition::new((CALL_LOG_CAPACITY + 9) as f64, 0.0, -2.5).with_yaw(0.0)
            ))
        );
    }
}
