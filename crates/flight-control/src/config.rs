//! Timeouts, retry policy and motion defaults

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the flight side of the pilot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Transport address handed to the vehicle backend
    pub connection_address: String,
    pub timeouts: Timeouts,
    pub retry: RetryPolicy,
    pub motion: MotionConfig,
    /// How often the command loop polls the transcription source
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            connection_address: "udp://:14540".to_string(),
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
            motion: MotionConfig::default(),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Per operation-class time budgets
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(with = "duration_ms")]
    pub connection: Duration,
    /// arm, disarm, takeoff, land, hold, return
    #[serde(with = "duration_ms")]
    pub action: Duration,
    /// A whole translation or rotation step
    #[serde(with = "duration_ms")]
    pub movement: Duration,
    /// Offboard start/stop and setpoints
    #[serde(with = "duration_ms")]
    pub offboard: Duration,
    /// A single telemetry read
    #[serde(with = "duration_ms")]
    pub telemetry: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connection: Duration::from_secs(45),
            action: Duration::from_secs(15),
            movement: Duration::from_secs(20),
            offboard: Duration::from_secs(8),
            telemetry: Duration::from_secs(2),
        }
    }
}

/// Exponential backoff for the initial connection
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "duration_ms")]
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    /// Pause before re-checking that a fresh link is still up
    #[serde(with = "duration_ms")]
    pub stability_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(3),
            backoff_multiplier: 2.0,
            stability_delay: Duration::from_secs(1),
        }
    }
}

/// Longest pause between connection attempts, whatever the multiplier.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), capped at
    /// [`MAX_RETRY_DELAY`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = if self.backoff_multiplier.is_finite() {
            self.backoff_multiplier.max(1.0).powi(exponent)
        } else {
            f64::INFINITY
        };
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Translation used when no distance was spoken
    pub default_step_m: f64,
    pub default_rotation_deg: f64,
    pub default_takeoff_altitude_m: f64,
    /// Pause after entering offboard before the first motion setpoint
    #[serde(with = "duration_ms")]
    pub offboard_settle: Duration,
    #[serde(with = "duration_ms")]
    pub interrupt_poll_interval: Duration,
    pub interrupt_poll_count: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            default_step_m: 0.1,
            default_rotation_deg: 90.0,
            default_takeoff_altitude_m: 1.0,
            offboard_settle: Duration::from_millis(500),
            interrupt_poll_interval: Duration::from_millis(100),
            interrupt_poll_count: 10,
        }
    }
}

impl MotionConfig {
    /// Worst case time a motion step can ignore a stop request after its
    /// setpoint went out.
    pub fn interrupt_latency(&self) -> Duration {
        self.interrupt_poll_interval * self.interrupt_poll_count
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.delay_for(1), Duration::from_secs(3));
        assert_eq!(retry.delay_for(2), Duration::from_secs(6));
        assert_eq!(retry.delay_for(3), Duration::from_secs(12));
    }

    #[test]
    fn huge_multiplier_is_capped() {
        let retry: RetryPolicy =
            serde_json::from_str(r#"{"backoff_multiplier":1e300,"initial_delay":3000}"#).unwrap();
        assert_eq!(retry.delay_for(1), Duration::from_secs(3));
        assert_eq!(retry.delay_for(2), MAX_RETRY_DELAY);
        assert_eq!(retry.delay_for(u32::MAX), MAX_RETRY_DELAY);

        let retry = RetryPolicy {
            backoff_multiplier: f64::NAN,
            ..RetryPolicy::default()
        };
        assert_eq!(retry.delay_for(3), MAX_RETRY_DELAY);
    }

    #[test]
    fn durations_serialize_as_millis() {
        let json = serde_json::to_value(FlightConfig::default()).unwrap();
        assert_eq!(json["timeouts"]["offboard"], 8000);
        assert_eq!(json["poll_interval"], 100);
        assert_eq!(json["motion"]["interrupt_poll_count"], 10);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: FlightConfig =
            serde_json::from_str(r#"{"connection_address":"serial:///dev/ttyUSB0:115200","timeouts":{"action":500}}"#)
                .unwrap();
        assert_eq!(cfg.connection_address, "serial:///dev/ttyUSB0:115200");
        assert_eq!(cfg.timeouts.action, Duration::from_millis(500));
        assert_eq!(cfg.timeouts.offboard, Duration::from_secs(8));
        assert_eq!(cfg.retry.max_attempts, 3);
    }

    #[test]
    fn interrupt_latency_is_bounded() {
        assert_eq!(
            MotionConfig::default().interrupt_latency(),
            Duration::from_secs(1)
        );
    }
}
