//! Pulse Run - a heart-rate driven platform runner
//!
//! Core modules:
//! - `signal`: Sensor ingest (UDP receiver, liveness monitor, replay driver, synthetic sender)
//! - `sim`: Deterministic track generation and the per-tick run update
//! - `session`: One run wired together (channel, producer, state)
//! - `settings`: Data-driven tuning, persisted as JSON
//! - `error`: Crate error type

pub mod error;
pub mod session;
pub mod settings;
pub mod signal;
pub mod sim;

pub use error::{Error, Result};
pub use session::Session;
pub use settings::{InputMode, Settings};

/// Reference constants (defaults for `Settings`)
pub mod consts {
    /// UDP port the sensor bridge sends to
    pub const DEFAULT_PORT: u16 = 5055;

    /// Seconds without a sample before the sensor counts as lost
    pub const DISCONNECT_AFTER_SECS: f32 = 5.0;
    /// Seconds between reconnect probes while disconnected
    pub const PROBE_INTERVAL_SECS: f32 = 3.0;
    /// A probe succeeds if the last sample is at most this old
    pub const RECENCY_WINDOW_SECS: f32 = 2.0;

    /// Heart rate normalization range (bpm)
    pub const HR_RANGE_MIN: f32 = 50.0;
    pub const HR_RANGE_MAX: f32 = 120.0;
    /// RR interval normalization range (ms)
    pub const RR_RANGE_MIN: f32 = 600.0;
    pub const RR_RANGE_MAX: f32 = 1000.0;

    /// Zone breakpoints (bpm): below LOW is Low, below MID is Mid, else High
    pub const ZONE_LOW_BELOW: f32 = 70.0;
    pub const ZONE_MID_BELOW: f32 = 100.0;

    /// Milliseconds per minute, for RR <-> HR conversion
    pub const MS_PER_MINUTE: f32 = 60_000.0;

    /// Fixed host tick for the headless runner (60 Hz)
    pub const HOST_DT: f32 = 1.0 / 60.0;
}

/// Fraction of `value` between `a` and `b`, clamped to [0, 1].
///
/// Returns 0 when the range is empty.
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// Linear interpolation with `t` clamped to [0, 1] (never extrapolates)
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    a + (b - a) * t
}

/// Convert an RR interval (ms) to the equivalent heart rate (bpm)
#[inline]
pub fn rr_to_hr(rr_ms: f32) -> f32 {
    consts::MS_PER_MINUTE / rr_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_lerp_clamps() {
        assert_eq!(inverse_lerp(50.0, 120.0, 30.0), 0.0);
        assert_eq!(inverse_lerp(50.0, 120.0, 200.0), 1.0);
        assert!((inverse_lerp(50.0, 120.0, 85.0) - 0.5).abs() < 1e-6);
        assert_eq!(inverse_lerp(3.0, 3.0, 10.0), 0.0);
    }

    #[test]
    fn test_lerp_does_not_extrapolate() {
        assert_eq!(lerp(1.5, 0.5, 0.0), 1.5);
        assert_eq!(lerp(1.5, 0.5, 1.0), 0.5);
        assert_eq!(lerp(1.5, 0.5, 2.0), 0.5);
        assert_eq!(lerp(1.5, 0.5, -1.0), 1.5);
    }

    #[test]
    fn test_rr_to_hr() {
        assert_eq!(rr_to_hr(800.0), 75.0);
        assert_eq!(rr_to_hr(750.0), 80.0);
        assert!((rr_to_hr(900.0) - 66.666_67).abs() < 1e-3);
    }
}
