//! Host clock with time scaling and pause holds
//!
//! Scaled time drives the viewpoint and replay pacing. Liveness never reads
//! it (it uses wall-clock instants).

use serde::{Deserialize, Serialize};

use crate::settings::{GeneratorSettings, PacingSettings};
use crate::{inverse_lerp, lerp};

/// Why the clock is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldReason {
    /// Waiting for, or lost, the sensor
    Sensor,
    /// Pause menu
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostClock {
    time_scale: f32,
    sensor_hold: bool,
    user_hold: bool,
    /// Scaled seconds elapsed
    elapsed: f64,
}

impl Default for HostClock {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            sensor_hold: false,
            user_hold: false,
            elapsed: 0.0,
        }
    }
}

impl HostClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn hold(&mut self, reason: HoldReason) {
        match reason {
            HoldReason::Sensor => self.sensor_hold = true,
            HoldReason::User => self.user_hold = true,
        }
    }

    pub fn release(&mut self, reason: HoldReason) {
        match reason {
            HoldReason::Sensor => self.sensor_hold = false,
            HoldReason::User => self.user_hold = false,
        }
    }

    pub fn is_held(&self, reason: HoldReason) -> bool {
        match reason {
            HoldReason::Sensor => self.sensor_hold,
            HoldReason::User => self.user_hold,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.sensor_hold || self.user_hold
    }

    /// Scaled seconds since the run began
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advance by `dt` real seconds; returns the scaled delta (0 while held)
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.is_paused() {
            return 0.0;
        }
        let scaled = dt.max(0.0) * self.time_scale;
        self.elapsed += scaled as f64;
        scaled
    }
}

/// Game speed for a heart rate: faster as HR rises through the normalization range
pub fn hr_time_scale(hr: f32, pacing: &PacingSettings, tuning: &GeneratorSettings) -> f32 {
    let t = inverse_lerp(tuning.hr_range.0, tuning.hr_range.1, hr);
    lerp(pacing.min_time_scale, pacing.max_time_scale, t)
}
