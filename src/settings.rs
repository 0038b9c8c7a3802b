//! Run settings and tuning
//!
//! Persisted as a JSON file. Missing fields fall back to the reference values
//! in `crate::consts`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Error, Result};

/// Where the signal comes from for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InputMode {
    /// Live sensor bridge over UDP
    #[default]
    Sensor,
    /// Pre-recorded RR sequence
    Replay,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Sensor => "Sensor",
            InputMode::Replay => "Replay",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sensor" | "live" => Some(InputMode::Sensor),
            "replay" | "simulated" => Some(InputMode::Replay),
            _ => None,
        }
    }
}

/// UDP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub bind_addr: IpAddr,
    pub port: u16,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

impl NetworkSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Upper bound for any liveness threshold (one day)
pub const MAX_LIVENESS_SECS: f32 = 86_400.0;

/// Liveness thresholds (seconds, wall clock)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessSettings {
    pub disconnect_after_secs: f32,
    pub probe_interval_secs: f32,
    pub recency_window_secs: f32,
}

impl Default for LivenessSettings {
    fn default() -> Self {
        Self {
            disconnect_after_secs: DISCONNECT_AFTER_SECS,
            probe_interval_secs: PROBE_INTERVAL_SECS,
            recency_window_secs: RECENCY_WINDOW_SECS,
        }
    }
}

impl LivenessSettings {
    pub fn disconnect_after(&self) -> Duration {
        Duration::from_secs_f32(self.disconnect_after_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs_f32(self.probe_interval_secs)
    }

    pub fn recency_window(&self) -> Duration {
        Duration::from_secs_f32(self.recency_window_secs)
    }
}

/// Track generator tuning (world units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// X of the first placement's center
    pub origin_x: f32,
    /// Placement thickness handed to the renderer
    pub platform_height: f32,
    pub first_platform_width: f32,
    pub first_platform_y: f32,
    pub min_platform_width: f32,
    pub max_platform_width: f32,
    pub min_gap: f32,
    pub max_gap: f32,
    /// Largest vertical step between consecutive placements
    pub max_height_difference: f32,
    pub lowest_platform_y: f32,
    pub highest_platform_y: f32,
    /// Distance ahead of the viewpoint that must always be generated
    pub lookahead: f32,
    pub hr_range: (f32, f32),
    pub rr_range: (f32, f32),
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            platform_height: 0.5,
            first_platform_width: 1.0,
            first_platform_y: -0.7,
            min_platform_width: 0.5,
            max_platform_width: 1.5,
            min_gap: 2.0,
            max_gap: 5.0,
            max_height_difference: 3.5,
            lowest_platform_y: -3.0,
            highest_platform_y: 1.0,
            lookahead: 3.0,
            hr_range: (HR_RANGE_MIN, HR_RANGE_MAX),
            rr_range: (RR_RANGE_MIN, RR_RANGE_MAX),
        }
    }
}

/// Host pacing: camera speed and heart-rate time scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    /// Viewpoint speed (units per scaled second)
    pub camera_speed: f32,
    /// Time scale at or below the bottom of the HR range
    pub min_time_scale: f32,
    /// Time scale at or above the top of the HR range
    pub max_time_scale: f32,
    /// Placements whose right edge falls this far behind the viewpoint are released
    pub release_distance: f32,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            camera_speed: 3.0,
            min_time_scale: 1.0,
            max_time_scale: 1.5,
            release_distance: 12.0,
        }
    }
}

/// Complete settings for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Live sensor or recorded replay (fixed for the run)
    pub input_mode: InputMode,
    /// Recording file name, resolved against `recordings_dir`
    pub recording: String,
    pub recordings_dir: PathBuf,

    pub network: NetworkSettings,
    pub liveness: LivenessSettings,
    pub generator: GeneratorSettings,
    pub pacing: PacingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_mode: InputMode::Sensor,
            recording: "003.txt".to_string(),
            recordings_dir: PathBuf::from("recordings"),
            network: NetworkSettings::default(),
            liveness: LivenessSettings::default(),
            generator: GeneratorSettings::default(),
            pacing: PacingSettings::default(),
        }
    }
}

impl Settings {
    /// Full path of the selected recording
    pub fn recording_path(&self) -> PathBuf {
        self.recordings_dir.join(&self.recording)
    }

    /// Check the invariants the generator and monitor rely on
    pub fn validate(&self) -> Result<()> {
        let g = &self.generator;
        for (name, value) in [
            ("origin_x", g.origin_x),
            ("platform_height", g.platform_height),
            ("first_platform_width", g.first_platform_width),
            ("first_platform_y", g.first_platform_y),
            ("min_platform_width", g.min_platform_width),
            ("max_platform_width", g.max_platform_width),
            ("min_gap", g.min_gap),
            ("max_gap", g.max_gap),
            ("max_height_difference", g.max_height_difference),
            ("lowest_platform_y", g.lowest_platform_y),
            ("highest_platform_y", g.highest_platform_y),
            ("lookahead", g.lookahead),
            ("hr_range.0", g.hr_range.0),
            ("hr_range.1", g.hr_range.1),
            ("rr_range.0", g.rr_range.0),
            ("rr_range.1", g.rr_range.1),
        ] {
            if !value.is_finite() {
                return Err(invalid(&format!("generator.{name} must be finite")));
            }
        }
        if g.min_platform_width <= 0.0 {
            return Err(invalid("min_platform_width must be > 0"));
        }
        if g.max_platform_width < g.min_platform_width {
            return Err(invalid("max_platform_width must be >= min_platform_width"));
        }
        if g.min_gap < 0.0 || g.max_gap < g.min_gap {
            return Err(invalid("gaps must satisfy 0 <= min_gap <= max_gap"));
        }
        // Guarantees frontier progress on every generation step
        if g.min_gap + g.min_platform_width <= 0.0 {
            return Err(invalid("min_gap + min_platform_width must be > 0"));
        }
        if g.first_platform_width <= 0.0 {
            return Err(invalid("first_platform_width must be > 0"));
        }
        if g.lowest_platform_y > g.highest_platform_y {
            return Err(invalid("lowest_platform_y must be <= highest_platform_y"));
        }
        if g.max_height_difference < 0.0 {
            return Err(invalid("max_height_difference must be >= 0"));
        }
        if g.lookahead < 0.0 {
            return Err(invalid("lookahead must be >= 0"));
        }
        if g.hr_range.0 >= g.hr_range.1 {
            return Err(invalid("hr_range must be (low, high) with low < high"));
        }
        if g.rr_range.0 >= g.rr_range.1 {
            return Err(invalid("rr_range must be (low, high) with low < high"));
        }

        let l = &self.liveness;
        for (name, value) in [
            ("disconnect_after_secs", l.disconnect_after_secs),
            ("probe_interval_secs", l.probe_interval_secs),
            ("recency_window_secs", l.recency_window_secs),
        ] {
            if !(value > 0.0 && value <= MAX_LIVENESS_SECS) {
                return Err(invalid(&format!(
                    "{name} must be in (0, {MAX_LIVENESS_SECS}] seconds"
                )));
            }
            Duration::try_from_secs_f32(value)
                .map_err(|e| invalid(&format!("{name}: {e}")))?;
        }

        let p = &self.pacing;
        for (name, value) in [
            ("camera_speed", p.camera_speed),
            ("min_time_scale", p.min_time_scale),
            ("max_time_scale", p.max_time_scale),
            ("release_distance", p.release_distance),
        ] {
            if !value.is_finite() {
                return Err(invalid(&format!("pacing.{name} must be finite")));
            }
        }
        if p.min_time_scale < 0.0 || p.max_time_scale < p.min_time_scale {
            return Err(invalid("time scales must satisfy 0 <= min <= max"));
        }
        if p.camera_speed < 0.0 {
            return Err(invalid("camera_speed must be >= 0"));
        }

        Ok(())
    }

    /// Load settings from a JSON file (strict)
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any problem
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

fn invalid(msg: &str) -> Error {
    Error::InvalidSettings(msg.to_string())
}
