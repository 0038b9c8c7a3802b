//! Run state and the read-only view handed to the UI
//!
//! Everything the per-tick session mutates lives here. Threads and sockets do
//! not; they belong to `crate::session::Session`.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::clock::{HoldReason, HostClock};
use super::generator::TrackGenerator;
use super::placement::Track;
use crate::settings::{InputMode, PacingSettings, Settings};
use crate::signal::{ConnectionState, LivenessMonitor, ReplayDriver, RrSequence, SignalChannel};

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// Waiting for the first sensor sample (clock held)
    Connecting,
    /// Active gameplay
    Running,
    /// Sensor lost after the run started (clock held)
    SensorLost,
    /// Pause menu open
    Paused,
    /// Recording fully replayed
    Complete,
    /// Player fell; run over
    Failed,
}

impl RunPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunPhase::Complete | RunPhase::Failed)
    }
}

/// Notable transitions, reported once each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEvent {
    /// First sensor connection; gameplay begins
    Started,
    SensorLost,
    SensorRestored,
    Paused,
    Resumed,
    /// Replay exhausted (level complete)
    SequenceEnded,
    PlayerFailed,
}

/// The run's single producer and its supervisor
#[derive(Debug, Clone)]
pub enum SignalSource {
    Sensor(LivenessMonitor),
    Replay(ReplayDriver),
}

impl SignalSource {
    pub fn mode(&self) -> InputMode {
        match self {
            SignalSource::Sensor(_) => InputMode::Sensor,
            SignalSource::Replay(_) => InputMode::Replay,
        }
    }
}

/// Complete per-run state
#[derive(Debug, Clone)]
pub struct RunState {
    pub phase: RunPhase,
    pub source: SignalSource,
    pub clock: HostClock,
    pub generator: TrackGenerator,
    pub track: Track,
    pub pacing: PacingSettings,
    /// Viewpoint (camera) x, advanced by scaled time
    pub viewpoint_x: f32,
    /// Set once the replay sequence is exhausted
    pub sequence_ended: bool,
    /// Host ticks processed
    pub time_ticks: u64,
}

impl RunState {
    /// Live-sensor run; the clock is held until the first sample
    pub fn sensor(settings: &Settings, now: Instant) -> Self {
        let monitor = LivenessMonitor::new(&settings.liveness, now);
        let mut state = Self::with_source(settings, SignalSource::Sensor(monitor));
        state.clock.hold(HoldReason::Sensor);
        state.phase = RunPhase::Connecting;
        state
    }

    /// Replay run; starts immediately
    pub fn replay(settings: &Settings, sequence: RrSequence) -> Self {
        Self::with_source(settings, SignalSource::Replay(ReplayDriver::new(sequence)))
    }

    fn with_source(settings: &Settings, source: SignalSource) -> Self {
        Self {
            phase: RunPhase::Running,
            source,
            clock: HostClock::new(),
            generator: TrackGenerator::new(settings.generator.clone()),
            track: Track::new(),
            pacing: settings.pacing.clone(),
            viewpoint_x: settings.generator.origin_x,
            sequence_ended: false,
            time_ticks: 0,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.source.mode()
    }

    /// Whether the generator should run this tick
    pub fn signal_live(&self) -> bool {
        if self.sequence_ended || self.phase.is_finished() {
            return false;
        }
        match &self.source {
            SignalSource::Sensor(monitor) => monitor.is_connected(),
            SignalSource::Replay(driver) => driver.is_active(),
        }
    }

    /// Phase implied by the producer and clock holds
    pub(crate) fn derive_phase(&self) -> RunPhase {
        if self.phase.is_finished() {
            return self.phase;
        }
        if self.clock.is_held(HoldReason::User) {
            return RunPhase::Paused;
        }
        match &self.source {
            SignalSource::Sensor(monitor) => match monitor.state() {
                ConnectionState::AwaitingFirstSample => RunPhase::Connecting,
                ConnectionState::Connected => RunPhase::Running,
                ConnectionState::Disconnected | ConnectionState::ReconnectPending => {
                    if monitor.run_started() {
                        RunPhase::SensorLost
                    } else {
                        RunPhase::Connecting
                    }
                }
            },
            SignalSource::Replay(_) => RunPhase::Running,
        }
    }

    /// Snapshot for HUD/UI collaborators
    pub fn hud(&self, channel: &SignalChannel) -> HudView {
        let snapshot = channel.snapshot();
        let status = match &self.source {
            SignalSource::Sensor(monitor) => monitor.status_text().map(str::to_string),
            SignalSource::Replay(_) => None,
        };
        HudView {
            phase: self.phase,
            heart_rate: snapshot.sample.heart_rate,
            rr_interval: snapshot.sample.rr_interval,
            connected: snapshot.connected,
            sequence_ended: self.sequence_ended,
            status,
            viewpoint_x: self.viewpoint_x,
            time_scale: self.clock.time_scale(),
        }
    }
}

/// Read-only values the UI binds to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudView {
    pub phase: RunPhase,
    pub heart_rate: f32,
    pub rr_interval: f32,
    pub connected: bool,
    pub sequence_ended: bool,
    /// Connection status line, hidden when None
    pub status: Option<String>,
    pub viewpoint_x: f32,
    pub time_scale: f32,
}

impl HudView {
    /// Heart-rate label as shown in game
    pub fn heart_rate_label(&self) -> String {
        format!("HR: {}", self.heart_rate.round() as i32)
    }
}
