//! Recorded RR playback
//!
//! Publishes one recorded beat at a time and waits that beat's RR interval of
//! host time before the next, reproducing the recording's cadence. Driven by
//! the host tick, so it never blocks and can be cancelled at any point.

use std::path::Path;

use super::channel::{SignalChannel, SignalSample};
use crate::error::Result;

/// Immutable list of RR intervals (ms)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RrSequence {
    values: Vec<f32>,
}

impl RrSequence {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Parse one RR value per line; unusable lines are skipped
    pub fn parse(text: &str) -> Self {
        let mut skipped = 0usize;
        let values = text
            .lines()
            .filter_map(|line| {
                let parsed = line
                    .trim()
                    .parse::<f32>()
                    .ok()
                    .filter(|rr| rr.is_finite() && *rr > 0.0);
                if parsed.is_none() && !line.trim().is_empty() {
                    skipped += 1;
                }
                parsed
            })
            .collect::<Vec<_>>();
        if skipped > 0 {
            log::debug!("Skipped {} unparseable recording lines", skipped);
        }
        Self { values }
    }

    /// Load a recording file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let sequence = Self::parse(&text);
        log::info!("Loaded {} RR values from {}", sequence.len(), path.display());
        Ok(sequence)
    }

    /// Load a recording, treating a missing or unreadable file as empty
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(sequence) => sequence,
            Err(e) => {
                log::warn!("Recording {} unavailable ({}), replaying nothing", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Total playback time in milliseconds
    pub fn duration_ms(&self) -> f32 {
        self.values.iter().sum()
    }
}

/// Playback lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// Not started
    Idle,
    /// A value is published; waiting out its RR interval
    Waiting,
    /// All values played
    Ended,
    /// Stopped early by the host
    Cancelled,
}

/// What the driver did during a call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayEvent {
    Published(SignalSample),
    /// Terminal; fires exactly once
    SequenceEnded,
}

/// Cooperative, cancellable playback of an `RrSequence`
#[derive(Debug, Clone)]
pub struct ReplayDriver {
    sequence: RrSequence,
    /// Index of the next value to publish
    index: usize,
    /// Seconds left before the next value
    remaining: f32,
    state: ReplayState,
}

impl ReplayDriver {
    pub fn new(sequence: RrSequence) -> Self {
        Self {
            sequence,
            index: 0,
            remaining: 0.0,
            state: ReplayState::Idle,
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ReplayState::Idle | ReplayState::Waiting)
    }

    pub fn is_ended(&self) -> bool {
        self.state == ReplayState::Ended
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == ReplayState::Cancelled
    }

    /// Values published so far
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn sequence(&self) -> &RrSequence {
        &self.sequence
    }

    /// Begin playback: marks the channel live and publishes the first value
    pub fn start(&mut self, channel: &SignalChannel) -> Vec<ReplayEvent> {
        if self.state != ReplayState::Idle {
            return Vec::new();
        }
        channel.set_connected(true);
        self.state = ReplayState::Waiting;
        let mut events = Vec::new();
        self.publish_next(channel, &mut events);
        events
    }

    /// Consume `dt` seconds of host time (scaled; zero while paused)
    pub fn advance(&mut self, dt: f32, channel: &SignalChannel) -> Vec<ReplayEvent> {
        let mut events = Vec::new();
        match self.state {
            ReplayState::Idle => return self.start(channel),
            ReplayState::Waiting => {}
            ReplayState::Ended | ReplayState::Cancelled => return events,
        }

        self.remaining -= dt.max(0.0);
        // Leftover time carries into the next wait so total pacing stays exact
        while self.state == ReplayState::Waiting && self.remaining <= 0.0 {
            self.publish_next(channel, &mut events);
        }
        events
    }

    /// Stop playback; nothing is published afterwards
    pub fn cancel(&mut self) {
        if self.is_active() {
            log::info!("Replay cancelled at {}/{}", self.index, self.sequence.len());
            self.state = ReplayState::Cancelled;
        }
    }

    fn publish_next(&mut self, channel: &SignalChannel, events: &mut Vec<ReplayEvent>) {
        match self.sequence.values.get(self.index).copied() {
            Some(rr) => {
                let sample = SignalSample::from_rr(rr);
                channel.publish(sample);
                self.index += 1;
                self.remaining += rr / 1000.0;
                events.push(ReplayEvent::Published(sample));
            }
            None => {
                self.state = ReplayState::Ended;
                log::info!("Replay finished after {} values", self.index);
                events.push(ReplayEvent::SequenceEnded);
            }
        }
    }
}
