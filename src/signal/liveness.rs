//! Sensor liveness state machine
//!
//! Polled once per host tick. Uses wall-clock `Instant`s, never the host's
//! scaled clock, so a paused run keeps detecting silence and recovery.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::settings::LivenessSettings;

/// Connection state as seen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Monitor started, no sample yet
    AwaitingFirstSample,
    /// Samples arriving within the disconnect threshold
    Connected,
    /// Silent longer than the threshold; probing
    Disconnected,
    /// Samples resumed, waiting for the next probe to confirm
    ReconnectPending,
}

/// Transition side effects for the host to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvent {
    /// First confirmed connection of the run (fires once)
    Started,
    /// Sensor went silent
    Disconnected,
    /// Probe confirmed samples are flowing again
    Reconnected,
}

/// Time-driven connection tracker
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    disconnect_after: Duration,
    probe_interval: Duration,
    recency_window: Duration,
    state: ConnectionState,
    started_at: Instant,
    /// True once `Started` has been emitted
    run_started: bool,
    /// Armed while disconnected
    next_probe_at: Option<Instant>,
}

impl LivenessMonitor {
    pub fn new(settings: &LivenessSettings, now: Instant) -> Self {
        Self {
            disconnect_after: settings.disconnect_after(),
            probe_interval: settings.probe_interval(),
            recency_window: settings.recency_window(),
            state: ConnectionState::AwaitingFirstSample,
            started_at: now,
            run_started: false,
            next_probe_at: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// True once the first connection has been confirmed
    pub fn run_started(&self) -> bool {
        self.run_started
    }

    /// Whether the reconnect probe is armed
    pub fn probe_armed(&self) -> bool {
        self.next_probe_at.is_some()
    }

    /// Status line for the UI, if any
    pub fn status_text(&self) -> Option<&'static str> {
        match self.state {
            ConnectionState::AwaitingFirstSample => Some("Connecting to sensor..."),
            ConnectionState::Connected => None,
            ConnectionState::Disconnected if !self.run_started => Some("No sensor detected."),
            ConnectionState::Disconnected => Some("Sensor disconnected."),
            ConnectionState::ReconnectPending => Some("Sensor found, reconnecting..."),
        }
    }

    /// Advance the machine.
    ///
    /// `last_sample_at` is the arrival time of the newest sample, if any.
    pub fn update(
        &mut self,
        now: Instant,
        last_sample_at: Option<Instant>,
    ) -> Option<LivenessEvent> {
        // Samples stamped before the monitor started count from the start
        let reference = last_sample_at.map_or(self.started_at, |t| t.max(self.started_at));
        let since = now.saturating_duration_since(reference);
        let has_sample = last_sample_at.is_some();

        match self.state {
            ConnectionState::AwaitingFirstSample | ConnectionState::Connected => {
                if since > self.disconnect_after {
                    self.disconnect(now);
                    return Some(LivenessEvent::Disconnected);
                }
                if self.state == ConnectionState::AwaitingFirstSample && has_sample {
                    self.state = ConnectionState::Connected;
                    self.run_started = true;
                    log::info!("Sensor connected");
                    return Some(LivenessEvent::Started);
                }
                None
            }
            ConnectionState::Disconnected | ConnectionState::ReconnectPending => {
                let recent = has_sample && since <= self.recency_window;
                self.state = if recent {
                    ConnectionState::ReconnectPending
                } else {
                    ConnectionState::Disconnected
                };

                let due = self.next_probe_at.is_some_and(|at| now >= at);
                if !due {
                    return None;
                }
                if recent {
                    return Some(self.reconnect());
                }
                // Keep the probe on its fixed cadence
                let mut next = self.next_probe_at.unwrap_or(now) + self.probe_interval;
                while next <= now {
                    next += self.probe_interval;
                }
                self.next_probe_at = Some(next);
                log::debug!("Reconnect probe: no recent samples");
                None
            }
        }
    }

    fn disconnect(&mut self, now: Instant) {
        if self.run_started {
            log::warn!("Sensor disconnected");
        } else {
            log::warn!("No sensor detected after {:?}", self.disconnect_after);
        }
        self.state = ConnectionState::Disconnected;
        self.next_probe_at = Some(now + self.probe_interval);
    }

    fn reconnect(&mut self) -> LivenessEvent {
        self.state = ConnectionState::Connected;
        self.next_probe_at = None;
        if self.run_started {
            log::info!("Sensor reconnected");
            LivenessEvent::Reconnected
        } else {
            self.run_started = true;
            log::info!("Sensor connected");
            LivenessEvent::Started
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    fn monitor(t0: Instant) -> LivenessMonitor {
        LivenessMonitor::new(&LivenessSettings::default(), t0)
    }

    #[test]
    fn test_first_sample_starts_once() {
        let t0 = Instant::now();
        let mut m = monitor(t0);
        assert_eq!(m.state(), ConnectionState::AwaitingFirstSample);
        assert_eq!(m.update(t0 + secs(1.0), None), None);

        let sample_at = t0 + secs(1.5);
        assert_eq!(m.update(t0 + secs(1.6), Some(sample_at)), Some(LivenessEvent::Started));
        assert!(m.is_connected());
        assert_eq!(m.status_text(), None);

        // Further samples do not re-fire Started
        assert_eq!(m.update(t0 + secs(2.0), Some(t0 + secs(1.9))), None);
    }

    #[test]
    fn test_silence_disconnects() {
        let t0 = Instant::now();
        let mut m = monitor(t0);
        let sample_at = t0 + secs(0.5);
        m.update(t0 + secs(0.6), Some(sample_at));

        // Exactly at the threshold is still connected
        assert_eq!(m.update(sample_at + secs(5.0), Some(sample_at)), None);
        assert_eq!(
            m.update(sample_at + secs(5.1), Some(sample_at)),
            Some(LivenessEvent::Disconnected)
        );
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert_eq!(m.status_text(), Some("Sensor disconnected."));
        assert!(m.probe_armed());
    }

    #[test]
    fn test_probe_confirms_reconnect() {
        let t0 = Instant::now();
        let mut m = monitor(t0);
        m.update(t0, Some(t0));
        let lost_at = t0 + secs(5.5);
        assert_eq!(m.update(lost_at, Some(t0)), Some(LivenessEvent::Disconnected));

        // Data resumes, but nothing changes until the probe fires
        let resumed = lost_at + secs(1.0);
        assert_eq!(m.update(resumed, Some(resumed)), None);
        assert_eq!(m.state(), ConnectionState::ReconnectPending);

        let probe = lost_at + secs(3.0);
        assert_eq!(
            m.update(probe, Some(probe - secs(0.5))),
            Some(LivenessEvent::Reconnected)
        );
        assert!(m.is_connected());
        assert!(!m.probe_armed());
    }

    #[test]
    fn test_probe_rejects_stale_sample() {
        let t0 = Instant::now();
        let mut m = monitor(t0);
        m.update(t0, Some(t0));
        let lost_at = t0 + secs(6.0);
        m.update(lost_at, Some(t0));

        // One sample right after disconnect, then silence again
        let blip = lost_at + secs(0.1);
        let probe = lost_at + secs(3.0);
        assert_eq!(m.update(probe, Some(blip)), None);
        assert_eq!(m.state(), ConnectionState::Disconnected);

        // Next probe on the 3 s cadence succeeds with fresh data
        let probe2 = lost_at + secs(6.0);
        assert_eq!(m.update(probe2, Some(probe2)), Some(LivenessEvent::Reconnected));
    }

    #[test]
    fn test_never_connected_times_out_then_starts() {
        let t0 = Instant::now();
        let mut m = monitor(t0);
        assert_eq!(m.update(t0 + secs(5.5), None), Some(LivenessEvent::Disconnected));
        assert_eq!(m.status_text(), Some("No sensor detected."));
        assert!(!m.run_started());

        // Probe armed one interval after the timeout (t0 + 8.5)
        let first = t0 + secs(7.0);
        assert_eq!(m.update(first, Some(first)), None);
        assert_eq!(m.state(), ConnectionState::ReconnectPending);
        assert_eq!(m.status_text(), Some("Sensor found, reconnecting..."));

        let probe = t0 + secs(5.5) + secs(3.0);
        assert_eq!(m.update(probe, Some(first)), Some(LivenessEvent::Started));
        assert!(m.run_started());
        assert!(m.is_connected());
    }

    #[test]
    fn test_sample_before_start_counts_from_start() {
        let t0 = Instant::now();
        let early = t0;
        let mut m = monitor(t0 + secs(10.0));
        assert_eq!(m.update(t0 + secs(11.0), Some(early)), Some(LivenessEvent::Started));
    }
}
