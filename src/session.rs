//! One run: settings, signal channel, producer and per-tick state
//!
//! `Session::start` is the only place a caller can see a failure (UDP bind).
//! After that every fault is a state change or a log line.

use std::time::Instant;

use crate::error::Result;
use crate::settings::{InputMode, Settings};
use crate::signal::{DatagramReceiver, ReceiverStats, RrSequence, SignalChannel};
use crate::sim::{HudView, RunState, TickInput, TickReport, tick};

pub struct Session {
    settings: Settings,
    channel: SignalChannel,
    receiver: Option<DatagramReceiver>,
    state: RunState,
}

impl Session {
    /// Validate settings and bring up the selected producer
    pub fn start(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let channel = SignalChannel::new();

        let (receiver, state) = match settings.input_mode {
            InputMode::Sensor => {
                let receiver =
                    DatagramReceiver::spawn(settings.network.socket_addr(), channel.clone())?;
                let state = RunState::sensor(&settings, Instant::now());
                (Some(receiver), state)
            }
            InputMode::Replay => {
                let sequence = RrSequence::load_or_empty(&settings.recording_path());
                log::info!(
                    "Replaying {} ({} beats, {:.1} s)",
                    settings.recording,
                    sequence.len(),
                    sequence.duration_ms() / 1000.0
                );
                (None, RunState::replay(&settings, sequence))
            }
        };

        log::info!("Session started in {} mode", settings.input_mode.as_str());
        Ok(Self {
            settings,
            channel,
            receiver,
            state,
        })
    }

    /// Advance one host tick
    pub fn tick(&mut self, input: &TickInput) -> TickReport {
        let report = tick(&mut self.state, &self.channel, input);
        for event in &report.events {
            log::info!("Run event: {:?}", event);
        }
        report
    }

    pub fn hud(&self) -> HudView {
        self.state.hud(&self.channel)
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Handle for producers outside the session (tests, bridges)
    pub fn channel(&self) -> &SignalChannel {
        &self.channel
    }

    pub fn receiver_stats(&self) -> Option<&ReceiverStats> {
        self.receiver.as_ref().map(|r| r.stats())
    }

    pub fn receiver_addr(&self) -> Option<std::net::SocketAddr> {
        self.receiver.as_ref().map(|r| r.local_addr())
    }

    /// Stop the receiver thread (also happens on drop)
    pub fn shutdown(&mut self) {
        if let Some(mut receiver) = self.receiver.take() {
            receiver.shutdown();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::sim::{RunEvent, RunPhase};
    use std::net::{Ipv4Addr, UdpSocket};
    use std::time::Duration;

    fn sensor_settings(port: u16) -> Settings {
        let mut settings = Settings::default();
        settings.network.bind_addr = Ipv4Addr::LOCALHOST.into();
        settings.network.port = port;
        settings
    }

    #[test]
    fn test_bind_failure_aborts_start() {
        let holder = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = holder.local_addr().unwrap().port();

        assert!(matches!(
            Session::start(sensor_settings(port)),
            Err(Error::Bind { .. })
        ));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = sensor_settings(0);
        settings.generator.min_platform_width = -1.0;
        assert!(matches!(Session::start(settings), Err(Error::InvalidSettings(_))));
    }

    #[test]
    fn test_live_datagrams_start_the_run() {
        let mut session = Session::start(sensor_settings(0)).unwrap();
        let addr = session.receiver_addr().unwrap();
        assert_eq!(session.state().phase, RunPhase::Connecting);

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"75,800", addr).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut started = false;
        while !started && Instant::now() < deadline {
            let report = session.tick(&TickInput::at(Instant::now(), 1.0 / 60.0));
            started = report.events.contains(&RunEvent::Started);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(started);
        assert_eq!(session.state().phase, RunPhase::Running);

        let hud = session.hud();
        assert_eq!(hud.heart_rate, 75.0);
        assert_eq!(hud.heart_rate_label(), "HR: 75");
        assert!(hud.connected);

        session.shutdown();
        assert!(session.receiver_addr().is_none());
    }

    #[test]
    fn test_replay_from_recordings_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("002.txt"), "600\n600\n").unwrap();

        let mut settings = Settings::default();
        settings.input_mode = InputMode::Replay;
        settings.recordings_dir = dir.path().to_path_buf();
        settings.recording = "002.txt".to_string();

        let mut session = Session::start(settings).unwrap();
        assert!(session.receiver_stats().is_none());

        let now = Instant::now();
        let mut ticks = 0;
        while !session.state().phase.is_finished() {
            session.tick(&TickInput::at(now, 0.1));
            ticks += 1;
            assert!(ticks < 100);
        }
        assert_eq!(session.state().phase, RunPhase::Complete);
        assert_eq!(session.hud().heart_rate, 100.0);
    }

    #[test]
    fn test_missing_recording_completes_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.input_mode = InputMode::Replay;
        settings.recordings_dir = dir.path().to_path_buf();
        settings.recording = "missing.txt".to_string();

        let mut session = Session::start(settings).unwrap();
        let report = session.tick(&TickInput::at(Instant::now(), 1.0 / 60.0));
        assert_eq!(report.events, vec![RunEvent::SequenceEnded]);
        assert!(session.hud().sequence_ended);
    }
}
