//! Per-tick run update
//!
//! Order within a tick: input (fail, pause), producer supervision (liveness
//! or replay pacing), time scaling, viewpoint advance, generation, release.

use std::time::Instant;

use super::clock::{HoldReason, hr_time_scale};
use super::placement::PlacementRecord;
use super::state::{RunEvent, RunState, SignalSource};
use crate::signal::{LivenessEvent, ReplayEvent, SignalChannel};

/// Host input for a single tick
#[derive(Debug, Clone)]
pub struct TickInput {
    /// Real seconds since the previous tick
    pub dt: f32,
    /// Wall clock for liveness checks
    pub now: Instant,
    /// Pause toggle
    pub pause: bool,
    /// Player fell off the track
    pub player_failed: bool,
}

impl TickInput {
    pub fn at(now: Instant, dt: f32) -> Self {
        Self {
            dt,
            now,
            pause: false,
            player_failed: false,
        }
    }
}

/// What happened during a tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// New placements for the renderer, in emission order
    pub emitted: Vec<PlacementRecord>,
    /// Placements that scrolled out and should be disposed
    pub released: Vec<PlacementRecord>,
    pub events: Vec<RunEvent>,
}

/// Advance the run by one host tick
pub fn tick(state: &mut RunState, channel: &SignalChannel, input: &TickInput) -> TickReport {
    let mut report = TickReport::default();
    if state.phase.is_finished() {
        return report;
    }
    state.time_ticks += 1;

    if input.player_failed {
        if let SignalSource::Replay(driver) = &mut state.source {
            driver.cancel();
        }
        state.phase = super::state::RunPhase::Failed;
        report.events.push(RunEvent::PlayerFailed);
        log::info!("Run failed at x={:.1}", state.viewpoint_x);
        return report;
    }

    if input.pause {
        if state.clock.is_held(HoldReason::User) {
            state.clock.release(HoldReason::User);
            report.events.push(RunEvent::Resumed);
        } else {
            state.clock.hold(HoldReason::User);
            report.events.push(RunEvent::Paused);
        }
    }

    // Sensor supervision runs on wall-clock time, before the clock advances
    if let SignalSource::Sensor(monitor) = &mut state.source {
        let snapshot = channel.snapshot();
        if let Some(event) = monitor.update(input.now, snapshot.received_at) {
            match event {
                LivenessEvent::Started => {
                    state.clock.release(HoldReason::Sensor);
                    channel.set_connected(true);
                    report.events.push(RunEvent::Started);
                }
                LivenessEvent::Disconnected => {
                    state.clock.hold(HoldReason::Sensor);
                    channel.set_connected(false);
                    report.events.push(RunEvent::SensorLost);
                }
                LivenessEvent::Reconnected => {
                    state.clock.release(HoldReason::Sensor);
                    channel.set_connected(true);
                    report.events.push(RunEvent::SensorRestored);
                }
            }
        }
    }

    let dt = state.clock.advance(input.dt);

    // Replay pacing runs on scaled time, so pausing also pauses the recording
    if let SignalSource::Replay(driver) = &mut state.source {
        for event in driver.advance(dt, channel) {
            if event == ReplayEvent::SequenceEnded {
                state.sequence_ended = true;
                report.events.push(RunEvent::SequenceEnded);
            }
        }
    }

    // Heart-rate time scaling (live sensor only)
    if let SignalSource::Sensor(monitor) = &state.source {
        let hr = channel.sample().heart_rate;
        if monitor.is_connected() && !state.clock.is_paused() && hr > 0.0 {
            let scale = hr_time_scale(hr, &state.pacing, state.generator.tuning());
            state.clock.set_time_scale(scale);
        }
    }

    state.viewpoint_x += state.pacing.camera_speed * dt;

    if state.signal_live() {
        let sample = channel.sample();
        state
            .generator
            .step(state.viewpoint_x, sample, &mut report.emitted);
        state.track.extend(&report.emitted);
    }

    report.released = state
        .track
        .release_behind(state.viewpoint_x, state.pacing.release_distance);

    if state.sequence_ended {
        state.phase = super::state::RunPhase::Complete;
    } else {
        state.phase = state.derive_phase();
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::signal::{RrSequence, SignalSample};
    use crate::sim::state::RunPhase;
    use std::time::Duration;

    const DT: f32 = 1.0 / 60.0;

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn test_sensor_run_waits_for_first_sample() {
        let settings = Settings::default();
        let t0 = Instant::now();
        let channel = SignalChannel::new();
        let mut state = RunState::sensor(&settings, t0);

        let report = tick(&mut state, &channel, &TickInput::at(t0 + secs(0.5), DT));
        assert_eq!(state.phase, RunPhase::Connecting);
        assert!(report.emitted.is_empty());
        assert_eq!(state.hud(&channel).status.as_deref(), Some("Connecting to sensor..."));

        channel.publish_at(SignalSample::new(72.0, 830.0), t0 + secs(1.0));
        let report = tick(&mut state, &channel, &TickInput::at(t0 + secs(1.1), DT));
        assert_eq!(report.events, vec![RunEvent::Started]);
        assert_eq!(state.phase, RunPhase::Running);
        assert!(channel.is_connected());
        // First placement plus enough to cover the lookahead
        assert!(report.emitted.len() >= 2);
        assert_eq!(state.hud(&channel).status, None);
    }

    #[test]
    fn test_sensor_loss_holds_clock_and_recovers() {
        let settings = Settings::default();
        let t0 = Instant::now();
        let channel = SignalChannel::new();
        let mut state = RunState::sensor(&settings, t0);

        channel.publish_at(SignalSample::new(80.0, 750.0), t0);
        tick(&mut state, &channel, &TickInput::at(t0, DT));
        tick(&mut state, &channel, &TickInput::at(t0 + secs(1.0), 1.0));
        let x_running = state.viewpoint_x;
        assert!(x_running > 0.0);

        let lost = t0 + secs(5.5);
        let report = tick(&mut state, &channel, &TickInput::at(lost, DT));
        assert_eq!(report.events, vec![RunEvent::SensorLost]);
        assert_eq!(state.phase, RunPhase::SensorLost);
        assert!(!channel.is_connected());

        // Clock held: the viewpoint does not move and nothing is generated
        let report = tick(&mut state, &channel, &TickInput::at(lost + secs(1.0), 1.0));
        assert!(report.emitted.is_empty());
        assert_eq!(state.viewpoint_x, x_running);

        channel.publish_at(SignalSample::new(82.0, 730.0), lost + secs(2.0));
        let report = tick(&mut state, &channel, &TickInput::at(lost + secs(3.0), DT));
        assert_eq!(report.events, vec![RunEvent::SensorRestored]);
        assert_eq!(state.phase, RunPhase::Running);
        assert!(channel.is_connected());
        assert!(state.viewpoint_x > x_running);
    }

    #[test]
    fn test_hr_scales_time_in_sensor_mode() {
        let settings = Settings::default();
        let t0 = Instant::now();
        let channel = SignalChannel::new();
        let mut state = RunState::sensor(&settings, t0);

        channel.publish_at(SignalSample::new(120.0, 500.0), t0);
        tick(&mut state, &channel, &TickInput::at(t0, DT));
        assert_eq!(state.clock.time_scale(), 1.5);

        let x = state.viewpoint_x;
        tick(&mut state, &channel, &TickInput::at(t0 + secs(0.1), 1.0));
        assert!((state.viewpoint_x - x - 4.5).abs() < 1e-4);
    }

    #[test]
    fn test_replay_runs_to_completion() {
        let settings = Settings::default();
        let channel = SignalChannel::new();
        let mut state = RunState::replay(&settings, RrSequence::new(vec![800.0, 750.0, 900.0]));
        let t0 = Instant::now();

        let mut ended = 0;
        let mut emitted = 0;
        let mut ticks = 0;
        while !state.phase.is_finished() {
            let report = tick(&mut state, &channel, &TickInput::at(t0, DT));
            ended += report
                .events
                .iter()
                .filter(|e| **e == RunEvent::SequenceEnded)
                .count();
            emitted += report.emitted.len();
            ticks += 1;
            assert!(ticks < 1_000);
        }

        assert_eq!(state.phase, RunPhase::Complete);
        assert_eq!(ended, 1);
        assert!(emitted > 1);
        // Replay never scales time
        assert_eq!(state.clock.time_scale(), 1.0);
        // ~2.45 s at 60 Hz
        assert!((145..=150).contains(&ticks), "ticks {ticks}");

        let hud = state.hud(&channel);
        assert!(hud.sequence_ended);
        assert!(tick(&mut state, &channel, &TickInput::at(t0, DT)).emitted.is_empty());
    }

    #[test]
    fn test_player_failure_cancels_replay() {
        let settings = Settings::default();
        let channel = SignalChannel::new();
        let mut state = RunState::replay(&settings, RrSequence::new(vec![500.0; 10]));
        let t0 = Instant::now();

        tick(&mut state, &channel, &TickInput::at(t0, DT));
        let published = channel.snapshot().sequence;

        let failed = TickInput {
            player_failed: true,
            ..TickInput::at(t0, DT)
        };
        let report = tick(&mut state, &channel, &failed);
        assert_eq!(report.events, vec![RunEvent::PlayerFailed]);
        assert_eq!(state.phase, RunPhase::Failed);

        for _ in 0..120 {
            tick(&mut state, &channel, &TickInput::at(t0, 0.1));
        }
        assert_eq!(channel.snapshot().sequence, published);
        match &state.source {
            SignalSource::Replay(driver) => assert!(driver.is_cancelled()),
            SignalSource::Sensor(_) => unreachable!(),
        }
    }

    #[test]
    fn test_pause_toggle() {
        let settings = Settings::default();
        let channel = SignalChannel::new();
        let mut state = RunState::replay(&settings, RrSequence::new(vec![1000.0; 5]));
        let t0 = Instant::now();
        tick(&mut state, &channel, &TickInput::at(t0, DT));

        let pause = TickInput {
            pause: true,
            ..TickInput::at(t0, DT)
        };
        let report = tick(&mut state, &channel, &pause);
        assert_eq!(report.events, vec![RunEvent::Paused]);
        assert_eq!(state.phase, RunPhase::Paused);

        let x = state.viewpoint_x;
        let position = channel.snapshot().sequence;
        for _ in 0..200 {
            tick(&mut state, &channel, &TickInput::at(t0, DT));
        }
        assert_eq!(state.viewpoint_x, x);
        assert_eq!(channel.snapshot().sequence, position);

        let report = tick(&mut state, &channel, &pause);
        assert_eq!(report.events, vec![RunEvent::Resumed]);
        assert_eq!(state.phase, RunPhase::Running);
    }

    #[test]
    fn test_old_placements_released() {
        let mut settings = Settings::default();
        settings.pacing.release_distance = 5.0;
        let channel = SignalChannel::new();
        let mut state = RunState::replay(&settings, RrSequence::new(vec![700.0; 200]));
        let t0 = Instant::now();

        let mut released = 0;
        for _ in 0..600 {
            released += tick(&mut state, &channel, &TickInput::at(t0, DT)).released.len();
        }
        assert!(released > 0);
        let cutoff = state.viewpoint_x - 5.0;
        assert!(state.track.iter().all(|p| p.right_edge() >= cutoff));
        assert_eq!(
            state.track.total_emitted(),
            state.track.total_released() + state.track.len() as u64
        );
    }
}
