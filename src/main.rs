//! Pulse Run entry point
//!
//! Headless host: runs a session at a fixed tick rate and logs what a
//! renderer would draw. Also ships a sensor bridge stand-in for testing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use pulse_run::consts::{DEFAULT_PORT, HOST_DT};
use pulse_run::signal::{DatagramSender, RrSequence, SampleSource, SyntheticHeart};
use pulse_run::sim::TickInput;
use pulse_run::{InputMode, Session, Settings};

#[derive(Parser)]
#[command(name = "pulse-run", version, about = "Heart-rate driven platform runner")]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true, default_value = "pulse-run.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a headless session
    Run {
        /// Replay this recording instead of listening for the sensor
        #[arg(long)]
        replay: Option<String>,
        /// Directory holding recordings
        #[arg(long)]
        recordings: Option<PathBuf>,
        /// UDP port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Stop after this many seconds
        #[arg(long, value_parser = parse_secs)]
        duration: Option<Duration>,
    },
    /// Send heart-rate datagrams like the sensor bridge
    Send {
        /// Destination address
        #[arg(long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))]
        target: SocketAddr,
        /// Seed for the synthetic heart
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Stream this recording instead of the synthetic heart
        #[arg(long)]
        recording: Option<PathBuf>,
        /// Stop after this many samples
        #[arg(long)]
        count: Option<usize>,
    },
    /// Print the effective settings as JSON
    Config,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            replay,
            recordings,
            port,
            duration,
        } => {
            let mut settings = Settings::load_or_default(&cli.config);
            if let Some(name) = replay {
                settings.input_mode = InputMode::Replay;
                settings.recording = name;
            }
            if let Some(dir) = recordings {
                settings.recordings_dir = dir;
            }
            if let Some(port) = port {
                settings.network.port = port;
            }
            run(settings, duration)
        }
        Command::Send {
            target,
            seed,
            recording,
            count,
        } => send(target, seed, recording, count),
        Command::Config => {
            let settings = Settings::load_or_default(&cli.config);
            serde_json::to_string_pretty(&settings)
                .map(|json| println!("{json}"))
                .map_err(pulse_run::Error::from)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Parse a non-negative number of seconds
fn parse_secs(arg: &str) -> Result<Duration, String> {
    let secs: f32 = arg.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f32(secs).map_err(|e| format!("{e}"))
}

fn run(settings: Settings, duration: Option<Duration>) -> pulse_run::Result<()> {
    let mut session = Session::start(settings)?;
    let tick_interval = Duration::from_secs_f32(HOST_DT);
    let started = Instant::now();
    let mut last = started;
    let mut last_status = None;
    let mut next_hud = started;

    while !session.state().phase.is_finished() {
        let now = Instant::now();
        if duration.is_some_and(|d| now.duration_since(started) >= d) {
            log::info!("Duration reached, stopping");
            break;
        }
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        let report = session.tick(&TickInput::at(now, dt));
        for p in &report.emitted {
            log::debug!(
                "+ platform {} at ({:.2}, {:.2}) width {:.2} {:?}",
                p.id,
                p.position.x,
                p.position.y,
                p.width,
                p.band
            );
        }

        let hud = session.hud();
        if hud.status != last_status {
            if let Some(status) = &hud.status {
                log::info!("{status}");
            }
            last_status = hud.status.clone();
        }
        if now >= next_hud {
            log::info!(
                "{} | RR {:.0} ms | x {:.1} | speed x{:.2} | {} platforms",
                hud.heart_rate_label(),
                hud.rr_interval,
                hud.viewpoint_x,
                hud.time_scale,
                session.state().track.total_emitted()
            );
            next_hud = now + Duration::from_secs(1);
        }

        std::thread::sleep(tick_interval.saturating_sub(now.elapsed()));
    }

    if session.hud().sequence_ended {
        log::info!("Level complete");
    }
    session.shutdown();
    Ok(())
}

fn send(
    target: SocketAddr,
    seed: u64,
    recording: Option<PathBuf>,
    count: Option<usize>,
) -> pulse_run::Result<()> {
    let mut source = match recording {
        Some(path) => SampleSource::recording(RrSequence::load(&path)?),
        None => SampleSource::Synthetic(SyntheticHeart::new(seed)),
    };
    let sender = DatagramSender::new(target)?;
    log::info!("Sending heart rate data to {}", sender.target());
    sender.stream(&mut source, count)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("2.5"), Ok(Duration::from_millis(2500)));
        assert_eq!(parse_secs("0"), Ok(Duration::ZERO));
        assert!(parse_secs("-1").is_err());
        assert!(parse_secs("1e30").is_err());
        assert!(parse_secs("inf").is_err());
        assert!(parse_secs("soon").is_err());
    }

    #[test]
    fn test_cli_rejects_unrepresentable_duration() {
        assert!(Cli::try_parse_from(["pulse-run", "run", "--duration", "1e30"]).is_err());

        let cli = Cli::try_parse_from(["pulse-run", "run", "--duration", "30"]).unwrap();
        match cli.command {
            Command::Run { duration, .. } => assert_eq!(duration, Some(Duration::from_secs(30))),
            _ => panic!("expected run"),
        }
    }
}
