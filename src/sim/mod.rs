//! Deterministic run simulation
//!
//! Track generation and the per-tick session update. This module must stay
//! deterministic for a given sequence of samples and tick inputs:
//! - No randomness
//! - No rendering or socket dependencies
//! - Wall clock only enters through `TickInput::now` (liveness)

pub mod clock;
pub mod generator;
pub mod placement;
pub mod state;
pub mod tick;

pub use clock::{HoldReason, HostClock, hr_time_scale};
pub use generator::{GeneratorCursor, MAX_PLACEMENTS_PER_STEP, TrackGenerator};
pub use placement::{HeightBand, PlacementRecord, Track};
pub use state::{HudView, RunEvent, RunPhase, RunState, SignalSource};
pub use tick::{TickInput, TickReport, tick};
