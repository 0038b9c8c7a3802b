//! Heart-rate driven track generation
//!
//! The generator keeps a frontier (right edge of the last placement) and
//! fills the lookahead ahead of the viewpoint from the current sample:
//! - higher HR: narrower placements, higher up
//! - longer RR: wider gaps
//!
//! Output depends only on the sample and viewpoint sequence, never on wall
//! time or randomness, so identical inputs give identical tracks.

use glam::Vec2;

use super::placement::{HeightBand, PlacementRecord};
use crate::settings::GeneratorSettings;
use crate::signal::SignalSample;
use crate::{inverse_lerp, lerp};

/// Hard cap on placements emitted by a single step
pub const MAX_PLACEMENTS_PER_STEP: usize = 256;

/// Generator-private progress state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeneratorCursor {
    /// Right edge of the last emitted placement
    pub frontier_x: f32,
    /// Y of the last emitted placement
    pub last_y: f32,
    pub initialized: bool,
}

/// Geometry derived from one sample (before vertical smoothing)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepShape {
    pub width: f32,
    pub gap: f32,
    pub target_y: f32,
    pub band: HeightBand,
}

/// Map a sample to width, gap and target height
pub fn shape_for(sample: &SignalSample, tuning: &GeneratorSettings) -> StepShape {
    let hr = sample.heart_rate;
    let t_hr = inverse_lerp(tuning.hr_range.0, tuning.hr_range.1, hr);
    let t_rr = inverse_lerp(tuning.rr_range.0, tuning.rr_range.1, sample.rr_interval);

    StepShape {
        width: lerp(tuning.max_platform_width, tuning.min_platform_width, t_hr),
        gap: lerp(tuning.min_gap, tuning.max_gap, t_rr),
        target_y: lerp(tuning.lowest_platform_y, tuning.highest_platform_y, t_hr),
        band: HeightBand::from_heart_rate(hr),
    }
}

/// Limit the step from `last_y`, then keep inside the absolute band
pub fn smooth_y(target_y: f32, last_y: f32, tuning: &GeneratorSettings) -> f32 {
    let dy = tuning.max_height_difference;
    target_y
        .clamp(last_y - dy, last_y + dy)
        .clamp(tuning.lowest_platform_y, tuning.highest_platform_y)
}

/// Procedural track generator
#[derive(Debug, Clone)]
pub struct TrackGenerator {
    tuning: GeneratorSettings,
    cursor: GeneratorCursor,
    next_id: u32,
}

impl TrackGenerator {
    /// `tuning` must have passed `Settings::validate`
    pub fn new(tuning: GeneratorSettings) -> Self {
        debug_assert!(tuning.min_gap + tuning.min_platform_width > 0.0);
        Self {
            tuning,
            cursor: GeneratorCursor::default(),
            next_id: 1,
        }
    }

    pub fn tuning(&self) -> &GeneratorSettings {
        &self.tuning
    }

    pub fn cursor(&self) -> GeneratorCursor {
        self.cursor
    }

    /// Right edge of generated content
    pub fn frontier_x(&self) -> f32 {
        self.cursor.frontier_x
    }

    /// Most placements a step may need to cover `distance` (before the hard cap)
    pub fn iteration_bound(&self, distance: f32) -> usize {
        if !(distance > 0.0) {
            return 0;
        }
        let min_advance = self.tuning.min_gap + self.tuning.min_platform_width;
        let needed = (distance / min_advance).ceil();
        if needed >= MAX_PLACEMENTS_PER_STEP as f32 {
            MAX_PLACEMENTS_PER_STEP
        } else {
            (needed as usize + 1).min(MAX_PLACEMENTS_PER_STEP)
        }
    }

    /// Run one generation step, appending new placements to `out`.
    ///
    /// Returns how many were emitted.
    pub fn step(
        &mut self,
        viewpoint_x: f32,
        sample: SignalSample,
        out: &mut Vec<PlacementRecord>,
    ) -> usize {
        let start = out.len();

        if !self.cursor.initialized {
            out.push(self.spawn_first());
        }

        // Nothing usable yet: keep the cursor where it is
        if !sample.is_usable() {
            return out.len() - start;
        }

        let horizon = viewpoint_x + self.tuning.lookahead;
        let bound = self.iteration_bound(horizon - self.cursor.frontier_x);
        for _ in 0..bound {
            if self.cursor.frontier_x >= horizon {
                break;
            }
            out.push(self.spawn_next(&sample));
        }

        if self.cursor.frontier_x < horizon && bound == MAX_PLACEMENTS_PER_STEP {
            log::debug!(
                "Generation capped at {} placements; frontier {:.2} behind horizon {:.2}",
                MAX_PLACEMENTS_PER_STEP,
                self.cursor.frontier_x,
                horizon
            );
        }

        out.len() - start
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn spawn_first(&mut self) -> PlacementRecord {
        let t = &self.tuning;
        let position = Vec2::new(t.origin_x, t.first_platform_y);
        let width = t.first_platform_width;
        let thickness = t.platform_height;

        self.cursor = GeneratorCursor {
            frontier_x: position.x + width / 2.0,
            last_y: position.y,
            initialized: true,
        };

        PlacementRecord {
            id: self.allocate_id(),
            position,
            width,
            thickness,
            band: HeightBand::Low,
            heart_rate: 0.0,
        }
    }

    fn spawn_next(&mut self, sample: &SignalSample) -> PlacementRecord {
        let shape = shape_for(sample, &self.tuning);
        let half_width = shape.width / 2.0;
        let x = self.cursor.frontier_x + shape.gap + half_width;
        let y = smooth_y(shape.target_y, self.cursor.last_y, &self.tuning);

        self.cursor.frontier_x = x + half_width;
        self.cursor.last_y = y;

        let placement = PlacementRecord {
            id: self.allocate_id(),
            position: Vec2::new(x, y),
            width: shape.width,
            thickness: self.tuning.platform_height,
            band: shape.band,
            heart_rate: sample.heart_rate,
        };
        log::trace!(
            "Placement {} at ({:.2}, {:.2}) width {:.2} {:?}",
            placement.id,
            x,
            y,
            shape.width,
            shape.band
        );
        placement
    }
}
