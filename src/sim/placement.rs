//! Platform placements and the live track
//!
//! A placement is immutable once emitted. The `Track` holds the placements the
//! rendering side still needs and releases them once they scroll far enough
//! behind the viewpoint.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{ZONE_LOW_BELOW, ZONE_MID_BELOW};

/// Heart-rate zone of the sample that produced a placement (visual cue only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeightBand {
    Low,
    Mid,
    High,
}

impl HeightBand {
    pub fn from_heart_rate(hr: f32) -> Self {
        if hr < ZONE_LOW_BELOW {
            HeightBand::Low
        } else if hr < ZONE_MID_BELOW {
            HeightBand::Mid
        } else {
            HeightBand::High
        }
    }

    /// Suggested tint (0xRRGGBB): green, yellow, red
    pub fn color(&self) -> u32 {
        match self {
            HeightBand::Low => 0x00ff00,
            HeightBand::Mid => 0xffeb04,
            HeightBand::High => 0xff0000,
        }
    }
}

/// One generated platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    /// Emission order, starting at 1
    pub id: u32,
    /// Center of the platform
    pub position: Vec2,
    pub width: f32,
    /// Vertical extent used by the renderer
    pub thickness: f32,
    pub band: HeightBand,
    /// HR that produced this placement (0 for the fixed first placement)
    pub heart_rate: f32,
}

impl PlacementRecord {
    #[inline]
    pub fn left_edge(&self) -> f32 {
        self.position.x - self.width / 2.0
    }

    #[inline]
    pub fn right_edge(&self) -> f32 {
        self.position.x + self.width / 2.0
    }
}

/// Placements currently alive, in emission order
#[derive(Debug, Clone, Default)]
pub struct Track {
    placements: VecDeque<PlacementRecord>,
    total_emitted: u64,
    total_released: u64,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, emitted: &[PlacementRecord]) {
        self.total_emitted += emitted.len() as u64;
        self.placements.extend(emitted.iter().copied());
    }

    /// Release placements whose right edge is more than `distance` behind `viewpoint_x`
    pub fn release_behind(&mut self, viewpoint_x: f32, distance: f32) -> Vec<PlacementRecord> {
        let cutoff = viewpoint_x - distance;
        let mut released = Vec::new();
        // x is increasing, so everything releasable sits at the front
        while let Some(front) = self.placements.front() {
            if front.right_edge() >= cutoff {
                break;
            }
            if let Some(p) = self.placements.pop_front() {
                released.push(p);
            }
        }
        self.total_released += released.len() as u64;
        released
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacementRecord> {
        self.placements.iter()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn last(&self) -> Option<&PlacementRecord> {
        self.placements.back()
    }

    pub fn total_emitted(&self) -> u64 {
        self.total_emitted
    }

    pub fn total_released(&self) -> u64 {
        self.total_released
    }
}
