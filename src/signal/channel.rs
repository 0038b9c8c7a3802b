//! Shared latest-sample holder
//!
//! The channel is written by exactly one producer (UDP receiver thread or
//! replay driver) and read from the host tick. Every read and write copies a
//! whole `ChannelSnapshot` under the lock, so a reader never sees HR from one
//! sample and RR from another.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// One heart-rate reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalSample {
    /// Beats per minute
    pub heart_rate: f32,
    /// Beat-to-beat interval in milliseconds
    pub rr_interval: f32,
}

impl SignalSample {
    pub fn new(heart_rate: f32, rr_interval: f32) -> Self {
        Self {
            heart_rate,
            rr_interval,
        }
    }

    /// Build a sample from an RR interval alone (HR = 60000 / RR)
    pub fn from_rr(rr_interval: f32) -> Self {
        Self::new(crate::rr_to_hr(rr_interval), rr_interval)
    }

    /// False for the zero sample and for any non-positive or non-finite field
    pub fn is_usable(&self) -> bool {
        self.heart_rate.is_finite()
            && self.rr_interval.is_finite()
            && self.heart_rate > 0.0
            && self.rr_interval > 0.0
    }
}

/// Everything a reader sees at one instant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelSnapshot {
    pub sample: SignalSample,
    /// Wall-clock arrival of `sample` (None until the first publish)
    pub received_at: Option<Instant>,
    /// Number of samples published so far
    pub sequence: u64,
    /// Liveness flag maintained by the active producer's supervisor
    pub connected: bool,
}

/// Cloneable handle to the run's signal state
#[derive(Debug, Clone, Default)]
pub struct SignalChannel {
    inner: Arc<Mutex<ChannelSnapshot>>,
}

impl SignalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelSnapshot> {
        // A panicking writer cannot leave a half-written Copy value behind
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Publish a sample stamped with the current time
    pub fn publish(&self, sample: SignalSample) {
        self.publish_at(sample, Instant::now());
    }

    /// Publish a sample with an explicit arrival time
    pub fn publish_at(&self, sample: SignalSample, at: Instant) {
        let mut snapshot = self.lock();
        *snapshot = ChannelSnapshot {
            sample,
            received_at: Some(at),
            sequence: snapshot.sequence + 1,
            connected: snapshot.connected,
        };
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ChannelSnapshot {
        *self.lock()
    }

    /// Latest sample only
    pub fn sample(&self) -> SignalSample {
        self.lock().sample
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }
}
