//! Sensor bridge stand-in
//!
//! Sends `"hr,rr"` datagrams the way the BLE bridge does, either from a seeded
//! heart model or by streaming a recording. Used for development and demos
//! when no chest strap is around.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::channel::SignalSample;
use super::datagram::encode_datagram;
use super::replay::RrSequence;
use crate::error::Result;

/// Seeded random-walk heart model
#[derive(Debug, Clone)]
pub struct SyntheticHeart {
    rng: Pcg32,
    /// Current underlying rate (bpm)
    rate: f32,
    /// Slow drift target the walk is pulled toward
    target: f32,
    min_rate: f32,
    max_rate: f32,
}

impl SyntheticHeart {
    pub fn new(seed: u64) -> Self {
        Self::with_range(seed, 55.0, 130.0)
    }

    pub fn with_range(seed: u64, min_rate: f32, max_rate: f32) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let rate = rng.random_range(min_rate..=max_rate);
        Self {
            rng,
            rate,
            target: rate,
            min_rate,
            max_rate,
        }
    }

    /// Next beat: HR from the walk, RR from HR with beat-to-beat jitter
    pub fn next_sample(&mut self) -> SignalSample {
        // Occasionally pick a new target (rest, effort, recovery)
        if self.rng.random_ratio(1, 40) {
            self.target = self.rng.random_range(self.min_rate..=self.max_rate);
        }
        let pull = (self.target - self.rate) * 0.08;
        let noise = self.rng.random_range(-1.5f32..=1.5);
        self.rate = (self.rate + pull + noise).clamp(self.min_rate, self.max_rate);

        let rr = crate::consts::MS_PER_MINUTE / self.rate * self.rng.random_range(0.97f32..=1.03);
        SignalSample::new(self.rate.round(), rr.round())
    }
}

/// Where outgoing samples come from
#[derive(Debug, Clone)]
pub enum SampleSource {
    Synthetic(SyntheticHeart),
    Recording { sequence: RrSequence, index: usize },
}

impl SampleSource {
    pub fn recording(sequence: RrSequence) -> Self {
        SampleSource::Recording { sequence, index: 0 }
    }

    /// Next sample, or None when a recording is exhausted
    pub fn next_sample(&mut self) -> Option<SignalSample> {
        match self {
            SampleSource::Synthetic(heart) => Some(heart.next_sample()),
            SampleSource::Recording { sequence, index } => {
                let rr = *sequence.values().get(*index)?;
                *index += 1;
                Some(SignalSample::from_rr(rr))
            }
        }
    }
}

/// UDP client that mimics the sensor bridge
pub struct DatagramSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl DatagramSender {
    pub fn new(target: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local)?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn send(&self, sample: &SignalSample) -> Result<()> {
        let payload = encode_datagram(sample);
        self.socket.send_to(payload.as_bytes(), self.target)?;
        log::debug!("Sent HR={}, RR={}", sample.heart_rate, sample.rr_interval);
        Ok(())
    }

    /// Send samples paced by their RR interval until the source runs dry or
    /// `limit` samples have gone out. Returns the number sent.
    pub fn stream(&self, source: &mut SampleSource, limit: Option<usize>) -> Result<usize> {
        let mut sent = 0usize;
        while limit.is_none_or(|max| sent < max) {
            let Some(sample) = source.next_sample() else {
                break;
            };
            self.send(&sample)?;
            sent += 1;
            std::thread::sleep(Duration::from_secs_f32(sample.rr_interval.max(0.0) / 1000.0));
        }
        log::info!("Sent {} samples to {}", sent, self.target);
        Ok(sent)
    }
}
