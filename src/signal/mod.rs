//! Signal acquisition
//!
//! Producers (UDP receiver or replay driver) write the latest heart-rate
//! sample into a `SignalChannel`; the host tick reads it. Exactly one producer
//! is active per run.

pub mod channel;
pub mod datagram;
pub mod liveness;
pub mod receiver;
pub mod replay;
pub mod sender;

pub use channel::{ChannelSnapshot, SignalChannel, SignalSample};
pub use datagram::{encode_datagram, parse_datagram};
pub use liveness::{ConnectionState, LivenessEvent, LivenessMonitor};
pub use receiver::{DatagramReceiver, ReceiverStats};
pub use replay::{ReplayDriver, ReplayEvent, ReplayState, RrSequence};
pub use sender::{DatagramSender, SampleSource, SyntheticHeart};
