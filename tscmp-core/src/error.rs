//! Error types for the comparison engine.
//!
//! Packet content never produces an error: differences are reported as
//! events. Only an unusable configuration is rejected, before any packet
//! is read.

use thiserror::Error;

use crate::packet::TS_PACKET_SIZE;

/// Configuration rejected by [`CompareOptions::validate`](crate::CompareOptions::validate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The lookahead window must hold at least one packet.
    #[error("Buffered packet count must be at least 1")]
    ZeroCapacity,

    /// A realignment run must contain at least one packet.
    #[error("Minimum reorder run must be at least 1")]
    ZeroMinReorder,

    /// A realignment run can never be longer than the lookahead window.
    #[error("Minimum reorder run {min_reorder} exceeds buffered packet count {capacity}")]
    MinReorderTooLarge { min_reorder: usize, capacity: usize },

    /// Threshold larger than a packet.
    #[error("Threshold {0} exceeds packet size ({max})", max = TS_PACKET_SIZE)]
    ThresholdTooLarge(usize),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
