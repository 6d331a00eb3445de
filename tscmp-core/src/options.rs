//! Comparison settings.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::packet::TS_PACKET_SIZE;

/// Default lookahead window, in packets.
pub const DEFAULT_BUFFERED_PACKETS: usize = 10_000;

/// Default minimum run accepted as a realignment.
pub const DEFAULT_MIN_REORDER: usize = 7;

/// Which header fields are neutralised before two packets are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMask {
    /// Compare only the payload, skip header and adaptation field.
    pub payload_only: bool,
    /// Ignore PCR and OPCR values.
    pub pcr_ignore: bool,
    /// Ignore PID values.
    pub pid_ignore: bool,
    /// Ignore continuity counters.
    pub cc_ignore: bool,
}

impl FieldMask {
    /// True when at least one header field must be neutralised.
    pub fn masks_fields(&self) -> bool {
        self.pcr_ignore || self.pid_ignore || self.cc_ignore
    }
}

/// Equality policy applied by the comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equality {
    /// Zero differing bytes.
    Strict,
    /// At most this many differing bytes.
    Tolerant(usize),
}

/// Full set of comparison settings.
///
/// Deserializes from the `[compare]` table of a configuration file; every
/// key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Lookahead window size, in packets, per file.
    pub buffered_packets: usize,
    /// Minimum run of consecutive matching packets accepted as a realignment.
    pub min_reorder: usize,
    /// Maximum differing bytes for two packets to be declared equal in
    /// subset and search-reorder modes.
    pub threshold_diff: usize,
    /// Search reordered, missing and duplicated packets.
    pub search_reorder: bool,
    /// The second file is the first one with some packets removed.
    pub subset: bool,
    /// Keep comparing after the first difference.
    pub continue_all: bool,
    #[serde(flatten)]
    pub mask: FieldMask,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            buffered_packets: DEFAULT_BUFFERED_PACKETS,
            min_reorder: DEFAULT_MIN_REORDER,
            threshold_diff: 0,
            search_reorder: false,
            subset: false,
            continue_all: false,
            mask: FieldMask::default(),
        }
    }
}

/// Strategy driving the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    LockStep,
    Subset,
    SearchReorder,
}

impl CompareOptions {
    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.buffered_packets == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.threshold_diff > TS_PACKET_SIZE {
            return Err(ConfigError::ThresholdTooLarge(self.threshold_diff));
        }
        if self.search_reorder {
            if self.min_reorder == 0 {
                return Err(ConfigError::ZeroMinReorder);
            }
            if self.min_reorder > self.buffered_packets {
                return Err(ConfigError::MinReorderTooLarge {
                    min_reorder: self.min_reorder,
                    capacity: self.buffered_packets,
                });
            }
        }
        Ok(())
    }

    pub fn mode(&self) -> CompareMode {
        if self.search_reorder {
            CompareMode::SearchReorder
        } else if self.subset {
            CompareMode::Subset
        } else {
            CompareMode::LockStep
        }
    }

    /// Equality used to decide whether two head packets match.
    pub fn equality(&self) -> Equality {
        match self.mode() {
            CompareMode::SearchReorder => Equality::Tolerant(self.threshold_diff),
            _ => Equality::Strict,
        }
    }

    /// Whether the loop may stop at the first reported difference.
    pub fn stops_at_first_difference(&self) -> bool {
        !self.continue_all && !self.search_reorder
    }
}
