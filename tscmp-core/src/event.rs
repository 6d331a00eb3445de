//! Comparison events and counters.

use std::fmt;

use serde::Serialize;

use crate::comparator::Comparison;
use crate::packet::Packet;

/// One of the two compared files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum FileId {
    First,
    Second,
}

impl FileId {
    /// 1 or 2, as shown to users.
    pub fn number(self) -> u8 {
        match self {
            FileId::First => 1,
            FileId::Second => 2,
        }
    }

    pub fn other(self) -> Self {
        match self {
            FileId::First => FileId::Second,
            FileId::Second => FileId::First,
        }
    }

    /// Index into per-file arrays.
    pub fn index(self) -> usize {
        self.number() as usize - 1
    }
}

impl From<FileId> for u8 {
    fn from(value: FileId) -> Self {
        value.number()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Something found while comparing, in stream order.
///
/// Positions are absolute packet indexes from the start of each file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompareEvent {
    /// Two packets expected to match do not.
    Difference {
        position_1: u64,
        position_2: u64,
        pid_1: u16,
        pid_2: u16,
        /// Index of the packet within its PID in file 1.
        index_in_pid_1: u64,
        /// Index of the packet within its PID in file 2.
        index_in_pid_2: u64,
        #[serde(flatten)]
        comparison: Comparison,
        /// The two packets, for dumps.
        #[serde(skip)]
        packets: [Packet; 2],
    },
    /// `count` packets at `position` in `file` were found at
    /// `other_position` in the other file.
    OutOfOrder {
        file: FileId,
        position: u64,
        other_position: u64,
        count: usize,
    },
    /// `count` packets starting at `position` in the other file have no
    /// counterpart in `missing_in`.
    Skipped {
        missing_in: FileId,
        position: u64,
        count: u64,
    },
    /// `file` ended after `position` packets while the other one had more.
    Truncated { file: FileId, position: u64 },
}

/// Running totals of one comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationStats {
    pub differences: u64,
    pub out_of_order: u64,
    pub skipped: u64,
    pub truncated: u64,
}

impl ReconciliationStats {
    /// Counters after `event`.
    pub fn record(self, event: &CompareEvent) -> Self {
        match event {
            CompareEvent::Difference { .. } => Self {
                differences: self.differences + 1,
                ..self
            },
            CompareEvent::OutOfOrder { .. } => Self {
                out_of_order: self.out_of_order + 1,
                ..self
            },
            CompareEvent::Skipped { .. } => Self {
                skipped: self.skipped + 1,
                ..self
            },
            CompareEvent::Truncated { .. } => Self {
                truncated: self.truncated + 1,
                ..self
            },
        }
    }

    /// Total number of events.
    pub fn events(&self) -> u64 {
        self.differences + self.out_of_order + self.skipped + self.truncated
    }
}

/// Per-file outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    /// Packets read from the source, including those still buffered.
    pub packets: u64,
    /// Packets of this file without counterpart in the other one.
    pub missing_packets: u64,
    /// Number of contiguous missing areas.
    pub missing_chunks: u64,
    /// The file was read up to its end.
    pub fully_consumed: bool,
}

/// Final report of a comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompareSummary {
    pub stats: ReconciliationStats,
    pub files: [FileSummary; 2],
}

impl CompareSummary {
    pub fn file(&self, id: FileId) -> &FileSummary {
        &self.files[id.index()]
    }

    /// No event and both files read to the end.
    pub fn is_identical(&self) -> bool {
        self.stats.events() == 0 && self.files.iter().all(|f| f.fully_consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_pure() {
        let stats = ReconciliationStats::default();
        let event = CompareEvent::Truncated {
            file: FileId::Second,
            position: 10,
        };
        let next = stats.record(&event);
        assert_eq!(stats.events(), 0);
        assert_eq!(next.truncated, 1);
        assert_eq!(next.events(), 1);
    }

    #[test]
    fn test_file_id() {
        assert_eq!(FileId::First.other(), FileId::Second);
        assert_eq!(FileId::Second.number(), 2);
        assert_eq!(FileId::Second.index(), 1);
        assert_eq!(FileId::First.to_string(), "1");
    }

    #[test]
    fn test_event_json_shape() {
        let event = CompareEvent::Skipped {
            missing_in: FileId::Second,
            position: 42,
            count: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "skipped");
        assert_eq!(json["missing_in"], 2);
        assert_eq!(json["position"], 42);
    }

    #[test]
    fn test_identical_requires_full_consumption() {
        let mut summary = CompareSummary::default();
        assert!(!summary.is_identical());
        summary.files[0].fully_consumed = true;
        summary.files[1].fully_consumed = true;
        assert!(summary.is_identical());
    }
}
