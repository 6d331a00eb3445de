//! Comparison and resynchronization of MPEG transport stream files.
//!
//! Two files are read through bounded lookahead windows and compared packet
//! by packet. Besides plain byte differences, the engine can recognise
//! packets lost in one file, packets inserted in the other and runs of
//! packets delivered out of order.
//!
//! # Example
//!
//! ```rust
//! use std::io::Cursor;
//! use tscmp_core::{CompareOptions, Packet, PacketReader, Reconciler};
//!
//! let data: Vec<u8> = (0..4).flat_map(|_| *Packet::null().as_bytes()).collect();
//! let first = PacketReader::new(Cursor::new(data.clone()), "a.ts");
//! let second = PacketReader::new(Cursor::new(data), "b.ts");
//!
//! let engine = Reconciler::new(first, second, CompareOptions::default()).unwrap();
//! let (events, summary) = engine.run_to_vec();
//! assert!(events.is_empty());
//! assert!(summary.is_identical());
//! ```

pub mod comparator;
pub mod engine;
pub mod error;
pub mod event;
pub mod options;
pub mod packet;
pub mod source;
pub mod window;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use comparator::{compare, Comparison};
pub use engine::{Reconciler, State};
pub use error::ConfigError;
pub use event::{CompareEvent, CompareSummary, FileId, FileSummary, ReconciliationStats};
pub use options::{CompareMode, CompareOptions, Equality, FieldMask};
pub use packet::{Packet, TsHeader, PID_NULL, SYNC_BYTE, TS_PACKET_SIZE};
pub use source::{PacketReader, PacketSource};
pub use window::StreamWindow;
