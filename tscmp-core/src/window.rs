//! Lookahead window over one packet source.
//!
//! Packets are kept in a fixed-capacity circular buffer. Every buffered
//! packet is addressed by its absolute index in the file; slot `i` holds
//! the packet whose absolute index is congruent to `i` modulo the capacity.
//! Only indexes in `origin..origin + buffered` are accessible.

use log::{debug, trace};

use crate::comparator::compare;
use crate::options::{Equality, FieldMask};
use crate::packet::{Packet, PID_MAX};
use crate::source::PacketSource;

/// Bookkeeping attached to each buffered packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketMetadata {
    /// Index of this packet within its PID.
    pub index_in_pid: u64,
    /// Already consumed by a realignment, skipped by [`StreamWindow::move_next`].
    pub ignored: bool,
}

/// A closed run of unmatched packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingArea {
    /// Absolute index of the first unmatched packet.
    pub start: u64,
    /// Number of packets in the run.
    pub count: u64,
}

/// Location of a run of matching packets in another window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMatch {
    /// Absolute index, in the other window, where the run starts.
    pub other_index: u64,
    /// Number of consecutive matching packets.
    pub count: usize,
}

/// Circular lookahead buffer over a [`PacketSource`].
pub struct StreamWindow<S> {
    source: S,
    packets: Vec<Packet>,
    metadata: Vec<PacketMetadata>,
    pid_counts: Vec<u64>,
    /// Absolute index of the first buffered packet.
    origin: u64,
    buffered: usize,
    missing_start: Option<u64>,
    missing_packets: u64,
    missing_chunks: u64,
    end_of_source: bool,
}

impl<S: PacketSource> StreamWindow<S> {
    /// Create a window of `capacity` packets and fill it.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(source: S, capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be at least 1");
        let mut window = Self {
            source,
            packets: vec![Packet::null(); capacity],
            metadata: vec![PacketMetadata::default(); capacity],
            pid_counts: vec![0; PID_MAX],
            origin: 0,
            buffered: 0,
            missing_start: None,
            missing_packets: 0,
            missing_chunks: 0,
            end_of_source: false,
        };
        window.fill_buffer();
        window
    }

    pub fn capacity(&self) -> usize {
        self.packets.len()
    }

    /// Absolute index of the current packet.
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Number of packets currently held.
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// Absolute index one past the last buffered packet, which is also the
    /// number of packets read from the source so far.
    pub fn end(&self) -> u64 {
        self.origin + self.buffered as u64
    }

    pub fn is_end_of_source(&self) -> bool {
        self.end_of_source
    }

    /// Nothing buffered and nothing more to read.
    pub fn is_exhausted(&self) -> bool {
        self.buffered == 0 && self.end_of_source
    }

    pub fn missing_packets(&self) -> u64 {
        self.missing_packets
    }

    pub fn missing_chunks(&self) -> u64 {
        self.missing_chunks
    }

    /// Start of the open missing area, if any.
    pub fn missing_start(&self) -> Option<u64> {
        self.missing_start
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn slot(&self, index: u64) -> usize {
        (index % self.packets.len() as u64) as usize
    }

    fn contains(&self, index: u64) -> bool {
        index >= self.origin && index < self.end()
    }

    /// Top the buffer up from the source.
    ///
    /// Uses at most two reads: up to the physical end of the buffer, then
    /// the wrapped-around part. A short read marks the end of the source.
    pub fn fill_buffer(&mut self) {
        let capacity = self.packets.len();
        while !self.end_of_source && self.buffered < capacity {
            let start = self.slot(self.end());
            let len = (capacity - self.buffered).min(capacity - start);
            let count = self.source.read_packets(&mut self.packets[start..start + len]);

            for i in start..start + count {
                let pid = self.packets[i].pid() as usize;
                self.metadata[i] = PacketMetadata {
                    index_in_pid: self.pid_counts[pid],
                    ignored: false,
                };
                self.pid_counts[pid] += 1;
            }
            self.buffered += count;

            if count < len {
                debug!("end of source after {} packets", self.end());
                self.end_of_source = true;
            }
        }
        trace!("window at {} holds {} packets", self.origin, self.buffered);
    }

    /// Current packet.
    pub fn head(&self) -> Option<&Packet> {
        self.packet_at(self.origin)
    }

    pub fn packet_at(&self, index: u64) -> Option<&Packet> {
        if self.contains(index) {
            Some(&self.packets[self.slot(index)])
        } else {
            None
        }
    }

    pub fn metadata_at(&self, index: u64) -> Option<&PacketMetadata> {
        if self.contains(index) {
            Some(&self.metadata[self.slot(index)])
        } else {
            None
        }
    }

    /// Index of the packet within its PID.
    pub fn count_in_pid(&self, index: u64) -> Option<u64> {
        self.metadata_at(index).map(|m| m.index_in_pid)
    }

    pub fn is_ignored(&self, index: u64) -> bool {
        self.metadata_at(index).map_or(false, |m| m.ignored)
    }

    /// Advance to the next packet not already consumed.
    pub fn move_next(&mut self) {
        if self.buffered == 0 {
            return;
        }
        loop {
            self.origin += 1;
            self.buffered -= 1;
            if self.buffered == 0 {
                self.fill_buffer();
            }
            if self.buffered == 0 || !self.metadata[self.slot(self.origin)].ignored {
                break;
            }
        }
    }

    /// Mark `count` packets from `index` as consumed.
    ///
    /// When the span starts at the current packet, the window advances past
    /// it immediately. Otherwise the packets are skipped later by
    /// [`move_next`](Self::move_next).
    pub fn ignore(&mut self, index: u64, count: usize) {
        let first = index.max(self.origin);
        let last = (index + count as u64).min(self.end());
        if first >= last {
            return;
        }
        for i in first..last {
            let slot = self.slot(i);
            self.metadata[slot].ignored = true;
        }
        if first == self.origin {
            self.move_next();
        }
    }

    /// Open a missing area at the current packet unless one is open.
    pub fn start_missing_area(&mut self) {
        if self.missing_start.is_none() {
            self.missing_start = Some(self.origin);
        }
    }

    /// Close the open missing area, if any, and account for it.
    pub fn resolve_missing_area(&mut self) -> Option<MissingArea> {
        let start = self.missing_start.take()?;
        let count = self.origin - start;
        self.missing_packets += count;
        self.missing_chunks += 1;
        Some(MissingArea { start, count })
    }

    /// Search, in the other window, a run of at least `min_run` packets
    /// matching this window's packets from the current one.
    ///
    /// The first starting index with a long enough run wins. The run is
    /// extended as far as both buffers allow. Consumed packets on either
    /// side end a run. A shorter run is accepted when it reaches the last
    /// packet of either source.
    pub fn find_match<T: PacketSource>(
        &self,
        other: &StreamWindow<T>,
        mask: &FieldMask,
        equality: Equality,
        min_run: usize,
    ) -> Option<RunMatch> {
        if self.buffered == 0 {
            return None;
        }
        let found = (other.origin..other.end())
            .filter(|&candidate| !other.is_ignored(candidate))
            .map(|candidate| RunMatch {
                other_index: candidate,
                count: self.run_length(other, candidate, mask, equality),
            })
            .find(|run| {
                run.count >= min_run.max(1)
                    || (run.count > 0 && self.run_reaches_end(other, run))
            });
        if let Some(run) = found {
            debug!(
                "packet {} found at {} in other file, {} packets",
                self.origin, run.other_index, run.count
            );
        }
        found
    }

    /// The run ends with the last packet of this source or of the other one.
    fn run_reaches_end<T: PacketSource>(&self, other: &StreamWindow<T>, run: &RunMatch) -> bool {
        let count = run.count as u64;
        (self.end_of_source && self.origin + count == self.end())
            || (other.end_of_source && run.other_index + count == other.end())
    }

    fn run_length<T: PacketSource>(
        &self,
        other: &StreamWindow<T>,
        other_start: u64,
        mask: &FieldMask,
        equality: Equality,
    ) -> usize {
        let limit = (self.buffered as u64).min(other.end().saturating_sub(other_start));
        let mut count = 0;
        while count < limit {
            let mine = self.origin + count;
            let theirs = other_start + count;
            if self.is_ignored(mine) || other.is_ignored(theirs) {
                break;
            }
            let (Some(a), Some(b)) = (self.packet_at(mine), other.packet_at(theirs)) else {
                break;
            };
            if !compare(a, b, mask, equality).equal {
                break;
            }
            count += 1;
        }
        count as usize
    }
}
