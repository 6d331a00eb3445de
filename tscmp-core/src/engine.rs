//! Reconciliation of two packet streams.
//!
//! The engine walks both files in lock-step while their packets match.
//! What happens on a mismatch depends on the [`CompareMode`]:
//!
//! - lock-step: the pair is reported as a difference and both files advance;
//! - subset: file 1 is read ahead until a packet matches file 2 again;
//! - search-reorder: both lookahead windows are searched for a run of
//!   matching packets, which tells apart lost, extra and displaced packets.

use log::{debug, info, trace};

use crate::comparator::{compare, Comparison};
use crate::error::ConfigError;
use crate::event::{CompareEvent, CompareSummary, FileId, FileSummary, ReconciliationStats};
use crate::options::{CompareMode, CompareOptions, Equality};
use crate::packet::Packet;
use crate::source::PacketSource;
use crate::window::{RunMatch, StreamWindow};

/// Engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Both files have packets to compare.
    Comparing,
    /// At least one file is exhausted, or the comparison must stop.
    Exhausted,
    /// Terminal.
    Done,
}

/// Drives two [`StreamWindow`]s and reports what differs between them.
pub struct Reconciler<S1, S2> {
    first: StreamWindow<S1>,
    second: StreamWindow<S2>,
    options: CompareOptions,
    state: State,
}

impl<S1: PacketSource, S2: PacketSource> Reconciler<S1, S2> {
    /// Validate `options` and fill both windows.
    pub fn new(first: S1, second: S2, options: CompareOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let capacity = options.buffered_packets;
        debug!("comparing in {:?} mode, {} packets lookahead", options.mode(), capacity);
        Ok(Self {
            first: StreamWindow::new(first, capacity),
            second: StreamWindow::new(second, capacity),
            options,
            state: State::Comparing,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn first(&self) -> &StreamWindow<S1> {
        &self.first
    }

    pub fn second(&self) -> &StreamWindow<S2> {
        &self.second
    }

    /// Compare both files to the end (or to the first difference) and feed
    /// each event to `sink` as soon as it is found.
    pub fn run<F>(mut self, mut sink: F) -> CompareSummary
    where
        F: FnMut(&CompareEvent),
    {
        let mut stats = ReconciliationStats::default();
        let mut events = Vec::new();
        while self.state != State::Done {
            self.state = self.step(&stats, &mut events);
            for event in events.drain(..) {
                stats = stats.record(&event);
                sink(&event);
            }
        }
        let summary = self.summary(stats);
        info!(
            "compared {} / {} packets, {} events",
            summary.files[0].packets,
            summary.files[1].packets,
            summary.stats.events()
        );
        summary
    }

    /// Compare both files and collect all events.
    pub fn run_to_vec(self) -> (Vec<CompareEvent>, CompareSummary) {
        let mut events = Vec::new();
        let summary = self.run(|event| events.push(event.clone()));
        (events, summary)
    }

    /// One transition of the state machine. New events are appended to
    /// `events`; `stats` reflects all events emitted by earlier steps.
    pub fn step(&mut self, stats: &ReconciliationStats, events: &mut Vec<CompareEvent>) -> State {
        match self.state {
            State::Comparing => {
                if self.options.stops_at_first_difference() && stats.differences > 0 {
                    self.flush_missing_areas(events);
                    return State::Done;
                }
                if self.first.is_exhausted() || self.second.is_exhausted() {
                    return State::Exhausted;
                }
                match self.options.mode() {
                    CompareMode::LockStep => self.step_lock_step(events),
                    CompareMode::Subset => self.step_subset(events),
                    CompareMode::SearchReorder => self.step_search_reorder(events),
                }
                State::Comparing
            }
            State::Exhausted => {
                self.flush_missing_areas(events);
                self.report_truncation(events);
                State::Done
            }
            State::Done => State::Done,
        }
    }

    fn compare_heads(&self, equality: Equality) -> Option<Comparison> {
        let a = self.first.head()?;
        let b = self.second.head()?;
        Some(compare(a, b, &self.options.mask, equality))
    }

    fn advance_both(&mut self) {
        self.first.move_next();
        self.second.move_next();
    }

    fn difference(&self, comparison: Comparison) -> CompareEvent {
        let position_1 = self.first.origin();
        let position_2 = self.second.origin();
        let packet_1 = self.first.head().copied().unwrap_or_else(Packet::null);
        let packet_2 = self.second.head().copied().unwrap_or_else(Packet::null);
        CompareEvent::Difference {
            position_1,
            position_2,
            pid_1: packet_1.pid(),
            pid_2: packet_2.pid(),
            index_in_pid_1: self.first.count_in_pid(position_1).unwrap_or(0),
            index_in_pid_2: self.second.count_in_pid(position_2).unwrap_or(0),
            comparison,
            packets: [packet_1, packet_2],
        }
    }

    fn step_lock_step(&mut self, events: &mut Vec<CompareEvent>) {
        let Some(comparison) = self.compare_heads(Equality::Strict) else {
            return;
        };
        if !comparison.equal {
            trace!("difference at {}/{}", self.first.origin(), self.second.origin());
            events.push(self.difference(comparison));
        }
        self.advance_both();
    }

    fn step_subset(&mut self, events: &mut Vec<CompareEvent>) {
        let Some(comparison) = self.compare_heads(Equality::Strict) else {
            return;
        };
        if !comparison.equal && comparison.diff_count > self.options.threshold_diff {
            // not in file 2, read ahead file 1
            self.first.start_missing_area();
            self.first.move_next();
            return;
        }
        resolve_missing(&mut self.first, FileId::First, events);
        if !comparison.equal {
            events.push(self.difference(comparison));
        }
        self.advance_both();
    }

    fn step_search_reorder(&mut self, events: &mut Vec<CompareEvent>) {
        let equality = self.options.equality();
        let Some(comparison) = self.compare_heads(equality) else {
            return;
        };
        if comparison.equal {
            resolve_missing(&mut self.first, FileId::First, events);
            resolve_missing(&mut self.second, FileId::Second, events);
            self.advance_both();
            return;
        }

        self.first.fill_buffer();
        self.second.fill_buffer();
        let mask = self.options.mask;
        let min_run = self.options.min_reorder;
        let first_match = self.first.find_match(&self.second, &mask, equality, min_run);
        let second_match = self.second.find_match(&self.first, &mask, equality, min_run);

        match (first_match, second_match) {
            (None, None) => {
                trace!(
                    "no match for packets {}/{}",
                    self.first.origin(),
                    self.second.origin()
                );
                self.first.start_missing_area();
                self.second.start_missing_area();
                self.advance_both();
            }
            (Some(_), None) => {
                // file 1 packet comes later in file 2, file 2 packet is unmatched
                self.second.start_missing_area();
                self.second.move_next();
            }
            (None, Some(_)) => {
                self.first.start_missing_area();
                self.first.move_next();
            }
            (Some(first_run), Some(second_run)) => {
                self.realign(first_run, second_run, events);
            }
        }
    }

    /// Both heads were found elsewhere in the other file.
    ///
    /// Two runs far enough from each other are independent displacements and
    /// are both consumed. Otherwise they describe the same displacement and
    /// only the longer one is kept, file 1 winning ties.
    ///
    /// The disjoint test bounds each match by the length of the other run.
    /// When the file 1 run is the longer one, the file 2 run may point into
    /// file 1 packets that its own run has just consumed; those are not
    /// marked again but the event is still reported.
    fn realign(&mut self, first_run: RunMatch, second_run: RunMatch, events: &mut Vec<CompareEvent>) {
        let start_1 = self.first.origin();
        let start_2 = self.second.origin();
        let disjoint = second_run.other_index > start_1 + second_run.count as u64
            && first_run.other_index > start_2 + first_run.count as u64;

        if disjoint {
            debug!("two independent reordered runs at {}/{}", start_1, start_2);
            self.consume_first_run(first_run, events);
            self.consume_second_run(start_2, second_run, events);
        } else if first_run.count >= second_run.count {
            debug!(
                "overlapping runs at {}/{}, keeping file 1 run of {} packets",
                start_1, start_2, first_run.count
            );
            self.consume_first_run(first_run, events);
        } else {
            debug!(
                "overlapping runs at {}/{}, keeping file 2 run of {} packets",
                start_1, start_2, second_run.count
            );
            self.consume_second_run(start_2, second_run, events);
        }
    }

    fn consume_first_run(&mut self, run: RunMatch, events: &mut Vec<CompareEvent>) {
        let start = self.first.origin();
        events.push(CompareEvent::OutOfOrder {
            file: FileId::First,
            position: start,
            other_position: run.other_index,
            count: run.count,
        });
        self.first.ignore(start, run.count);
        self.second.ignore(run.other_index, run.count);
    }

    fn consume_second_run(&mut self, start: u64, run: RunMatch, events: &mut Vec<CompareEvent>) {
        events.push(CompareEvent::OutOfOrder {
            file: FileId::Second,
            position: start,
            other_position: run.other_index,
            count: run.count,
        });
        self.second.ignore(start, run.count);
        self.first.ignore(run.other_index, run.count);
    }

    fn flush_missing_areas(&mut self, events: &mut Vec<CompareEvent>) {
        resolve_missing(&mut self.first, FileId::First, events);
        resolve_missing(&mut self.second, FileId::Second, events);
    }

    fn report_truncation(&self, events: &mut Vec<CompareEvent>) {
        let truncated = match (self.first.is_exhausted(), self.second.is_exhausted()) {
            (true, false) => Some((FileId::First, self.first.origin())),
            (false, true) => Some((FileId::Second, self.second.origin())),
            _ => None,
        };
        if let Some((file, position)) = truncated {
            debug!("file {} truncated at packet {}", file, position);
            events.push(CompareEvent::Truncated { file, position });
        }
    }

    fn summary(&self, stats: ReconciliationStats) -> CompareSummary {
        CompareSummary {
            stats,
            files: [file_summary(&self.first), file_summary(&self.second)],
        }
    }
}

/// Close the missing area of `window`; its packets are missing in the other file.
fn resolve_missing<S: PacketSource>(
    window: &mut StreamWindow<S>,
    file: FileId,
    events: &mut Vec<CompareEvent>,
) {
    if let Some(area) = window.resolve_missing_area() {
        if area.count > 0 {
            events.push(CompareEvent::Skipped {
                missing_in: file.other(),
                position: area.start,
                count: area.count,
            });
        }
    }
}

fn file_summary<S: PacketSource>(window: &StreamWindow<S>) -> FileSummary {
    FileSummary {
        packets: window.end(),
        missing_packets: window.missing_packets(),
        missing_chunks: window.missing_chunks(),
        fully_consumed: window.is_exhausted(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::FieldMask;
    use crate::packet::TS_PACKET_SIZE;
    use crate::test_support::{es_packet, reader, stream};

    fn run(a: &[Packet], b: &[Packet], options: CompareOptions) -> (Vec<CompareEvent>, CompareSummary) {
        Reconciler::new(reader(a), reader(b), options)
            .unwrap()
            .run_to_vec()
    }

    fn search(min_reorder: usize) -> CompareOptions {
        CompareOptions {
            buffered_packets: 64,
            min_reorder,
            search_reorder: true,
            ..Default::default()
        }
    }

    fn all_modes() -> Vec<CompareOptions> {
        vec![
            CompareOptions::default(),
            CompareOptions {
                subset: true,
                ..Default::default()
            },
            search(7),
        ]
    }

    fn count_kind(events: &[CompareEvent], f: impl Fn(&CompareEvent) -> bool) -> usize {
        events.iter().filter(|e| f(*e)).count()
    }

    #[test]
    fn test_identity_in_every_mode() {
        let packets = stream(100);
        for options in all_modes() {
            let (events, summary) = run(&packets, &packets, options);
            assert!(events.is_empty());
            assert!(summary.is_identical());
            assert_eq!(summary.files[0].packets, 100);
            assert_eq!(summary.files[1].packets, 100);
        }
    }

    #[test]
    fn test_identity_with_small_window() {
        let packets = stream(50);
        let options = CompareOptions {
            buffered_packets: 3,
            min_reorder: 2,
            search_reorder: true,
            ..Default::default()
        };
        let (events, summary) = run(&packets, &packets, options);
        assert!(events.is_empty());
        assert!(summary.is_identical());
    }

    #[test]
    fn test_single_byte_below_threshold() {
        let a = stream(30);
        let mut b = a.clone();
        b[12].as_bytes_mut()[100] ^= 0x40;

        let tolerant = CompareOptions {
            threshold_diff: 1,
            ..search(7)
        };
        let (events, summary) = run(&a, &b, tolerant);
        assert!(events.is_empty());
        assert!(summary.is_identical());

        let (events, _) = run(&a, &b, CompareOptions::default());
        assert_eq!(events.len(), 1);
        match &events[0] {
            CompareEvent::Difference {
                position_1,
                position_2,
                comparison,
                ..
            } => {
                assert_eq!(*position_1, 12);
                assert_eq!(*position_2, 12);
                assert_eq!(comparison.diff_count, 1);
                assert_eq!(comparison.first_diff, 100);
                assert_eq!(comparison.end_diff, 101);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_lock_step_stops_at_first_difference() {
        let a = stream(30);
        let mut b = a.clone();
        b[5].as_bytes_mut()[50] ^= 0xFF;
        b[20].as_bytes_mut()[50] ^= 0xFF;

        let (events, summary) = run(&a, &b, CompareOptions::default());
        assert_eq!(events.len(), 1);
        assert_eq!(summary.stats.differences, 1);
        assert!(!summary.files[0].fully_consumed);

        let continued = CompareOptions {
            continue_all: true,
            ..Default::default()
        };
        let (events, summary) = run(&a, &b, continued);
        assert_eq!(events.len(), 2);
        assert!(summary.files[0].fully_consumed);
        assert!(!summary.is_identical());
    }

    #[test]
    fn test_difference_reports_pid_indexes() {
        let a = stream(10);
        let mut b = a.clone();
        b[7] = es_packet(0x300, 1000);

        let (events, _) = run(&a, &b, CompareOptions::default());
        match &events[0] {
            CompareEvent::Difference {
                pid_1,
                pid_2,
                index_in_pid_1,
                index_in_pid_2,
                ..
            } => {
                assert_eq!(*pid_1, 0x101);
                assert_eq!(*pid_2, 0x300);
                assert_eq!(*index_in_pid_1, 3);
                assert_eq!(*index_in_pid_2, 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_dropped_packet() {
        let a = stream(40);
        let mut b = a.clone();
        b.remove(10);

        let (events, summary) = run(&a, &b, search(7));
        assert_eq!(
            events,
            vec![CompareEvent::Skipped {
                missing_in: FileId::Second,
                position: 10,
                count: 1
            }]
        );
        assert_eq!(summary.stats.differences, 0);
        assert_eq!(summary.files[0].missing_packets, 1);
        assert_eq!(summary.files[0].missing_chunks, 1);
        assert!(summary.files[0].fully_consumed);
        assert!(summary.files[1].fully_consumed);
    }

    #[test]
    fn test_extra_packets_in_second_file() {
        let a = stream(40);
        let mut b = a.clone();
        b.insert(15, es_packet(0x400, 500));
        b.insert(16, es_packet(0x400, 501));

        let (events, summary) = run(&a, &b, search(7));
        assert_eq!(
            events,
            vec![CompareEvent::Skipped {
                missing_in: FileId::First,
                position: 15,
                count: 2
            }]
        );
        assert_eq!(summary.files[1].missing_packets, 2);
    }

    #[test]
    fn test_swapped_pair_below_min_reorder() {
        // A two-packet swap cannot form a run of 7: both packets end up in
        // missing areas instead of being reported out of order.
        let a = stream(40);
        let mut b = a.clone();
        b.swap(20, 21);

        let (events, summary) = run(&a, &b, search(7));
        assert_eq!(count_kind(&events, |e| matches!(e, CompareEvent::OutOfOrder { .. })), 0);
        assert_eq!(
            events,
            vec![
                CompareEvent::Skipped {
                    missing_in: FileId::Second,
                    position: 20,
                    count: 2
                },
                CompareEvent::Skipped {
                    missing_in: FileId::First,
                    position: 20,
                    count: 2
                },
            ]
        );
        assert_eq!(summary.stats.differences, 0);
    }

    #[test]
    fn test_swapped_pair_reordered() {
        let a = stream(40);
        let mut b = a.clone();
        b.swap(20, 21);

        let (events, summary) = run(&a, &b, search(1));
        assert_eq!(
            events,
            vec![CompareEvent::OutOfOrder {
                file: FileId::First,
                position: 20,
                other_position: 21,
                count: 1
            }]
        );
        assert!(summary.files[0].fully_consumed);
        assert!(summary.files[1].fully_consumed);
        assert_eq!(summary.files[0].missing_packets, 0);
    }

    #[test]
    fn test_swapped_pair_min_reorder_two() {
        let a = stream(40);
        let mut b = a.clone();
        b.swap(20, 21);

        let (events, summary) = run(&a, &b, search(2));
        assert_eq!(
            events,
            vec![
                CompareEvent::Skipped {
                    missing_in: FileId::Second,
                    position: 20,
                    count: 2
                },
                CompareEvent::Skipped {
                    missing_in: FileId::First,
                    position: 20,
                    count: 2
                },
            ]
        );
        assert!(summary.files[0].fully_consumed);
        assert!(summary.files[1].fully_consumed);
    }

    #[test]
    fn test_dropped_packet_near_end() {
        let a = stream(40);
        let mut b = a.clone();
        b.remove(37);

        let (events, summary) = run(&a, &b, search(7));
        assert_eq!(
            events,
            vec![CompareEvent::Skipped {
                missing_in: FileId::Second,
                position: 37,
                count: 1
            }]
        );
        assert_eq!(summary.stats.truncated, 0);
        assert!(summary.files[0].fully_consumed);
        assert!(summary.files[1].fully_consumed);
    }

    #[test]
    fn test_extra_packet_before_last() {
        let a = stream(20);
        let mut b = a.clone();
        b.insert(19, es_packet(0x400, 700));

        let (events, summary) = run(&a, &b, search(7));
        assert_eq!(
            events,
            vec![CompareEvent::Skipped {
                missing_in: FileId::First,
                position: 19,
                count: 1
            }]
        );
        assert!(summary.files[1].fully_consumed);
    }

    #[test]
    fn test_overlapping_runs_keep_longer() {
        // P1 P2 Q1 Q2 Q3 ... against Q1 Q2 Q3 P1 P2 ...
        let a = stream(30);
        let mut b = a.clone();
        b[10..15].rotate_left(2);

        let (events, summary) = run(&a, &b, search(2));
        assert_eq!(
            events,
            vec![CompareEvent::OutOfOrder {
                file: FileId::Second,
                position: 10,
                other_position: 12,
                count: 3
            }]
        );
        assert!(summary.files[0].fully_consumed);
        assert!(summary.files[1].fully_consumed);
    }

    #[test]
    fn test_disjoint_runs_both_reported() {
        // X1 X2 Y1 Y2 Y3 Z1 Z2 against Z1 Z2 Y1 Y2 Y3 X1 X2
        let a = stream(30);
        let mut b = a.clone();
        b[10] = a[15];
        b[11] = a[16];
        b[15] = a[10];
        b[16] = a[11];

        let (events, summary) = run(&a, &b, search(2));
        assert_eq!(
            events,
            vec![
                CompareEvent::OutOfOrder {
                    file: FileId::First,
                    position: 10,
                    other_position: 15,
                    count: 2
                },
                CompareEvent::OutOfOrder {
                    file: FileId::Second,
                    position: 10,
                    other_position: 15,
                    count: 2
                },
            ]
        );
        assert_eq!(summary.stats.out_of_order, 2);
        assert!(summary.files[0].fully_consumed);
    }

    #[test]
    fn test_disjoint_second_run_inside_first_run() {
        // file 2 starts with a copy of packets 13 and 14, which also belong
        // to the longer run of file 1 found further in file 2
        let a = stream(40);
        let mut b = a[..10].to_vec();
        b.extend_from_slice(&a[13..15]);
        b.extend((0..4).map(|i| es_packet(0x400, 500 + i)));
        b.extend_from_slice(&a[10..15]);
        b.push(es_packet(0x400, 600));
        b.extend_from_slice(&a[15..]);

        let mut engine = Reconciler::new(reader(&a), reader(&b), search(2)).unwrap();
        let stats = ReconciliationStats::default();
        let mut events = Vec::new();
        while events.is_empty() && engine.state == State::Comparing {
            engine.state = engine.step(&stats, &mut events);
        }
        assert_eq!(
            events,
            vec![
                CompareEvent::OutOfOrder {
                    file: FileId::First,
                    position: 10,
                    other_position: 16,
                    count: 5
                },
                CompareEvent::OutOfOrder {
                    file: FileId::Second,
                    position: 10,
                    other_position: 13,
                    count: 2
                },
            ]
        );
        // packets 13 and 14 of file 1 were already consumed by the first run
        assert_eq!(engine.first().origin(), 15);
        assert_eq!(engine.second().origin(), 12);
    }

    #[test]
    fn test_summary_counts_packets_read() {
        let a = stream(30);
        let mut b = a.clone();
        b[5].as_bytes_mut()[50] ^= 0xFF;

        // stops at packet 5 but the whole files sit in the lookahead window
        let (_, summary) = run(&a, &b, CompareOptions::default());
        assert_eq!(summary.files[0].packets, 30);
        assert_eq!(summary.files[1].packets, 30);
        assert!(!summary.files[0].fully_consumed);
    }

    #[test]
    fn test_truncation() {
        let a = stream(25);
        let b = a[..18].to_vec();
        for options in all_modes() {
            let (events, summary) = run(&a, &b, options);
            assert_eq!(
                events,
                vec![CompareEvent::Truncated {
                    file: FileId::Second,
                    position: 18
                }]
            );
            assert_eq!(summary.stats.differences, 0);
            assert!(summary.files[1].fully_consumed);
            assert!(!summary.files[0].fully_consumed);
        }
    }

    #[test]
    fn test_first_file_truncated() {
        let b = stream(10);
        let a = b[..4].to_vec();
        let (events, _) = run(&a, &b, CompareOptions::default());
        assert_eq!(
            events,
            vec![CompareEvent::Truncated {
                file: FileId::First,
                position: 4
            }]
        );
    }

    #[test]
    fn test_null_packet_never_tolerant_equal() {
        let a_null = Packet::null();
        let mut b_other = a_null;
        b_other.set_pid(0x100);

        let mut a = stream(30);
        let mut b = a.clone();
        a[12] = a_null;
        b[12] = b_other;

        let mask = FieldMask {
            pid_ignore: true,
            ..Default::default()
        };
        let lock_step = CompareOptions {
            mask,
            continue_all: true,
            ..Default::default()
        };
        let (events, _) = run(&a, &b, lock_step);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], CompareEvent::Difference { position_1: 12, .. }));

        let tolerant = CompareOptions {
            mask,
            threshold_diff: 4,
            ..search(7)
        };
        let (events, _) = run(&a, &b, tolerant);
        assert_eq!(
            events,
            vec![
                CompareEvent::Skipped {
                    missing_in: FileId::Second,
                    position: 12,
                    count: 1
                },
                CompareEvent::Skipped {
                    missing_in: FileId::First,
                    position: 12,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_subset_mode_reads_ahead_first_file() {
        let a = stream(30);
        let mut b = a.clone();
        b.drain(5..8);
        b.remove(20);

        let options = CompareOptions {
            subset: true,
            ..Default::default()
        };
        let (events, summary) = run(&a, &b, options);
        assert_eq!(
            events,
            vec![
                CompareEvent::Skipped {
                    missing_in: FileId::Second,
                    position: 5,
                    count: 3
                },
                CompareEvent::Skipped {
                    missing_in: FileId::Second,
                    position: 23,
                    count: 1
                },
            ]
        );
        assert_eq!(summary.files[0].missing_packets, 4);
        assert_eq!(summary.files[0].missing_chunks, 2);
        assert!(summary.files[0].fully_consumed);
        assert!(summary.files[1].fully_consumed);
    }

    #[test]
    fn test_subset_difference_within_threshold() {
        let a = stream(10);
        let mut b = a.clone();
        b[4].as_bytes_mut()[TS_PACKET_SIZE - 1] ^= 0x01;

        let options = CompareOptions {
            subset: true,
            threshold_diff: 2,
            ..Default::default()
        };
        let (events, summary) = run(&a, &b, options);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            CompareEvent::Difference { position_1: 4, position_2: 4, .. }
        ));
        assert_eq!(summary.stats.skipped, 0);
    }

    #[test]
    fn test_loss_near_window_boundary() {
        // capacity smaller than the stream forces refills during the search
        let a = stream(120);
        let mut b = a.clone();
        b.drain(30..34);
        let options = CompareOptions {
            buffered_packets: 16,
            min_reorder: 4,
            search_reorder: true,
            ..Default::default()
        };
        let (events, summary) = run(&a, &b, options);
        assert_eq!(
            events,
            vec![CompareEvent::Skipped {
                missing_in: FileId::Second,
                position: 30,
                count: 4
            }]
        );
        assert!(summary.files[0].fully_consumed);
        assert!(summary.files[1].fully_consumed);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let packets = stream(2);
        let options = CompareOptions {
            threshold_diff: TS_PACKET_SIZE + 1,
            ..Default::default()
        };
        assert!(matches!(
            Reconciler::new(reader(&packets), reader(&packets), options),
            Err(ConfigError::ThresholdTooLarge(_))
        ));
    }

    #[test]
    fn test_step_by_step() {
        let a = stream(3);
        let b = stream(2);
        let mut engine = Reconciler::new(reader(&a), reader(&b), CompareOptions::default()).unwrap();
        let mut stats = ReconciliationStats::default();
        let mut events = Vec::new();
        let mut states = Vec::new();
        loop {
            let state = engine.step(&stats, &mut events);
            for e in events.drain(..) {
                stats = stats.record(&e);
            }
            engine.state = state;
            states.push(state);
            if state == State::Done {
                break;
            }
        }
        assert_eq!(
            states,
            vec![State::Comparing, State::Comparing, State::Exhausted, State::Done]
        );
        assert_eq!(stats.truncated, 1);
    }
}
