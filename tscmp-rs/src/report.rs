//! Rendering of comparison events.

use std::fmt::Write as _;
use std::io::{self, Write};

use colored::Colorize;
use serde::Serialize;
use serde_json::json;

use tscmp_core::{CompareEvent, CompareSummary, FileId, Packet};

use crate::context::OutputFormat;

/// Indentation of dumped packets.
const DUMP_INDENT: usize = 6;

/// Writes the report of one comparison to `out`.
pub struct Reporter<W> {
    out: W,
    format: OutputFormat,
    names: [String; 2],
    verbose: bool,
    dump: bool,
    payload_only: bool,
    color: bool,
}

#[derive(Serialize)]
struct SummaryRecord<'a> {
    kind: &'static str,
    #[serde(flatten)]
    summary: &'a CompareSummary,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat, names: [String; 2]) -> Self {
        Self {
            out,
            format,
            names,
            verbose: false,
            dump: false,
            payload_only: false,
            color: false,
        }
    }

    /// Print the header and the final totals in human format.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Dump differing packets in human format.
    pub fn dump(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }

    /// Offsets are relative to the payload.
    pub fn payload_only(mut self, payload_only: bool) -> Self {
        self.payload_only = payload_only;
        self
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn name(&self, file: FileId) -> &str {
        &self.names[file.index()]
    }

    pub fn header(&mut self) -> io::Result<()> {
        match self.format {
            OutputFormat::Human => {
                if self.verbose {
                    writeln!(self.out, "* Comparing {} and {}", self.names[0], self.names[1])?;
                }
            }
            OutputFormat::Normalized => {
                writeln!(self.out, "file:file=1:filename={}:", self.names[0])?;
                writeln!(self.out, "file:file=2:filename={}:", self.names[1])?;
            }
            OutputFormat::Json => {
                let record = json!({
                    "kind": "files",
                    "file_1": self.names[0],
                    "file_2": self.names[1],
                });
                writeln!(self.out, "{}", record)?;
            }
        }
        Ok(())
    }

    pub fn event(&mut self, event: &CompareEvent) -> io::Result<()> {
        match self.format {
            OutputFormat::Human => {
                let line = self.human_line(event);
                if self.color {
                    let painted = match event {
                        CompareEvent::Difference { .. } => line.red(),
                        CompareEvent::OutOfOrder { .. } => line.cyan(),
                        CompareEvent::Skipped { .. } => line.yellow(),
                        CompareEvent::Truncated { .. } => line.magenta(),
                    };
                    writeln!(self.out, "{}", painted)?;
                } else {
                    writeln!(self.out, "{}", line)?;
                }
                if self.dump {
                    if let CompareEvent::Difference { .. } = event {
                        let dump = self.dump_difference(event);
                        self.out.write_all(dump.as_bytes())?;
                    }
                }
            }
            OutputFormat::Normalized => {
                let line = self.normalized_line(event);
                writeln!(self.out, "{}", line)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, event)?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    pub fn summary(&mut self, summary: &CompareSummary) -> io::Result<()> {
        let stats = &summary.stats;
        let differences = stats.differences + stats.truncated;
        let missing: u64 = summary.files.iter().map(|f| f.missing_packets).sum();
        let holes: u64 = summary.files.iter().map(|f| f.missing_chunks).sum();

        match self.format {
            OutputFormat::Human => {
                if !self.verbose {
                    return Ok(());
                }
                let mut line = format!(
                    "* Read {} packets, found {} differences",
                    decimal(summary.files[0].packets),
                    decimal(differences)
                );
                if holes > 0 {
                    let _ = write!(
                        line,
                        ", missing {} packets in {} holes",
                        decimal(missing),
                        decimal(holes)
                    );
                }
                if stats.out_of_order > 0 {
                    let _ = write!(line, ", {} reordered runs", decimal(stats.out_of_order));
                }
                if self.color {
                    writeln!(self.out, "{}", line.bold())?;
                } else {
                    writeln!(self.out, "{}", line)?;
                }
            }
            OutputFormat::Normalized => {
                writeln!(
                    self.out,
                    "total:packets={}:diff={}:missing={}:holes={}:reordered={}:",
                    summary.files[0].packets, differences, missing, holes, stats.out_of_order
                )?;
            }
            OutputFormat::Json => {
                let record = SummaryRecord {
                    kind: "summary",
                    summary,
                };
                serde_json::to_writer(&mut self.out, &record)?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()
    }

    fn human_line(&self, event: &CompareEvent) -> String {
        match event {
            CompareEvent::Difference {
                position_1,
                position_2,
                pid_1,
                pid_2,
                index_in_pid_1,
                index_in_pid_2,
                comparison,
                ..
            } => {
                let mut line = format!("* Packet {}", decimal(*position_1));
                if position_2 != position_1 {
                    let _ = write!(line, "/{}", decimal(*position_2));
                }
                let _ = write!(line, " differ at offset {}", comparison.first_diff);
                if self.payload_only {
                    line.push_str(" in payload");
                }
                let _ = write!(line, ", {}", comparison.diff_count);
                if comparison.diff_count != comparison.diff_span() {
                    let _ = write!(line, "/{}", comparison.diff_span());
                }
                let _ = write!(line, " bytes differ, PID {}", pid_1);
                if pid_2 != pid_1 {
                    let _ = write!(line, "/{}", pid_2);
                }
                let _ = write!(line, ", packet {}", decimal(*index_in_pid_1));
                if pid_2 != pid_1 || index_in_pid_2 != index_in_pid_1 {
                    let _ = write!(line, "/{}", decimal(*index_in_pid_2));
                }
                line.push_str(" in PID");
                line
            }
            CompareEvent::OutOfOrder {
                file,
                position,
                other_position,
                count,
            } => {
                let packets = if *count == 1 {
                    format!("Packet {}", decimal(*position))
                } else {
                    format!(
                        "Packets {}-{}",
                        decimal(*position),
                        decimal(*position + *count as u64 - 1)
                    )
                };
                format!(
                    "* {} of {} found at packet {} of {}",
                    packets,
                    self.name(*file),
                    decimal(*other_position),
                    self.name(file.other())
                )
            }
            CompareEvent::Skipped {
                missing_in,
                position,
                count,
            } => format!(
                "* Packet {}, missing {} packets in {}",
                decimal(*position),
                decimal(*count),
                self.name(*missing_in)
            ),
            CompareEvent::Truncated { file, position } => format!(
                "* Packet {}: file {} is truncated",
                decimal(*position),
                self.name(*file)
            ),
        }
    }

    fn normalized_line(&self, event: &CompareEvent) -> String {
        match event {
            CompareEvent::Difference {
                position_1,
                position_2,
                pid_1,
                pid_2,
                index_in_pid_1,
                index_in_pid_2,
                comparison,
                ..
            } => {
                let mut line = format!("diff:packet={}:packet2={}", position_1, position_2);
                if self.payload_only {
                    line.push_str(":payload");
                }
                let _ = write!(
                    line,
                    ":offset={}:endoffset={}:diffbytes={}:compsize={}:pid1={}:pid2={}",
                    comparison.first_diff,
                    comparison.end_diff,
                    comparison.diff_count,
                    comparison.compared_size,
                    pid_1,
                    pid_2
                );
                if pid_1 == pid_2 {
                    line.push_str(":samepid");
                }
                let _ = write!(line, ":pid1index={}:pid2index={}", index_in_pid_1, index_in_pid_2);
                if index_in_pid_1 == index_in_pid_2 {
                    line.push_str(":sameindex");
                }
                line.push(':');
                line
            }
            CompareEvent::OutOfOrder {
                file,
                position,
                other_position,
                count,
            } => format!(
                "reorder:file={}:packet={}:count={}:otherpacket={}:",
                file, position, count, other_position
            ),
            CompareEvent::Skipped {
                missing_in,
                position,
                count,
            } => format!(
                "skip:packet={}:skipped={}:missingin={}:",
                position, count, missing_in
            ),
            CompareEvent::Truncated { file, position } => format!(
                "truncated:file={}:packet={}:filename={}:",
                file,
                position,
                self.name(*file)
            ),
        }
    }

    fn dump_difference(&self, event: &CompareEvent) -> String {
        let CompareEvent::Difference {
            comparison,
            packets,
            ..
        } = event
        else {
            return String::new();
        };

        let mut out = String::new();
        for (name, packet) in self.names.iter().zip(packets.iter()) {
            let _ = writeln!(out, "  Packet from {}:", name);
            out.push_str(&describe_packet(packet, DUMP_INDENT));
        }
        for (name, packet) in self.names.iter().zip(packets.iter()) {
            let base = if self.payload_only {
                packet.header_size()
            } else {
                0
            };
            let bytes = packet.as_bytes();
            let start = (base + comparison.first_diff).min(bytes.len());
            let end = (base + comparison.end_diff).min(bytes.len());
            let _ = writeln!(out, "  Differing area from {}:", name);
            out.push_str(&hexa(&bytes[start..end], DUMP_INDENT));
        }
        out
    }
}

/// Decimal number with thousands separators.
pub fn decimal(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Hexadecimal and ASCII dump, 16 bytes per line.
pub fn hexa(data: &[u8], indent: usize) -> String {
    let mut out = String::new();
    for (row, chunk) in data.chunks(16).enumerate() {
        let _ = write!(out, "{:indent$}{:04X}:  ", "", row * 16, indent = indent);
        for i in 0..16 {
            match chunk.get(i) {
                Some(byte) => {
                    let _ = write!(out, "{:02X} ", byte);
                }
                None => out.push_str("   "),
            }
        }
        out.push(' ');
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}

/// Decoded TS header followed by a raw dump of the whole packet.
pub fn describe_packet(packet: &Packet, indent: usize) -> String {
    let header = packet.header();
    let pad = " ".repeat(indent);
    let mut out = String::new();
    let _ = writeln!(out, "{}---- TS Header ----", pad);
    let _ = writeln!(
        out,
        "{}PID: 0x{:04X} ({}), header size: {}, sync: 0x{:02X}",
        pad,
        header.pid,
        header.pid,
        packet.header_size(),
        packet.as_bytes()[0]
    );
    let _ = writeln!(
        out,
        "{}Error: {}, unit start: {}, priority: {}",
        pad,
        header.transport_error as u8,
        header.payload_unit_start as u8,
        header.transport_priority as u8
    );
    let _ = writeln!(
        out,
        "{}Scrambling: {}, continuity counter: {}",
        pad, header.scrambling_control, header.continuity_counter
    );
    let af_len = packet.adaptation_field().map_or(0, |af| af.length);
    let _ = writeln!(
        out,
        "{}Adaptation field: {} ({} bytes), payload: {} ({} bytes)",
        pad,
        yes_no(header.has_adaptation_field()),
        af_len,
        yes_no(header.has_payload()),
        packet.payload().len()
    );
    if let Some(pcr) = packet.pcr() {
        let _ = writeln!(out, "{}PCR: 0x{:011X}", pad, pcr);
    }
    if let Some(opcr) = packet.opcr() {
        let _ = writeln!(out, "{}OPCR: 0x{:011X}", pad, opcr);
    }
    let _ = writeln!(out, "{}---- TS Packet Content ----", pad);
    out.push_str(&hexa(packet.as_bytes(), indent));
    out
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
