use std::path::PathBuf;

use clap::Parser;
use clap_num::{maybe_hex, number_range};
use serde::Deserialize;

use tscmp_core::{CompareOptions, TS_PACKET_SIZE};

#[derive(Debug, Parser)]
#[clap(name = "tscmp")]
#[clap(about = "tscmp compares two MPEG transport stream files.", long_about = None)]
#[clap(author = "maleicacid")]
#[clap(version)]
pub struct Cli {
    /// The first file.{n}
    /// If '-' is specified, the file is read from stdin.
    #[clap(value_name = "FILE1", required = true)]
    pub file1: String,

    /// The second file.{n}
    /// If '-' is specified, the file is read from stdin.
    #[clap(value_name = "FILE2", required = true)]
    pub file2: String,

    /// Input buffer size of each file, in TS packets.{n}
    /// This is also the lookahead used to find lost or reordered packets.
    /// The default is 10000 packets.
    #[clap(long, value_name = "COUNT")]
    pub buffered_packets: Option<usize>,

    /// Start reading the files at the specified byte offset (default: 0).{n}
    /// The offset may be given in hexadecimal with a '0x' prefix.
    #[clap(short, long, value_parser = maybe_hex::<u64>, conflicts_with = "packet_offset")]
    pub byte_offset: Option<u64>,

    /// Start reading the files at the specified TS packet (default: 0).
    #[clap(short, long)]
    pub packet_offset: Option<u64>,

    /// Ignore continuity counters when comparing packets.{n}
    /// Useful if one file has been resynchronized.
    #[clap(long)]
    pub cc_ignore: bool,

    /// Ignore PCR and OPCR when comparing packets.{n}
    /// Useful if one file has been resynchronized.
    #[clap(long)]
    pub pcr_ignore: bool,

    /// Ignore PID value when comparing packets.{n}
    /// Useful if one file has gone through a remapping process.
    #[clap(long)]
    pub pid_ignore: bool,

    /// Compare only the payload of the packets, ignore header and adaptation field.
    #[clap(long)]
    pub payload_only: bool,

    /// Continue the comparison up to the end of files.{n}
    /// By default, stop after the first differing packet.
    #[clap(short = 'c', long = "continue")]
    pub continue_all: bool,

    /// Dump the content of all differing packets.
    #[clap(short, long)]
    pub dump: bool,

    /// Report in a normalized output format (useful for automatic analysis).{n}
    /// Same as '--format normalized'.
    #[clap(short, long)]
    pub normalized: bool,

    /// Output format.
    #[clap(value_enum, long)]
    pub format: Option<OutputFormat>,

    /// Do not output any message.{n}
    /// The process simply terminates with a success status if the files
    /// are identical and a failure status if they differ.
    #[clap(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Produce verbose messages.
    #[clap(short, long)]
    pub verbose: bool,

    /// The second file is a subset of the first one.{n}
    /// The second file is expected to be identical to the first one, except
    /// that some packets may be missing. When a difference is found, the
    /// first file is read ahead until a matching packet is found.{n}
    /// See also --threshold-diff.
    #[clap(short, long)]
    pub subset: bool,

    /// Search missing, extra and reordered packets in both files.{n}
    /// When two packets differ, both lookahead buffers are searched for a
    /// run of matching packets to resynchronize the files.
    /// Takes precedence over --subset.
    #[clap(short = 'r', long)]
    pub search_reorder: bool,

    /// Minimum number of consecutive matching packets accepted as a
    /// resynchronization point with --search-reorder (default: 7).
    #[clap(long, value_name = "COUNT")]
    pub min_reorder: Option<usize>,

    /// Maximum number of differing bytes in packets to declare them equal.{n}
    /// Used with --subset and --search-reorder. The default is zero, which
    /// means that two packets must be strictly identical.
    #[clap(short, long, value_parser = parse_threshold)]
    pub threshold_diff: Option<usize>,

    /// Show a progress bar on stderr.
    #[clap(long)]
    pub progress: bool,

    /// Configuration file path.{n}
    /// If not specified, 'tscmp.toml' is used when it exists in the
    /// current directory.
    #[clap(short = 'f', long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Output format of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable messages
    #[default]
    Human,
    /// One colon-separated record per line
    Normalized,
    /// One JSON object per line
    Json,
}

fn parse_threshold(s: &str) -> Result<usize, String> {
    number_range(s, 0, TS_PACKET_SIZE)
}

impl Cli {
    /// Byte offset where both files start.
    pub fn start_offset(&self) -> u64 {
        match (self.byte_offset, self.packet_offset) {
            (Some(bytes), _) => bytes,
            (None, Some(packets)) => packets * TS_PACKET_SIZE as u64,
            (None, None) => 0,
        }
    }

    /// Report format, from the command line first then from `configured`.
    pub fn output_format(&self, configured: Option<OutputFormat>) -> OutputFormat {
        if self.normalized {
            return OutputFormat::Normalized;
        }
        self.format.or(configured).unwrap_or_default()
    }

    /// Overlay the command line on top of `base`.
    pub fn compare_options(&self, base: CompareOptions) -> CompareOptions {
        let mut options = base;
        if let Some(buffered_packets) = self.buffered_packets {
            options.buffered_packets = buffered_packets;
        }
        if let Some(min_reorder) = self.min_reorder {
            options.min_reorder = min_reorder;
        }
        if let Some(threshold_diff) = self.threshold_diff {
            options.threshold_diff = threshold_diff;
        }
        options.search_reorder |= self.search_reorder;
        options.subset |= self.subset;
        options.continue_all |= self.continue_all;
        options.mask.payload_only |= self.payload_only;
        options.mask.pcr_ignore |= self.pcr_ignore;
        options.mask.pid_ignore |= self.pid_ignore;
        options.mask.cc_ignore |= self.cc_ignore;

        if self.quiet {
            // only the exit status matters
            options.continue_all = false;
        }
        options
    }
}
