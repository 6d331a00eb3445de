use std::error::Error;
use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use tscmp::config::{load_config, locate_config, ConfigFile};
use tscmp::input::open_inputs;
use tscmp::{Cli, Reporter};
use tscmp_core::{PacketReader, Reconciler};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = locate_config(cli.config.as_deref());
    let file_config = match &config_path {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("tscmp: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ConfigFile::default(),
    };

    init_logger(&cli, file_config.logging.level.as_deref());
    if let Some(path) = &config_path {
        debug!("Loaded config from: {}", path.display());
    }

    match run(&cli, file_config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("tscmp: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins, then the command line, then the configuration file.
fn init_logger(cli: &Cli, configured: Option<&str>) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        configured.unwrap_or("warn")
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn progress_bar(len: Option<u64>) -> ProgressBar {
    let Some(len) = len else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})")
        {
            pb.set_style(style);
        }
        return pb;
    };
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn run(cli: &Cli, file_config: ConfigFile) -> Result<bool, Box<dyn Error>> {
    let options = cli.compare_options(file_config.compare);
    options.validate()?;
    let format = cli.output_format(file_config.report.format);

    let [first, second] = open_inputs(&cli.file1, &cli.file2, cli.start_offset())?;
    info!(
        "Comparing {} and {} from byte {}",
        first.name,
        second.name,
        cli.start_offset()
    );

    let progress = (cli.progress && !cli.quiet).then(|| progress_bar(first.len));
    let first_reader: Box<dyn Read> = match &progress {
        Some(pb) => Box::new(pb.wrap_read(first.reader)),
        None => first.reader,
    };
    let engine = Reconciler::new(
        PacketReader::new(first_reader, first.name.as_str()),
        PacketReader::new(second.reader, second.name.as_str()),
        options.clone(),
    )?;

    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let mut reporter = (!cli.quiet).then(|| {
        Reporter::new(stdout.lock(), format, [first.name, second.name])
            .verbose(cli.verbose)
            .dump(cli.dump)
            .payload_only(options.mask.payload_only)
            .color(color)
    });

    if let Some(reporter) = reporter.as_mut() {
        reporter.header()?;
    }
    let mut write_error: Option<io::Error> = None;
    let summary = engine.run(|event| {
        if write_error.is_some() {
            return;
        }
        if let Some(reporter) = reporter.as_mut() {
            if let Err(e) = reporter.event(event) {
                write_error = Some(e);
            }
        }
    });
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    if let Some(e) = write_error {
        return Err(e.into());
    }
    if let Some(reporter) = reporter.as_mut() {
        reporter.summary(&summary)?;
    }

    // any event, or a file left unread, fails the comparison
    Ok(summary.is_identical())
}
