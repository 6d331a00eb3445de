//! tscmp - MPEG transport stream file comparison
//!
//! Command line front-end of [`tscmp_core`]: argument parsing,
//! configuration file, input files and report rendering.

pub mod config;
pub mod context;
pub mod input;
pub mod report;

pub use context::{Cli, OutputFormat};
pub use report::Reporter;
