//! Command-line interface for procspec
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions (clap)
//! - `report`: JSON report printed on stdout
//! - `run`: Main entry point

pub mod args;
pub mod report;
mod run;

pub use args::Cli;
pub use report::{AttributesReport, LaunchReport};
pub use run::{apply_overrides, run};
