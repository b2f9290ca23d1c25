//! Command-line argument definitions for the Tessera CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the document, its descriptors, how it is
//! read, where the rewritten document goes and how verbose logging is.

use clap::Parser;
use log::LevelFilter;

/// Command-line arguments for the Tessera mapper
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input document
    #[arg(help = "Path to the input file")]
    pub input: String,

    /// Descriptor files, added to the ones listed in the configuration
    #[arg(short, long = "schema")]
    pub schemas: Vec<String>,

    /// Qualified name the root element's type must be
    #[arg(short, long)]
    pub root: Option<String>,

    /// Keep references to ids outside the document unresolved
    #[arg(long, requires = "root")]
    pub fragment: bool,

    /// Fail on content the descriptors do not describe
    #[arg(long)]
    pub strict: bool,

    /// Path to the output document
    #[arg(short, long, default_value = "out.xml")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}
