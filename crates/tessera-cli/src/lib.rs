//! Library half of the `tessera` binary.
//!
//! [`run`] loads the descriptors, reads the input document and writes it back
//! out. Warnings from a lenient read are logged with their snippets.

pub mod report;

mod args;
mod config;

pub use args::Args;

use std::{fs, path::PathBuf};

use log::{info, warn};

use tessera::{
    Document, Mapper, TesseraError,
    config::{MapperConfig, ReadConfig},
};

use config::ConfigError;

/// Run the Tessera CLI application
///
/// This function loads the descriptors, reads the input document against
/// them and writes the document back out.
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `TesseraError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Descriptor errors
/// - Read errors, dangling references included
/// - Write errors
pub fn run(args: &Args) -> Result<(), TesseraError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing document"
    );

    let cli_config = config::load_config(args.config.as_ref())?;

    let schemas: Vec<PathBuf> = args
        .schemas
        .iter()
        .map(PathBuf::from)
        .chain(cli_config.schemas().iter().cloned())
        .collect();
    if schemas.is_empty() {
        return Err(ConfigError::Validation("no descriptor files given".to_string()).into());
    }

    let mapper_config = cli_config.mapper();
    let strict = args.strict || mapper_config.read().strict();
    let mapper_config = MapperConfig::new(ReadConfig::new(strict), mapper_config.write().clone());

    let mapper = Mapper::from_files(&schemas, mapper_config)?;

    let source = fs::read_to_string(&args.input)?;
    let document = match (args.fragment, args.root.as_deref()) {
        (true, Some(root)) => mapper.read_fragment(&source, root)?,
        (true, None) => {
            return Err(ConfigError::Validation("a fragment read needs --root".to_string()).into());
        }
        (false, root) => mapper.read(&source, root)?,
    };
    report_warnings(&document, &source);

    let xml = mapper.write(document.root())?;
    fs::write(&args.output, xml)?;

    info!(output_file = args.output; "Document written successfully");

    Ok(())
}

fn report_warnings(document: &Document, source: &str) {
    for warning in report::warnings(document.warnings(), source) {
        warn!("{}", report::render(&warning));
    }
}
