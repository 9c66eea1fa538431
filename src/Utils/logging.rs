//! Terminal and file logging through `simplelog`.
use crate::VoF::errors::VoFError;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;
use std::path::Path;

/// Installs the global logger: terminal output at `level` and, if `log_file` is given, the same
/// records written to that file.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), VoFError> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        loggers.push(WriteLogger::new(level, Config::default(), File::create(path)?));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}
