//! Terminal logger plus an optional copy of the log in a file.
//! The library itself only writes through the `log` macros; binaries and examples decide where the records go.
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("cannot create log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("logger already set: {0}")]
    SetLogger(#[from] log::SetLoggerError),
}

/// installs the global logger; can succeed only once per process
pub fn init_logger(level: LevelFilter, log_file: Option<&str>) -> Result<(), LoggerError> {
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
