//! Output destination management (stdout or file).

use crate::config::OutputDestination;
use crate::errors::{io_error_with_path, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Creates the writer for the configured destination. Streaming mode
/// writes to stdout like the default, but the caller flushes per file.
pub fn setup_writer(destination: &OutputDestination) -> Result<Box<dyn Write + Send>> {
    match destination {
        OutputDestination::Stdout | OutputDestination::Stream => Ok(Box::new(io::stdout())),
        OutputDestination::File(path) => {
            let file = File::create(path).map_err(|e| io_error_with_path(e, path))?;
            Ok(Box::new(BufWriter::new(file)))
        }
    }
}
