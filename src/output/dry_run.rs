//! Dry-run listing: the files a run would process, without their content.

use super::{humanize_size, stream_error, total_size};
use crate::errors::Result;
use crate::pipeline::PipelineValue;
use std::io::Write;

/// Writes the would-be file list. Sizes are shown when `--show-size` is
/// set; the footer always carries the total.
pub fn write_dry_run(value: &PipelineValue, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "Files that would be processed ({}):", value.files.len())
        .map_err(stream_error)?;
    for record in &value.files {
        if value.options.render.show_size {
            writeln!(writer, "  {} ({})", record.path, humanize_size(record.size))
                .map_err(stream_error)?;
        } else {
            writeln!(writer, "  {}", record.path).map_err(stream_error)?;
        }
    }
    writeln!(
        writer,
        "Total: {} file(s), {}",
        value.files.len(),
        humanize_size(total_size(value))
    )
    .map_err(stream_error)?;
    writer.flush().map_err(stream_error)
}
