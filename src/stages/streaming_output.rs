//! Streaming formatting stage: header, per-file chunks with flushes, and
//! the closing footer, written straight to the destination.

use crate::config::OutputDestination;
use crate::errors::Result;
use crate::output::{formatter_for, writer::setup_writer};
use crate::pipeline::{PipelineValue, Stage, StageContext};
use log::debug;

/// Streams the document instead of assembling it in memory. The value's
/// `output` stays empty; by the time this stage returns, the bytes are at
/// the destination.
pub struct StreamingOutput;

impl Stage for StreamingOutput {
    fn name(&self) -> &'static str {
        "streaming-output"
    }

    fn process(&self, value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
        let formatter = formatter_for(value.options.render.format);
        // Stream destination is stdout unless a file was configured.
        let destination = match &value.options.render.destination {
            OutputDestination::File(path) => OutputDestination::File(path.clone()),
            _ => OutputDestination::Stream,
        };
        let mut writer = setup_writer(&destination)?;
        formatter.stream(value, writer.as_mut())?;
        debug!("streamed {} file(s)", value.files.len());
        Ok(())
    }
}
