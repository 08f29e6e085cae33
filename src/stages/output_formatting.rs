//! Batch formatting stage: renders the document into the pipeline value.

use crate::errors::Result;
use crate::output::formatter_for;
use crate::pipeline::{PipelineValue, RenderedOutput, Stage, StageContext};
use log::debug;

/// Renders the final file set with the configured formatter and stores the
/// document (plus its size) on the value for the caller to deliver.
pub struct OutputFormatting;

impl Stage for OutputFormatting {
    fn name(&self) -> &'static str {
        "output-formatting"
    }

    fn process(&self, value: &mut PipelineValue, _ctx: &StageContext) -> Result<()> {
        let format = value.options.render.format;
        let formatter = formatter_for(format);
        let text = formatter.format(value)?;
        debug!("rendered {} bytes of {}", text.len(), format.as_str());
        value.output = Some(RenderedOutput {
            format,
            size: text.len(),
            text,
        });
        Ok(())
    }
}
