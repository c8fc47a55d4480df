//! Manual export.
//!
//! Renders a [`GeneratedManual`] together with its referenced frames to a
//! self-contained Markdown document with inline base64 images. A step whose
//! `frame_index` is out of range keeps its text but renders no image.

use std::{fs, path::Path};

use crate::{
    error::PipelineError,
    manual::GeneratedManual,
    sampler::{FRAME_MIME_TYPE, SampledFrame},
};

/// Render a manual to a Markdown string with inline images.
pub fn manual_to_markdown(manual: &GeneratedManual, frames: &[SampledFrame]) -> String {
    let mut document = String::new();

    document.push_str(&format!("# {}\n\n", manual.title));
    document.push_str(&format!("**概要:** {}\n\n", manual.overview));

    for (number, step) in manual.steps.iter().enumerate() {
        document.push_str(&format!("## 手順 {}: {}\n\n", number + 1, step.title));

        if let Some(frame) = frames.get(step.frame_index) {
            document.push_str(&format!(
                "![手順 {} のスクリーンショット](data:{};base64,{})\n\n",
                number + 1,
                FRAME_MIME_TYPE,
                frame.to_base64(),
            ));
        } else {
            log::warn!(
                "step '{}' references frame {} outside the sampled range, omitting image",
                step.title,
                step.frame_index,
            );
        }

        document.push_str(&format!("{}\n\n", step.description));
    }

    document
}

/// Render a manual to Markdown and write it to `path`.
pub fn save_markdown<P: AsRef<Path>>(
    path: P,
    manual: &GeneratedManual,
    frames: &[SampledFrame],
) -> Result<(), PipelineError> {
    fs::write(path, manual_to_markdown(manual, frames))?;
    Ok(())
}
