//! In-memory display for live morph preview.

use tracing::debug;

use meshmorph_core::frame::FrameBuffer;
use meshmorph_core::sink::{FrameSink, MorphFrame, MorphOutcome};
use meshmorph_core::MorphResult;

/// Shows each frame as it arrives and goes back to the unmodified start
/// image once the morph ends, however it ends.
#[derive(Debug, Default)]
pub struct PreviewDisplay {
    showing: Option<FrameBuffer>,
    last_frame: Option<FrameBuffer>,
    presented: u32,
    last_outcome: Option<MorphOutcome>,
}

impl PreviewDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the display currently shows.
    pub fn showing(&self) -> Option<&FrameBuffer> {
        self.showing.as_ref()
    }

    /// The last morph frame shown before the display was restored.
    pub fn last_frame(&self) -> Option<&FrameBuffer> {
        self.last_frame.as_ref()
    }

    pub fn presented(&self) -> u32 {
        self.presented
    }

    pub fn last_outcome(&self) -> Option<MorphOutcome> {
        self.last_outcome
    }
}

impl FrameSink for PreviewDisplay {
    fn present(&mut self, frame: &MorphFrame<'_>) -> MorphResult<()> {
        self.showing = Some(frame.buffer.clone());
        self.presented += 1;
        Ok(())
    }

    fn finish(&mut self, outcome: MorphOutcome, start_image: &FrameBuffer) -> MorphResult<()> {
        debug!(?outcome, frames = self.presented, "restoring preview display");
        self.last_frame = self.showing.replace(start_image.clone());
        self.last_outcome = Some(outcome);
        Ok(())
    }
}
