//! Destinations for composited morph frames.
//!
//! The timeline hands every frame to a [`FrameSink`] before the tick is
//! considered finished, then calls [`FrameSink::finish`] exactly once when
//! the morph completes or is cancelled. Preview displays, still-image
//! exporters and test collectors all sit behind this trait.

use tracing::warn;

use crate::error::MorphResult;
use crate::frame::FrameBuffer;
use crate::hash::{ContentHash, SequenceHasher};
use crate::lattice::Lattice;

/// One composited frame as produced by the timeline.
#[derive(Debug, Clone, Copy)]
pub struct MorphFrame<'a> {
    /// 1-based frame number.
    pub index: u32,
    /// Frames in the whole morph.
    pub total: u32,
    /// Interpolation time the frame was rendered at.
    pub t: f64,
    pub buffer: &'a FrameBuffer,
    /// Interpolated lattice the frame was warped to.
    pub lattice: &'a Lattice,
}

/// How a morph ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphOutcome {
    Completed,
    Cancelled,
}

pub trait FrameSink {
    /// Consume one frame. An error aborts the morph.
    fn present(&mut self, frame: &MorphFrame<'_>) -> MorphResult<()>;

    /// Called once after the last frame or on cancellation. `start_image` is
    /// the unmodified start image, for sinks that restore a display.
    fn finish(&mut self, _outcome: MorphOutcome, _start_image: &FrameBuffer) -> MorphResult<()> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn present(&mut self, frame: &MorphFrame<'_>) -> MorphResult<()> {
        (**self).present(frame)
    }

    fn finish(&mut self, outcome: MorphOutcome, start_image: &FrameBuffer) -> MorphResult<()> {
        (**self).finish(outcome, start_image)
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn present(&mut self, frame: &MorphFrame<'_>) -> MorphResult<()> {
        (**self).present(frame)
    }

    fn finish(&mut self, outcome: MorphOutcome, start_image: &FrameBuffer) -> MorphResult<()> {
        (**self).finish(outcome, start_image)
    }
}

/// Fan out to two sinks, first then second.
///
/// Both sinks are always finished; the first error wins.
impl<A: FrameSink, B: FrameSink> FrameSink for (A, B) {
    fn present(&mut self, frame: &MorphFrame<'_>) -> MorphResult<()> {
        self.0.present(frame)?;
        self.1.present(frame)
    }

    fn finish(&mut self, outcome: MorphOutcome, start_image: &FrameBuffer) -> MorphResult<()> {
        let first = self.0.finish(outcome, start_image);
        let second = self.1.finish(outcome, start_image);
        match (first, second) {
            (Err(e), Err(other)) => {
                warn!(error = %other, "second sink also failed to finish");
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

/// Keeps every frame and its lattice in memory.
#[derive(Debug, Default)]
pub struct FrameCollector {
    pub frames: Vec<FrameBuffer>,
    pub lattices: Vec<Lattice>,
    pub times: Vec<f64>,
    pub outcome: Option<MorphOutcome>,
}

impl FrameCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSink for FrameCollector {
    fn present(&mut self, frame: &MorphFrame<'_>) -> MorphResult<()> {
        self.frames.push(frame.buffer.clone());
        self.lattices.push(frame.lattice.clone());
        self.times.push(frame.t);
        Ok(())
    }

    fn finish(&mut self, outcome: MorphOutcome, _start_image: &FrameBuffer) -> MorphResult<()> {
        self.outcome = Some(outcome);
        Ok(())
    }
}

/// Fingerprints a morph without holding its frames.
#[derive(Default)]
pub struct HashingSink {
    hasher: SequenceHasher,
}

impl HashingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> u64 {
        self.hasher.frame_count()
    }

    pub fn finish_hash(self) -> ContentHash {
        self.hasher.finish()
    }
}

impl FrameSink for HashingSink {
    fn present(&mut self, frame: &MorphFrame<'_>) -> MorphResult<()> {
        self.hasher.update(frame.buffer);
        Ok(())
    }
}
