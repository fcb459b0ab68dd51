//! Numbered JPEG still export.
//!
//! Frames are flattened onto an opaque background and written as
//! `image-1.jpg`, `image-2.jpg`, ... into one directory. The counter
//! starts at 1 and goes back to 1 whenever a morph finishes.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use tracing::{debug, info};

use meshmorph_core::frame::FrameBuffer;
use meshmorph_core::sink::{FrameSink, MorphFrame, MorphOutcome};
use meshmorph_core::{Color, MorphError, MorphResult};

/// Writes each presented frame as the next numbered JPEG file.
#[derive(Debug)]
pub struct JpegSequenceWriter {
    dir: PathBuf,
    quality: u8,
    background: Color,
    next_index: u32,
    written: Vec<PathBuf>,
}

impl JpegSequenceWriter {
    /// Create a writer for `dir`, creating the directory if needed.
    pub fn new(dir: &Path, quality: u8, background: Color) -> MorphResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            quality: quality.clamp(1, 100),
            background,
            next_index: 1,
            written: Vec::new(),
        })
    }

    /// Path of the `n`-th still (1-based).
    pub fn frame_path(&self, n: u32) -> PathBuf {
        self.dir.join(format!("image-{}.jpg", n))
    }

    /// Number the next frame will be written under.
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Every file written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Flatten and encode one frame, then advance the counter.
    pub fn write_frame(&mut self, frame: &FrameBuffer) -> MorphResult<PathBuf> {
        let path = self.frame_path(self.next_index);
        let flat = frame.flatten(&self.background);

        let file = File::create(&path).map_err(|e| {
            MorphError::Encode(format!("failed to create '{}': {}", path.display(), e))
        })?;
        let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), self.quality);
        encoder
            .encode(&flat.data, flat.width, flat.height, ExtendedColorType::Rgb8)
            .map_err(|e| MorphError::Encode(format!("failed to encode '{}': {}", path.display(), e)))?;

        debug!(path = %path.display(), "wrote frame");
        self.next_index += 1;
        self.written.push(path.clone());
        Ok(path)
    }
}

impl FrameSink for JpegSequenceWriter {
    fn present(&mut self, frame: &MorphFrame<'_>) -> MorphResult<()> {
        self.write_frame(frame.buffer).map(|_| ())
    }

    fn finish(&mut self, outcome: MorphOutcome, _start_image: &FrameBuffer) -> MorphResult<()> {
        info!(
            ?outcome,
            frames = self.next_index - 1,
            dir = %self.dir.display(),
            "frame export finished"
        );
        self.next_index = 1;
        Ok(())
    }
}
