use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use meshmorph_core::frame::FrameBuffer;
use meshmorph_core::sink::{FrameSink, MorphFrame, MorphOutcome};
use meshmorph_core::{MorphError, MorphResult};

/// Native APNG (Animated PNG) encoder using the `png` crate.
/// Writes a whole morph as one lossless animation.
pub struct ApngEncoder;

impl ApngEncoder {
    /// Encode a sequence of frame buffers to an Animated PNG (APNG).
    ///
    /// # Arguments
    /// * `frames` - Ordered sequence of frame buffers, all the same size
    /// * `fps` - Frames per second
    /// * `output_path` - Path for the output .png file
    /// * `loop_count` - Number of loops (0 = infinite)
    pub fn encode(
        frames: &[FrameBuffer],
        fps: u32,
        output_path: &Path,
        loop_count: Option<u32>,
    ) -> MorphResult<()> {
        let Some(first) = frames.first() else {
            return Err(MorphError::Encode("no frames to encode for APNG".into()));
        };
        let (width, height) = (first.width, first.height);
        let delay_den = u16::try_from(fps.max(1))
            .map_err(|_| MorphError::Encode(format!("frame rate {} too high for APNG", fps)))?;

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(output_path)
            .map_err(|e| MorphError::Encode(format!("failed to create APNG file: {}", e)))?;

        let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .set_animated(frames.len() as u32, loop_count.unwrap_or(0))
            .map_err(|e| MorphError::Encode(format!("failed to set APNG animation: {}", e)))?;
        encoder
            .set_frame_delay(1, delay_den)
            .map_err(|e| MorphError::Encode(format!("failed to set APNG frame delay: {}", e)))?;

        let mut writer = encoder
            .write_header()
            .map_err(|e| MorphError::Encode(format!("failed to write APNG header: {}", e)))?;

        for (i, frame) in frames.iter().enumerate() {
            if frame.width != width || frame.height != height {
                return Err(MorphError::Encode(format!(
                    "frame {} has dimensions {}x{}, expected {}x{}",
                    i, frame.width, frame.height, width, height
                )));
            }
            let rgba = frame.to_rgba8();
            writer
                .write_image_data(&rgba.data)
                .map_err(|e| MorphError::Encode(format!("failed to write APNG frame {}: {}", i, e)))?;
        }

        writer
            .finish()
            .map_err(|e| MorphError::Encode(format!("failed to finalize APNG: {}", e)))?;

        info!(
            frames = frames.len(),
            path = %output_path.display(),
            width,
            height,
            fps,
            "encoded APNG"
        );
        Ok(())
    }
}

/// Collects a morph's frames and writes them as one APNG once it completes.
/// A cancelled morph writes nothing.
pub struct ApngSink {
    path: PathBuf,
    fps: u32,
    frames: Vec<FrameBuffer>,
}

impl ApngSink {
    pub fn new(path: impl Into<PathBuf>, fps: u32) -> Self {
        Self {
            path: path.into(),
            fps,
            frames: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn buffered(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSink for ApngSink {
    fn present(&mut self, frame: &MorphFrame<'_>) -> MorphResult<()> {
        self.frames.push(frame.buffer.clone());
        Ok(())
    }

    fn finish(&mut self, outcome: MorphOutcome, _start_image: &FrameBuffer) -> MorphResult<()> {
        let frames = std::mem::take(&mut self.frames);
        match outcome {
            MorphOutcome::Completed => ApngEncoder::encode(&frames, self.fps, &self.path, None),
            MorphOutcome::Cancelled => {
                warn!(dropped = frames.len(), "morph cancelled; APNG not written");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmorph_core::lattice::{Lattice, LatticeResolution};
    use meshmorph_core::{Color, PixelFormat};

    #[test]
    fn test_apng_encode_empty_frames() {
        let out = std::env::temp_dir().join("meshmorph_test_empty.png");
        assert!(ApngEncoder::encode(&[], 30, &out, None).is_err());
    }

    #[test]
    fn test_apng_encode_solid_frames() {
        let mut frames = Vec::new();
        for i in 0..5u32 {
            let mut fb = FrameBuffer::new(4, 4, PixelFormat::Rgba8);
            for y in 0..4 {
                for x in 0..4 {
                    fb.set_pixel(x, y, [0, (i * 50) as u8, 255, 255]);
                }
            }
            frames.push(fb);
        }

        let out = std::env::temp_dir().join(format!("meshmorph_test_apng_{}.png", std::process::id()));
        let result = ApngEncoder::encode(&frames, 10, &out, None);
        assert!(result.is_ok(), "APNG encode failed: {:?}", result.err());

        let decoder = png::Decoder::new(File::open(&out).unwrap());
        let reader = decoder.read_info().unwrap();
        let control = reader.info().animation_control.as_ref().unwrap();
        assert_eq!(control.num_frames, 5);

        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn test_apng_rejects_mixed_sizes() {
        let frames = vec![
            FrameBuffer::solid(4, 4, &Color::RED),
            FrameBuffer::solid(5, 4, &Color::RED),
        ];
        let out = std::env::temp_dir().join(format!("meshmorph_test_mixed_{}.png", std::process::id()));
        assert!(ApngEncoder::encode(&frames, 30, &out, None).is_err());
        let _ = std::fs::remove_file(&out);
    }

    #[test]
    fn test_sink_skips_cancelled_morph() {
        let out = std::env::temp_dir().join(format!("meshmorph_test_cancel_{}.png", std::process::id()));
        let _ = std::fs::remove_file(&out);
        let buffer = FrameBuffer::solid(4, 4, &Color::RED);
        let lattice = Lattice::new(4, 4, LatticeResolution::Five);

        let mut sink = ApngSink::new(&out, 30);
        sink.present(&MorphFrame {
            index: 1,
            total: 2,
            t: 0.0,
            buffer: &buffer,
            lattice: &lattice,
        })
        .unwrap();
        assert_eq!(sink.buffered(), 1);
        sink.finish(MorphOutcome::Cancelled, &buffer).unwrap();
        assert_eq!(sink.buffered(), 0);
        assert!(!out.exists());
    }
}
