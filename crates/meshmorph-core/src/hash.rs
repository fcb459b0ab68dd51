//! Content hashing for deterministic morph verification.
//!
//! Produces SHA-256 digests of frame buffer data so that two runs of the same
//! morph (preview and export, or two machines) can be compared bit for bit.

use sha2::{Digest, Sha256};

use crate::frame::FrameBuffer;

/// A content hash digest (SHA-256, 32 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    bytes: [u8; 32],
}

impl ContentHash {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Incremental hasher over a sequence of frames.
///
/// Frames are folded in as they are produced, so a whole morph can be
/// fingerprinted without keeping every frame in memory.
#[derive(Default)]
pub struct SequenceHasher {
    hasher: Sha256,
    frames: u64,
}

impl SequenceHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one frame into the digest.
    pub fn update(&mut self, frame: &FrameBuffer) {
        update_with_frame(&mut self.hasher, frame);
        self.frames += 1;
    }

    /// Number of frames folded in so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Finish, mixing in the frame count.
    pub fn finish(self) -> ContentHash {
        let mut hasher = self.hasher;
        hasher.update(self.frames.to_le_bytes());
        finalize(hasher)
    }
}

fn update_with_frame(hasher: &mut Sha256, frame: &FrameBuffer) {
    // Dimensions and format are part of the digest so that differently
    // shaped buffers with identical bytes hash differently.
    hasher.update(frame.width.to_le_bytes());
    hasher.update(frame.height.to_le_bytes());
    hasher.update([frame.format as u8]);
    hasher.update(&frame.data);
}

fn finalize(hasher: Sha256) -> ContentHash {
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    ContentHash::from_bytes(bytes)
}

/// Compute the content hash of a single frame buffer.
pub fn hash_frame(frame: &FrameBuffer) -> ContentHash {
    let mut hasher = Sha256::new();
    update_with_frame(&mut hasher, frame);
    finalize(hasher)
}

/// Compute the content hash of a sequence of frames.
pub fn hash_frames(frames: &[FrameBuffer]) -> ContentHash {
    let mut seq = SequenceHasher::new();
    for frame in frames {
        seq.update(frame);
    }
    seq.finish()
}
