//! # meshmorph-encode
//!
//! Encoding module: writes composited morph frames to storage, either as
//! a numbered sequence of JPEG stills or as one animated PNG.

pub mod apng;
pub mod sequence;

pub use apng::{ApngEncoder, ApngSink};
pub use sequence::JpegSequenceWriter;
