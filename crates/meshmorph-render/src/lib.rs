//! # meshmorph-render
//!
//! The Meshmorph rendering engine. Warps images along triangle meshes,
//! cross-dissolves them and drives the morph timeline that turns two
//! lattice configurations into a sequence of frames.

pub mod compositor;
pub mod image_loader;
pub mod overlay;
pub mod preview;
pub mod session;
pub mod timeline;
pub mod warp;

pub use compositor::{compose_frame, cross_dissolve, FrameMeshes};
pub use preview::PreviewDisplay;
pub use session::MorphSession;
pub use timeline::{MorphMode, MorphRequest, MorphTimeline, Ticker, TimelineState};
pub use warp::warp_mesh;
