//! # meshmorph-core
//!
//! Core types and primitives for the Meshmorph engine.
//! This crate contains the value types shared across all Meshmorph crates:
//! frame buffers, colors, control lattices, triangle meshes, the affine
//! solver, the lattice editor, settings events, projects and error types.

pub mod affine;
pub mod color;
pub mod config;
pub mod editor;
pub mod error;
pub mod frame;
pub mod hash;
pub mod lattice;
pub mod math;
pub mod mesh;
pub mod project;
pub mod settings;
pub mod sink;

pub use config::*;

pub use affine::{AffineMap, SingularTriangle};
pub use color::Color;
pub use editor::LatticeEditor;
pub use error::{MorphError, MorphResult};
pub use frame::{FrameBuffer, PixelFormat};
pub use lattice::{Lattice, LatticeResolution};
pub use math::{Point, Point2D};
pub use mesh::{Mesh, Triangle, TriangleFamily};
pub use project::Project;
pub use settings::{ColorRole, EditorSettings, ImageRole, SettingChange};
pub use sink::{FrameSink, MorphFrame, MorphOutcome};
