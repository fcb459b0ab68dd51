//! Frame compositing: both source images are warped onto the intermediate
//! mesh and cross-dissolved by the interpolation factor.

use meshmorph_core::frame::FrameBuffer;
use meshmorph_core::mesh::Mesh;
use meshmorph_core::{MorphError, MorphResult};

use crate::warp::warp_mesh;

/// `b1 * (1 - alpha) + b2 * alpha` per channel, with `alpha = min(t, 1)`.
pub fn cross_dissolve(b1: &FrameBuffer, b2: &FrameBuffer, t: f64) -> MorphResult<FrameBuffer> {
    b1.lerp(b2, t.min(1.0)).ok_or_else(|| {
        MorphError::WarpRender(format!(
            "cannot blend {}x{} {:?} with {}x{} {:?}",
            b1.width, b1.height, b1.format, b2.width, b2.height, b2.format
        ))
    })
}

/// The meshes a frame is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct FrameMeshes<'a> {
    pub start: &'a Mesh,
    pub end: &'a Mesh,
    pub intermediate: &'a Mesh,
}

/// Render one composited frame at time `t`.
///
/// The two warps run in parallel; both finish before blending starts and
/// neither touches the meshes mutably.
pub fn compose_frame(
    start_image: &FrameBuffer,
    end_image: &FrameBuffer,
    meshes: FrameMeshes<'_>,
    t: f64,
) -> MorphResult<FrameBuffer> {
    let (b1, b2) = rayon::join(
        || warp_mesh(start_image, meshes.start, meshes.intermediate, t),
        || warp_mesh(end_image, meshes.end, meshes.intermediate, t),
    );
    cross_dissolve(&b1?, &b2?, t)
}
