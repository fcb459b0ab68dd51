//! Piecewise-affine warp renderer.
//!
//! Each destination triangle is filled by pulling samples from the source
//! image through the inverse of its affine map. Pixels are claimed by
//! their centers using exact integer edge functions; a center that lies on
//! an edge shared by two triangles belongs to exactly one of them, so the
//! two families tile the destination with no seams and no double writes.

use tracing::trace;

use meshmorph_core::affine::AffineMap;
use meshmorph_core::frame::{FrameBuffer, PixelFormat};
use meshmorph_core::math::{cross, Point, Point2D};
use meshmorph_core::mesh::{Mesh, Triangle, TriangleFamily};
use meshmorph_core::{MorphError, MorphResult};

/// Catmull-Rom kernel, `a = -0.5`. Interpolating: at integer offsets the
/// weights are exactly `1, 0, 0, 0`.
fn cubic_weight(t: f64) -> f64 {
    const A: f64 = -0.5;
    let t = t.abs();
    if t < 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

/// Bicubic sample at continuous pixel-index coordinates `(x, y)`, where
/// integer values address pixel centers. Borders are replicated.
pub fn bicubic_sample(src: &FrameBuffer, x: f64, y: f64) -> [u8; 4] {
    let w = src.width as i64;
    let h = src.height as i64;

    let x_int = x.floor() as i64;
    let y_int = y.floor() as i64;
    let fx = x - x_int as f64;
    let fy = y - y_int as f64;

    let wx = [
        cubic_weight(1.0 + fx),
        cubic_weight(fx),
        cubic_weight(1.0 - fx),
        cubic_weight(2.0 - fx),
    ];
    let wy = [
        cubic_weight(1.0 + fy),
        cubic_weight(fy),
        cubic_weight(1.0 - fy),
        cubic_weight(2.0 - fy),
    ];

    let mut acc = [0.0f64; 4];
    for (ky, wyk) in wy.iter().enumerate() {
        if *wyk == 0.0 {
            continue;
        }
        let yy = (y_int + ky as i64 - 1).clamp(0, h - 1) as usize;
        for (kx, wxk) in wx.iter().enumerate() {
            let weight = wyk * wxk;
            if weight == 0.0 {
                continue;
            }
            let xx = (x_int + kx as i64 - 1).clamp(0, w - 1) as usize;
            let offset = (yy * src.width as usize + xx) * 4;
            for (c, a) in acc.iter_mut().enumerate() {
                *a += src.data[offset + c] as f64 * weight;
            }
        }
    }
    acc.map(|v| v.round().clamp(0.0, 255.0) as u8)
}

/// Whether an edge owns the pixel centers lying exactly on it.
///
/// For a triangle with positive doubled area, an edge owns its points when
/// it runs upward, or horizontally to the right. The same edge traversed in
/// the opposite direction by the neighbouring triangle never owns them.
fn owns_boundary(a: Point, b: Point) -> bool {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dy < 0 || (dy == 0 && dx > 0)
}

/// Call `visit(x, y)` for every pixel whose center lies in `tri`.
///
/// Coordinates are doubled so pixel centers `(x + 0.5, y + 0.5)` become the
/// odd integers `(2x + 1, 2y + 1)` and every test stays exact.
pub fn rasterize_triangle(
    tri: &Triangle,
    width: u32,
    height: u32,
    mut visit: impl FnMut(u32, u32),
) {
    let [a, b, c] = tri.vertices;
    let area = cross(a, b, c);
    if area == 0 || width == 0 || height == 0 {
        return;
    }
    // Normalize to positive winding.
    let (b, c) = if area > 0 { (b, c) } else { (c, b) };

    let min_x = a.x.min(b.x).min(c.x).max(0);
    let max_x = a.x.max(b.x).max(c.x).min(width as i32);
    let min_y = a.y.min(b.y).min(c.y).max(0);
    let max_y = a.y.max(b.y).max(c.y).min(height as i32);
    if min_x >= max_x || min_y >= max_y {
        return;
    }

    let dbl = |p: Point| Point::new(p.x * 2, p.y * 2);
    let (a2, b2, c2) = (dbl(a), dbl(b), dbl(c));
    let edges = [
        (a2, b2, owns_boundary(a, b)),
        (b2, c2, owns_boundary(b, c)),
        (c2, a2, owns_boundary(c, a)),
    ];

    for y in min_y..max_y {
        for x in min_x..max_x {
            let p = Point::new(2 * x + 1, 2 * y + 1);
            let inside = edges.iter().all(|&(e0, e1, owned)| {
                let e = cross(e0, e1, p);
                e > 0 || (e == 0 && owned)
            });
            if inside {
                visit(x as u32, y as u32);
            }
        }
    }
}

/// Resample `src` into `dst` inside `dst_tri` through the map `src_tri -> dst_tri`.
///
/// Pixels outside the destination triangle are left untouched. Fails when
/// the source triangle is degenerate; a degenerate destination covers no
/// pixels and is skipped.
pub fn warp_triangle(
    src: &FrameBuffer,
    dst: &mut FrameBuffer,
    src_tri: &Triangle,
    dst_tri: &Triangle,
) -> Result<(), meshmorph_core::SingularTriangle> {
    let forward = AffineMap::solve(src_tri, dst_tri)?;
    let Some(backward) = forward.inverse() else {
        return Ok(());
    };

    let (width, height) = (dst.width, dst.height);
    let stride = width as usize * 4;
    rasterize_triangle(dst_tri, width, height, |x, y| {
        let center = Point2D::new(x as f64 + 0.5, y as f64 + 0.5);
        let s = backward.apply(center);
        let px = bicubic_sample(src, s.x - 0.5, s.y - 0.5);
        let offset = y as usize * stride + x as usize * 4;
        dst.data[offset..offset + 4].copy_from_slice(&px);
    });
    Ok(())
}

/// Warp one triangle family. Both slices are row-major over `cells x cells`.
///
/// The first singular source triangle aborts the whole family.
pub fn warp_family(
    src: &FrameBuffer,
    dst: &mut FrameBuffer,
    family: TriangleFamily,
    src_tris: &[Triangle],
    dst_tris: &[Triangle],
    cells: usize,
    t: f64,
) -> MorphResult<()> {
    if src_tris.len() != dst_tris.len() || src_tris.len() != cells * cells {
        return Err(MorphError::WarpRender(format!(
            "{} family shape mismatch: {} source vs {} destination triangles",
            family,
            src_tris.len(),
            dst_tris.len()
        )));
    }
    for (idx, (s, d)) in src_tris.iter().zip(dst_tris).enumerate() {
        warp_triangle(src, dst, s, d)
            .map_err(|_| MorphError::singular(family, idx / cells, idx % cells, t))?;
    }
    Ok(())
}

/// Produce a copy of `src` reshaped from `src_mesh` onto `dst_mesh`.
///
/// Runs the upper and then the lower family into one fresh buffer; `t` is
/// only carried into errors.
pub fn warp_mesh(
    src: &FrameBuffer,
    src_mesh: &Mesh,
    dst_mesh: &Mesh,
    t: f64,
) -> MorphResult<FrameBuffer> {
    if src.format != PixelFormat::Rgba8 {
        return Err(MorphError::WarpRender("source image must be RGBA8".into()));
    }
    if src.width != src_mesh.width() || src.height != src_mesh.height() {
        return Err(MorphError::WarpRender(format!(
            "source image is {}x{} but its mesh spans {}x{}",
            src.width,
            src.height,
            src_mesh.width(),
            src_mesh.height()
        )));
    }
    if src_mesh.cells() != dst_mesh.cells() {
        return Err(MorphError::ResolutionMismatch {
            start: src_mesh.cells() - 1,
            end: dst_mesh.cells() - 1,
        });
    }

    let mut dst = FrameBuffer::new(dst_mesh.width(), dst_mesh.height(), PixelFormat::Rgba8);
    for family in [TriangleFamily::Upper, TriangleFamily::Lower] {
        warp_family(
            src,
            &mut dst,
            family,
            src_mesh.family(family),
            dst_mesh.family(family),
            src_mesh.cells(),
            t,
        )?;
    }
    trace!(t, width = dst.width, height = dst.height, "warped image");
    Ok(dst)
}
