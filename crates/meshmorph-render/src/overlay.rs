//! Lattice overlay drawn on top of an image for inspection.

use meshmorph_core::frame::FrameBuffer;
use meshmorph_core::lattice::{Lattice, HANDLE_RADIUS};
use meshmorph_core::mesh::{Mesh, Triangle};
use meshmorph_core::settings::EditorSettings;
use meshmorph_core::{Color, Point};

fn plot(frame: &mut FrameBuffer, x: i32, y: i32, rgba: [u8; 4]) {
    if x >= 0 && y >= 0 {
        frame.set_pixel(x as u32, y as u32, rgba);
    }
}

/// Bresenham line between two points, inclusive. Off-frame pixels are skipped.
pub fn draw_line(frame: &mut FrameBuffer, from: Point, to: Point, color: &Color) {
    let rgba = color.to_rgba8();
    let (mut x, mut y) = (from.x, from.y);
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        plot(frame, x, y, rgba);
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

pub fn draw_triangle(frame: &mut FrameBuffer, tri: &Triangle, color: &Color) {
    let [a, b, c] = tri.vertices;
    draw_line(frame, a, b, color);
    draw_line(frame, b, c, color);
    draw_line(frame, c, a, color);
}

/// Filled diamond handle centred on `center`.
pub fn draw_handle(frame: &mut FrameBuffer, center: Point, color: &Color) {
    let rgba = color.to_rgba8();
    for dy in -HANDLE_RADIUS..=HANDLE_RADIUS {
        let span = HANDLE_RADIUS - dy.abs();
        for dx in -span..=span {
            plot(frame, center.x + dx, center.y + dy, rgba);
        }
    }
}

/// Draw the lattice triangles and control-point handles over `frame`.
///
/// Triangles touching `highlighted` use the highlight lattice color and
/// are drawn last so they stay visible; its handle uses the highlight
/// control-point color.
pub fn draw_overlay(
    frame: &mut FrameBuffer,
    lattice: &Lattice,
    settings: &EditorSettings,
    highlighted: Option<(usize, usize)>,
) {
    let n = lattice.n();
    let highlighted = highlighted.filter(|&(i, j)| i < n && j < n);
    let hot = highlighted.map(|(i, j)| lattice.point(i, j));

    if settings.show_lattice {
        let mesh = Mesh::build(lattice);
        let (hot_tris, plain): (Vec<&Triangle>, Vec<&Triangle>) = mesh
            .triangles()
            .map(|(_, _, _, tri)| tri)
            .partition(|tri| hot.is_some_and(|p| tri.vertices.contains(&p)));
        for tri in plain {
            draw_triangle(frame, tri, &settings.primary_lattice);
        }
        for tri in hot_tris {
            draw_triangle(frame, tri, &settings.highlight_lattice);
        }
    }

    if settings.show_control_points {
        for i in 0..n {
            for j in 0..n {
                let color = if highlighted == Some((i, j)) {
                    &settings.highlight_control_point
                } else {
                    &settings.primary_control_point
                };
                draw_handle(frame, lattice.point(i, j), color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshmorph_core::lattice::LatticeResolution;

    #[test]
    fn test_draw_line_endpoints_and_clipping() {
        let mut fb = FrameBuffer::solid(10, 10, &Color::BLACK);
        draw_line(&mut fb, Point::new(1, 1), Point::new(8, 4), &Color::WHITE);
        assert_eq!(fb.get_pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(fb.get_pixel(8, 4), Some([255, 255, 255, 255]));
        assert_eq!(fb.get_pixel(0, 9), Some([0, 0, 0, 255]));
        // Runs off the frame without panicking.
        draw_line(&mut fb, Point::new(-5, 5), Point::new(15, 5), &Color::RED);
        assert_eq!(fb.get_pixel(9, 5), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_handle_is_diamond() {
        let mut fb = FrameBuffer::solid(20, 20, &Color::BLACK);
        draw_handle(&mut fb, Point::new(10, 10), &Color::GREEN);
        assert_eq!(fb.get_pixel(10, 5), Some([0, 255, 0, 255]));
        assert_eq!(fb.get_pixel(15, 10), Some([0, 255, 0, 255]));
        assert_eq!(fb.get_pixel(13, 13), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_overlay_colors() {
        let lattice = Lattice::new(120, 120, LatticeResolution::Five);
        let settings = EditorSettings::default();
        let mut fb = FrameBuffer::solid(120, 120, &Color::BLACK);
        draw_overlay(&mut fb, &lattice, &settings, Some((2, 2)));

        let hot = lattice.point(2, 2);
        let cold = lattice.point(0, 0);
        assert_eq!(fb.get_pixel(hot.x as u32, hot.y as u32), Some([0, 255, 0, 255]));
        assert_eq!(fb.get_pixel(cold.x as u32, cold.y as u32), Some([255, 255, 255, 255]));
        // Top edge of the frame is a lattice edge.
        assert_eq!(fb.get_pixel(60, 0), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_overlay_respects_visibility() {
        let lattice = Lattice::new(60, 60, LatticeResolution::Five);
        let settings = EditorSettings {
            show_lattice: false,
            show_control_points: false,
            ..EditorSettings::default()
        };
        let mut fb = FrameBuffer::solid(60, 60, &Color::BLACK);
        let before = fb.clone();
        draw_overlay(&mut fb, &lattice, &settings, None);
        assert_eq!(fb, before);
    }
}
