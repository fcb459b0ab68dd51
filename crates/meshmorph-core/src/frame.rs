use serde::{Deserialize, Serialize};

use crate::Color;

/// Pixel format of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (4 bytes per pixel).
    Rgba8,
    /// 8-bit RGB (3 bytes per pixel, no alpha).
    Rgb8,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A raster image held as a raw pixel buffer.
///
/// Source images, warped intermediates and composited morph frames all use
/// this type. Rows are stored top to bottom with no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
}

impl FrameBuffer {
    /// Create a new frame buffer filled with zeros (transparent black).
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let size = (width as usize) * (height as usize) * format.bytes_per_pixel();
        Self {
            data: vec![0u8; size],
            width,
            height,
            format,
        }
    }

    /// Create a frame buffer filled with a solid color.
    pub fn solid(width: u32, height: u32, color: &Color) -> Self {
        let pixel = color.to_rgba8();
        let pixel_count = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&pixel);
        }
        Self {
            data,
            width,
            height,
            format: PixelFormat::Rgba8,
        }
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total byte size of the pixel data.
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Whether both buffers have the same pixel dimensions.
    pub fn same_size(&self, other: &FrameBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Get the RGBA value at a pixel coordinate. Returns None if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * bpp;
        match self.format {
            PixelFormat::Rgba8 => Some([
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
                self.data[offset + 3],
            ]),
            PixelFormat::Rgb8 => Some([
                self.data[offset],
                self.data[offset + 1],
                self.data[offset + 2],
                255,
            ]),
        }
    }

    /// Set the RGBA value at a pixel coordinate. No-op if out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * bpp;
        match self.format {
            PixelFormat::Rgba8 => self.data[offset..offset + 4].copy_from_slice(&rgba),
            PixelFormat::Rgb8 => self.data[offset..offset + 3].copy_from_slice(&rgba[..3]),
        }
    }

    /// Convert to RGBA8, expanding RGB pixels with an opaque alpha.
    pub fn to_rgba8(&self) -> FrameBuffer {
        match self.format {
            PixelFormat::Rgba8 => self.clone(),
            PixelFormat::Rgb8 => {
                let mut data = Vec::with_capacity(self.pixel_count() * 4);
                for px in self.data.chunks_exact(3) {
                    data.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
                FrameBuffer {
                    data,
                    width: self.width,
                    height: self.height,
                    format: PixelFormat::Rgba8,
                }
            }
        }
    }

    /// Alpha-composite `src` on top of `self` at position (dx, dy).
    /// Uses integer math that auto-vectorizes well.
    pub fn composite_over(&mut self, src: &FrameBuffer, dx: i32, dy: i32) {
        if self.format != PixelFormat::Rgba8 || src.format != PixelFormat::Rgba8 {
            return;
        }

        let dst_width = self.width as i32;
        let dst_height = self.height as i32;

        let mut start_y = 0;
        let mut end_y = src.height as i32;
        let mut start_x = 0;
        let mut end_x = src.width as i32;

        if dy < 0 {
            start_y = -dy;
        }
        if dy + end_y > dst_height {
            end_y = dst_height - dy;
        }
        if dx < 0 {
            start_x = -dx;
        }
        if dx + end_x > dst_width {
            end_x = dst_width - dx;
        }

        if start_x >= end_x || start_y >= end_y {
            return;
        }

        let src_stride = (src.width * 4) as usize;
        let dst_stride = (self.width * 4) as usize;

        for sy in start_y..end_y {
            let dst_y = dy + sy;
            let src_row_start = (sy as usize * src_stride) + (start_x as usize * 4);
            let dst_row_start = (dst_y as usize * dst_stride) + ((dx + start_x) as usize * 4);
            let len = (end_x - start_x) as usize * 4;

            let src_slice = &src.data[src_row_start..src_row_start + len];
            let dst_slice = &mut self.data[dst_row_start..dst_row_start + len];

            for (s, d) in src_slice.chunks_exact(4).zip(dst_slice.chunks_exact_mut(4)) {
                let sa = s[3] as u32;
                if sa == 0 {
                    continue;
                }
                if sa == 255 {
                    d.copy_from_slice(s);
                    continue;
                }

                let da = d[3] as u32;
                let inv_sa = 255 - sa;
                let out_a = sa + ((da * inv_sa) / 255);

                if out_a == 0 {
                    continue;
                }

                for c in 0..3 {
                    let out = (s[c] as u32 * sa * 255 + d[c] as u32 * da * inv_sa) / (out_a * 255);
                    d[c] = out as u8;
                }
                d[3] = out_a as u8;
            }
        }
    }

    /// Linear cross-fade: `self * (1 - alpha) + other * alpha` on every channel.
    ///
    /// Both buffers must be RGBA8 and share dimensions. `alpha` is clamped to
    /// [0, 1]; at the endpoints the matching input is returned bit for bit.
    pub fn lerp(&self, other: &FrameBuffer, alpha: f64) -> Option<FrameBuffer> {
        if !self.same_size(other)
            || self.format != PixelFormat::Rgba8
            || other.format != PixelFormat::Rgba8
        {
            return None;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        let inv = 1.0 - alpha;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| (a as f64 * inv + b as f64 * alpha).round() as u8)
            .collect();
        Some(FrameBuffer {
            data,
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgba8,
        })
    }

    /// Flatten onto an opaque background, dropping the alpha channel.
    ///
    /// The result is an RGB8 buffer suitable for encoders without alpha support.
    pub fn flatten(&self, background: &Color) -> FrameBuffer {
        let opaque = Color {
            a: 1.0,
            ..*background
        };
        let mut canvas = FrameBuffer::solid(self.width, self.height, &opaque);
        canvas.composite_over(&self.to_rgba8(), 0, 0);

        let mut data = Vec::with_capacity(self.pixel_count() * 3);
        for px in canvas.data.chunks_exact(4) {
            data.extend_from_slice(&px[..3]);
        }
        FrameBuffer {
            data,
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgb8,
        }
    }

    /// Scale the color channels by `level / 100 + 1`, leaving alpha untouched.
    ///
    /// `level` is clamped to [-100, 100]; -100 yields black, 100 doubles
    /// every channel (saturating at 255).
    pub fn adjust_brightness(&self, level: i32) -> FrameBuffer {
        let factor = level.clamp(-100, 100) as f32 / 100.0 + 1.0;
        let mut out = self.clone();
        let bpp = self.format.bytes_per_pixel();
        for px in out.data.chunks_exact_mut(bpp) {
            for c in px.iter_mut().take(3) {
                *c = (*c as f32 * factor).clamp(0.0, 255.0) as u8;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_buffer_new() {
        let fb = FrameBuffer::new(600, 400, PixelFormat::Rgba8);
        assert_eq!(fb.width, 600);
        assert_eq!(fb.height, 400);
        assert_eq!(fb.byte_size(), 600 * 400 * 4);
        assert_eq!(fb.pixel_count(), 600 * 400);
    }

    #[test]
    fn test_frame_buffer_solid() {
        let fb = FrameBuffer::solid(2, 2, &Color::RED);
        assert_eq!(fb.get_pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(fb.get_pixel(1, 1), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_frame_buffer_get_set_pixel() {
        let mut fb = FrameBuffer::new(10, 10, PixelFormat::Rgba8);
        fb.set_pixel(5, 5, [128, 64, 32, 255]);
        assert_eq!(fb.get_pixel(5, 5), Some([128, 64, 32, 255]));
        assert_eq!(fb.get_pixel(10, 0), None);
        assert_eq!(fb.get_pixel(0, 10), None);
    }

    #[test]
    fn test_composite_over_opaque() {
        let mut dst = FrameBuffer::solid(4, 4, &Color::BLUE);
        let src = FrameBuffer::solid(2, 2, &Color::RED);
        dst.composite_over(&src, 1, 1);
        assert_eq!(dst.get_pixel(1, 1), Some([255, 0, 0, 255]));
        assert_eq!(dst.get_pixel(2, 2), Some([255, 0, 0, 255]));
        assert_eq!(dst.get_pixel(0, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_composite_over_transparent() {
        let mut dst = FrameBuffer::solid(4, 4, &Color::WHITE);
        let src = FrameBuffer::new(2, 2, PixelFormat::Rgba8);
        dst.composite_over(&src, 0, 0);
        assert_eq!(dst.get_pixel(0, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_flatten_drops_alpha() {
        let mut fb = FrameBuffer::new(2, 1, PixelFormat::Rgba8);
        fb.set_pixel(0, 0, [200, 100, 50, 255]);
        fb.set_pixel(1, 0, [255, 255, 255, 0]);

        let flat = fb.flatten(&Color::BLACK);
        assert_eq!(flat.format, PixelFormat::Rgb8);
        assert_eq!(flat.byte_size(), 6);
        assert_eq!(flat.get_pixel(0, 0), Some([200, 100, 50, 255]));
        // Fully transparent pixels take the background.
        assert_eq!(flat.get_pixel(1, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_flatten_half_transparent_over_white() {
        let mut fb = FrameBuffer::new(1, 1, PixelFormat::Rgba8);
        fb.set_pixel(0, 0, [0, 0, 0, 128]);
        let flat = fb.flatten(&Color::WHITE);
        let px = flat.get_pixel(0, 0).unwrap();
        assert!(px[0] > 100 && px[0] < 150);
    }

    #[test]
    fn test_lerp_endpoints_and_midpoint() {
        let a = FrameBuffer::solid(3, 2, &Color::RED);
        let b = FrameBuffer::solid(3, 2, &Color::BLUE);
        assert_eq!(a.lerp(&b, 0.0).unwrap(), a);
        assert_eq!(a.lerp(&b, 1.0).unwrap(), b);
        let mid = a.lerp(&b, 0.5).unwrap();
        assert_eq!(mid.get_pixel(0, 0), Some([128, 0, 128, 255]));
        assert!(a.lerp(&FrameBuffer::solid(2, 2, &Color::RED), 0.5).is_none());
    }

    #[test]
    fn test_adjust_brightness() {
        let fb = FrameBuffer::solid(1, 1, &Color::rgba(0.4, 0.8, 0.0, 0.5));
        let brighter = fb.adjust_brightness(50);
        assert_eq!(brighter.get_pixel(0, 0), Some([153, 255, 0, 128]));

        let black = fb.adjust_brightness(-100);
        assert_eq!(black.get_pixel(0, 0), Some([0, 0, 0, 128]));

        let same = fb.adjust_brightness(0);
        assert_eq!(same, fb);
    }

    #[test]
    fn test_to_rgba8_expands_rgb() {
        let rgb = FrameBuffer::solid(2, 2, &Color::GREEN).flatten(&Color::BLACK);
        let rgba = rgb.to_rgba8();
        assert_eq!(rgba.format, PixelFormat::Rgba8);
        assert_eq!(rgba.get_pixel(1, 1), Some([0, 255, 0, 255]));
    }
}
