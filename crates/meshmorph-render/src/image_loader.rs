//! Image loading module.
//! Decodes PNG, JPEG and other formats into FrameBuffers and fits them to
//! the editing area.

use std::path::Path;

use image::imageops::FilterType;
use image::RgbaImage;
use tracing::debug;

use meshmorph_core::frame::FrameBuffer;
use meshmorph_core::{MorphError, MorphResult, PixelFormat};

/// Largest pixel area an image may occupy once loaded (600 x 400).
pub const MAX_AREA: u64 = 600 * 400;

/// Load an image file and convert it to a FrameBuffer.
pub fn load_image(path: &Path) -> MorphResult<FrameBuffer> {
    let img = image::open(path).map_err(|e| {
        MorphError::asset(
            format!("failed to load image '{}': {}", path.display(), e),
            path,
        )
    })?;
    Ok(from_rgba_image(img.to_rgba8()))
}

/// Target dimensions for an image of `width x height` under [`MAX_AREA`].
///
/// Larger images keep their aspect ratio: `w' = floor(sqrt(ratio * area))`,
/// `h' = area / w'`. Anything that already fits is left as is.
pub fn fitted_dimensions(width: u32, height: u32) -> (u32, u32) {
    if (width as u64) * (height as u64) <= MAX_AREA || width == 0 || height == 0 {
        return (width, height);
    }
    let ratio = width as f64 / height as f64;
    let new_width = ((ratio * MAX_AREA as f64).sqrt() as u32).max(1);
    let new_height = (MAX_AREA / new_width as u64).max(1) as u32;
    (new_width, new_height)
}

/// Shrink an image so that its area does not exceed [`MAX_AREA`].
pub fn fit_to_area(fb: &FrameBuffer) -> MorphResult<FrameBuffer> {
    let (width, height) = fitted_dimensions(fb.width, fb.height);
    resize(fb, width, height)
}

/// Rescale `fb` to exactly `width x height` unless it already matches.
///
/// Used to bring the end image onto the start image's dimensions.
pub fn match_dimensions(fb: &FrameBuffer, width: u32, height: u32) -> MorphResult<FrameBuffer> {
    resize(fb, width, height)
}

/// Bicubic (Catmull-Rom) resize to `width x height`.
pub fn resize(fb: &FrameBuffer, width: u32, height: u32) -> MorphResult<FrameBuffer> {
    if fb.width == width && fb.height == height {
        return Ok(fb.to_rgba8());
    }
    debug!(
        from_w = fb.width,
        from_h = fb.height,
        to_w = width,
        to_h = height,
        "resizing image"
    );
    let src = to_rgba_image(fb)?;
    let resized = image::imageops::resize(&src, width, height, FilterType::CatmullRom);
    Ok(from_rgba_image(resized))
}

/// Wrap RGBA pixels decoded by `image` in a FrameBuffer.
pub fn from_rgba_image(rgba: RgbaImage) -> FrameBuffer {
    let (width, height) = rgba.dimensions();
    let mut fb = FrameBuffer::new(width, height, PixelFormat::Rgba8);
    fb.data = rgba.into_raw();
    fb
}

/// Copy a FrameBuffer into an `image` RGBA buffer.
pub fn to_rgba_image(fb: &FrameBuffer) -> MorphResult<RgbaImage> {
    let rgba = fb.to_rgba8();
    RgbaImage::from_raw(rgba.width, rgba.height, rgba.data).ok_or_else(|| {
        MorphError::WarpRender(format!(
            "frame buffer does not hold {}x{} RGBA pixels",
            fb.width, fb.height
        ))
    })
}

/// Write a frame as a PNG file.
pub fn save_png(fb: &FrameBuffer, path: &Path) -> MorphResult<()> {
    to_rgba_image(fb)?
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| MorphError::Encode(format!("failed to write '{}': {}", path.display(), e)))
}
