//! Image file input and output.
//!
//! Decodes source images into `PixelBuffer`s and encodes rendered atlases as
//! PNG files.

use std::path::Path;

use image::RgbaImage;

use crate::error::{Result, TmxError};
use crate::pixels::PixelBuffer;

/// Decode an image file to RGBA8.
pub fn load_pixels(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path)
        .map_err(|e| TmxError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .to_rgba8();
    Ok(PixelBuffer::from(img))
}

/// Write an atlas buffer to a PNG file.
pub fn write_atlas(atlas: &PixelBuffer, path: &Path) -> Result<()> {
    let img = RgbaImage::try_from(atlas.clone())?;
    img.save(path).map_err(|e| TmxError::Write {
        path: path.to_path_buf(),
        message: format!("Failed to write PNG: {}", e),
    })?;

    Ok(())
}
