//! Decoded RGBA pixel buffers.
//!
//! A thin addressing layer over a row-major RGBA8 byte buffer. Both builders
//! read cells out of a source buffer, and the atlas is assembled by blitting
//! tile bytes into a fresh buffer.

use image::RgbaImage;

use crate::error::{Result, TmxError};

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// A decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking that the length matches the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(TmxError::InvalidBuffer {
                message: format!(
                    "{}x{} image needs {} bytes, got {}",
                    width,
                    height,
                    expected,
                    data.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A fully transparent buffer.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * CHANNELS],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// RGBA value at (x, y), or `None` outside the buffer.
    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Copy the `w`x`h` rectangle at (x, y) into a new row-major byte vector.
    ///
    /// Pixels that fall outside the buffer read as transparent zero bytes, so
    /// a trailing partial cell never indexes out of bounds.
    pub fn region(&self, x: u32, y: u32, w: u32, h: u32) -> Vec<u8> {
        let row_len = w as usize * CHANNELS;
        let mut out = vec![0u8; row_len * h as usize];

        if x >= self.width {
            return out;
        }
        let copy_w = w.min(self.width - x) as usize * CHANNELS;

        for row in 0..h {
            let sy = y + row;
            if sy >= self.height {
                break;
            }
            let src = self.offset(x, sy);
            let dst = row as usize * row_len;
            out[dst..dst + copy_w].copy_from_slice(&self.data[src..src + copy_w]);
        }

        out
    }

    /// Draw a `w`x`h` block of row-major RGBA bytes with its top-left at (x, y).
    ///
    /// Rows and columns that fall outside the buffer are clipped.
    pub fn blit(&mut self, src: &[u8], w: u32, h: u32, x: u32, y: u32) {
        if x >= self.width {
            return;
        }
        let row_len = w as usize * CHANNELS;
        let copy_w = w.min(self.width - x) as usize * CHANNELS;

        for row in 0..h {
            let dy = y + row;
            if dy >= self.height {
                break;
            }
            let from = row as usize * row_len;
            let Some(line) = src.get(from..from + copy_w) else {
                break;
            };
            let dst = self.offset(x, dy);
            self.data[dst..dst + copy_w].copy_from_slice(line);
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

impl TryFrom<PixelBuffer> for RgbaImage {
    type Error = TmxError;

    fn try_from(buffer: PixelBuffer) -> Result<Self> {
        let (w, h) = (buffer.width, buffer.height);
        RgbaImage::from_raw(w, h, buffer.data).ok_or_else(|| TmxError::InvalidBuffer {
            message: format!("buffer does not fit a {}x{} image", w, h),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> PixelBuffer {
        let mut data = Vec::new();
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        PixelBuffer::from_rgba(w, h, data).unwrap()
    }

    #[test]
    fn test_from_rgba_rejects_bad_length() {
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_get() {
        let buf = gradient(3, 2);
        assert_eq!(buf.get(2, 1), Some([2, 1, 0, 255]));
        assert_eq!(buf.get(3, 0), None);
    }

    #[test]
    fn test_region_inside() {
        let buf = gradient(4, 4);
        let cell = buf.region(2, 2, 2, 2);
        assert_eq!(
            cell,
            vec![2, 2, 0, 255, 3, 2, 0, 255, 2, 3, 0, 255, 3, 3, 0, 255]
        );
    }

    #[test]
    fn test_region_out_of_bounds_is_zeroed() {
        let buf = gradient(3, 3);
        let cell = buf.region(2, 2, 2, 2);
        assert_eq!(cell.len(), 16);
        assert_eq!(&cell[0..4], &[2, 2, 0, 255]);
        assert!(cell[4..].iter().all(|&b| b == 0));

        let outside = buf.region(10, 10, 2, 2);
        assert!(outside.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_blit_clips() {
        let mut canvas = PixelBuffer::blank(3, 3);
        let red = [255u8, 0, 0, 255].repeat(4);
        canvas.blit(&red, 2, 2, 2, 2);

        assert_eq!(canvas.get(2, 2), Some([255, 0, 0, 255]));
        assert_eq!(canvas.get(1, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_image_conversion() {
        let img = RgbaImage::from_pixel(2, 1, image::Rgba([9, 8, 7, 6]));
        let buf = PixelBuffer::from(img);
        assert_eq!(buf.get(1, 0), Some([9, 8, 7, 6]));

        let back = RgbaImage::try_from(buf).unwrap();
        assert_eq!(back.get_pixel(0, 0).0, [9, 8, 7, 6]);
    }
}
