//! Platform-neutral raster value type.
//!
//! Tiles, stitched canvases and textures are all plain RGBA8 buffers here;
//! conversion to anything drawable happens at the scene boundary.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{ImageFormat, Rgba, RgbaImage};

pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to decode raster: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode raster: {0}")]
    Encode(#[source] image::ImageError),
    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA")]
    SizeMismatch { width: u32, height: u32, len: usize },
}

/// RGBA8 raster, rows top to bottom.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl RasterImage {
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_image(RgbaImage::from_pixel(width, height, Rgba(rgba)))
    }

    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RasterError> {
        if pixels.len() != width as usize * height as usize * BYTES_PER_PIXEL {
            return Err(RasterError::SizeMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode any supported encoded image (PNG, JPEG) into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, RasterError> {
        let rgba = image::load_from_memory(bytes)
            .map_err(RasterError::Decode)?
            .to_rgba8();
        Ok(Self::from_image(rgba))
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, RasterError> {
        let mut out = Vec::new();
        self.to_image()
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .map_err(RasterError::Encode)?;
        Ok(out)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.pixels[i..i + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    /// Copy `src` with its top-left corner at `(x, y)`, clipped to this raster.
    pub fn blit(&mut self, src: &RasterImage, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let cols = src.width.min(self.width - x) as usize;
        let rows = src.height.min(self.height - y);
        let row_bytes = cols * BYTES_PER_PIXEL;
        for row in 0..rows {
            let from = src.offset(0, row);
            let to = self.offset(x, y + row);
            self.pixels[to..to + row_bytes].copy_from_slice(&src.pixels[from..from + row_bytes]);
        }
    }

    /// Nearest-neighbour resize. Never blends, so encoded values survive.
    pub fn resized_nearest(&self, width: u32, height: u32) -> Self {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let resized = image::imageops::resize(&self.to_image(), width, height, FilterType::Nearest);
        Self::from_image(resized)
    }

    fn from_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    fn to_image(&self) -> RgbaImage {
        // Length is an invariant of every constructor.
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}
