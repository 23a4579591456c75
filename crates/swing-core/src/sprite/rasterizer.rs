//! Drawing tiles onto a sprite surface and encoding the result.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use swing_models::TileRect;

use crate::error::{EngineError, EngineResult};
use crate::source::Frame;

/// An encoded sprite sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub extension: &'static str,
}

/// Backend that owns the drawing surface.
///
/// The surface is dropped, not encoded, when generation is cancelled.
pub trait Rasterizer: Send + Sync {
    type Surface: Send;

    fn create_surface(&self, width: u32, height: u32) -> EngineResult<Self::Surface>;

    /// Scale `frame` into `rect`.
    fn draw_tile(&self, surface: &mut Self::Surface, frame: &Frame, rect: TileRect)
        -> EngineResult<()>;

    fn encode(&self, surface: Self::Surface) -> EngineResult<EncodedImage>;
}

/// Output format of [`ImageRasterizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteFormat {
    Jpeg { quality: u8 },
    Png,
}

impl SpriteFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SpriteFormat::Jpeg { .. } => "jpg",
            SpriteFormat::Png => "png",
        }
    }
}

/// Rasterizer backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct ImageRasterizer {
    format: SpriteFormat,
}

impl ImageRasterizer {
    pub fn new(format: SpriteFormat) -> Self {
        Self { format }
    }

    pub fn jpeg(quality: u8) -> Self {
        Self::new(SpriteFormat::Jpeg {
            quality: quality.clamp(1, 100),
        })
    }

    pub fn format(&self) -> SpriteFormat {
        self.format
    }
}

impl Rasterizer for ImageRasterizer {
    type Surface = RgbaImage;

    fn create_surface(&self, width: u32, height: u32) -> EngineResult<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(EngineError::Encode(format!(
                "empty sprite surface {width}x{height}"
            )));
        }
        Ok(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])))
    }

    fn draw_tile(&self, surface: &mut RgbaImage, frame: &Frame, rect: TileRect) -> EngineResult<()> {
        if rect.x + rect.width > surface.width() || rect.y + rect.height > surface.height() {
            return Err(EngineError::internal(format!(
                "tile {}x{} at ({}, {}) outside {}x{} surface",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                surface.width(),
                surface.height()
            )));
        }
        let tile = imageops::resize(frame, rect.width, rect.height, FilterType::Triangle);
        imageops::replace(surface, &tile, i64::from(rect.x), i64::from(rect.y));
        Ok(())
    }

    fn encode(&self, surface: RgbaImage) -> EngineResult<EncodedImage> {
        let mut buf = Cursor::new(Vec::new());
        let (mime, extension) = match self.format {
            SpriteFormat::Jpeg { quality } => {
                let rgb = DynamicImage::ImageRgba8(surface).to_rgb8();
                let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
                rgb.write_with_encoder(encoder)
                    .map_err(|e| EngineError::Encode(e.to_string()))?;
                ("image/jpeg", "jpg")
            }
            SpriteFormat::Png => {
                let encoder = PngEncoder::new(&mut buf);
                surface
                    .write_with_encoder(encoder)
                    .map_err(|e| EngineError::Encode(e.to_string()))?;
                ("image/png", "png")
            }
        };
        Ok(EncodedImage {
            bytes: buf.into_inner(),
            mime,
            extension,
        })
    }
}
