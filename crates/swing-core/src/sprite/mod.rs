//! Scrub-preview thumbnail sprites.
//!
//! For a video of duration D and N tiles the generator seeks to
//! `i × D/N`, rasterizes the presented frame into tile `i` of a near-square
//! grid and emits a WebVTT cue `[i × D/N, (i+1) × D/N)` pointing at the
//! tile's rectangle. The sheet and cue file are handed out as handles in a
//! [`HandleRegistry`] that the caller must release.

mod cache;
mod generator;
mod handles;
mod rasterizer;

pub use cache::{RequestOutcome, SpriteCache, SpritePreview};
pub use generator::{GenerationOutcome, SpriteGenerator, SpriteSheet};
pub use handles::{HandleRegistry, Resource, ResourceHandle};
pub use rasterizer::{EncodedImage, ImageRasterizer, Rasterizer, SpriteFormat};
