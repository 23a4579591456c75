//! Scrub-preview sprite sheet layout and cues.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::timestamp::format_vtt_timestamp;

/// Pixel rectangle of one tile inside the sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct TileRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Media fragment suffix used in cue payloads.
    pub fn xywh(&self) -> String {
        format!("#xywh={},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// Grid geometry of a sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SpriteLayout {
    pub columns: u32,
    pub rows: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl SpriteLayout {
    /// Smallest near-square grid that holds `count` tiles.
    pub fn for_count(count: u32, tile_width: u32, tile_height: u32) -> Self {
        let count = count.max(1);
        let columns = (f64::from(count).sqrt().ceil() as u32).max(1);
        let rows = count.div_ceil(columns);
        Self {
            columns,
            rows,
            tile_width,
            tile_height,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.columns * self.rows
    }

    pub fn sheet_width(&self) -> u32 {
        self.columns * self.tile_width
    }

    pub fn sheet_height(&self) -> u32 {
        self.rows * self.tile_height
    }

    /// Rectangle of tile `index`, filled row by row.
    pub fn tile_rect(&self, index: u32) -> TileRect {
        let col = index % self.columns;
        let row = index / self.columns;
        TileRect::new(
            col * self.tile_width,
            row * self.tile_height,
            self.tile_width,
            self.tile_height,
        )
    }
}

/// Maps a half-open media time range to a tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CueEntry {
    /// Start time in seconds (inclusive)
    pub start: f64,
    /// End time in seconds (exclusive)
    pub end: f64,
    pub rect: TileRect,
}

impl CueEntry {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Render cues as a WebVTT document referencing `image_name`.
pub fn render_vtt(cues: &[CueEntry], image_name: &str) -> String {
    let mut out = String::from("WEBVTT\n");
    for cue in cues {
        out.push('\n');
        out.push_str(&format_vtt_timestamp(cue.start));
        out.push_str(" --> ");
        out.push_str(&format_vtt_timestamp(cue.end));
        out.push('\n');
        out.push_str(image_name);
        out.push_str(&cue.rect.xywh());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_for_count() {
        let layout = SpriteLayout::for_count(100, 160, 90);
        assert_eq!(layout.columns, 10);
        assert_eq!(layout.rows, 10);

        let layout = SpriteLayout::for_count(7, 160, 90);
        assert_eq!(layout.columns, 3);
        assert_eq!(layout.rows, 3);
        assert!(layout.capacity() >= 7);

        let layout = SpriteLayout::for_count(1, 160, 90);
        assert_eq!((layout.columns, layout.rows), (1, 1));
    }

    #[test]
    fn test_tile_rect_row_major() {
        let layout = SpriteLayout::for_count(6, 100, 50);
        assert_eq!(layout.columns, 3);
        assert_eq!(layout.tile_rect(0), TileRect::new(0, 0, 100, 50));
        assert_eq!(layout.tile_rect(2), TileRect::new(200, 0, 100, 50));
        assert_eq!(layout.tile_rect(4), TileRect::new(100, 50, 100, 50));
        assert_eq!(layout.sheet_width(), 300);
        assert_eq!(layout.sheet_height(), 100);
    }

    #[test]
    fn test_render_vtt() {
        let cues = vec![
            CueEntry {
                start: 0.0,
                end: 2.5,
                rect: TileRect::new(0, 0, 160, 90),
            },
            CueEntry {
                start: 2.5,
                end: 4.0,
                rect: TileRect::new(160, 0, 160, 90),
            },
        ];

        let vtt = render_vtt(&cues, "sprite.jpg");
        let expected = "WEBVTT\n\
            \n00:00:00.000 --> 00:00:02.500\nsprite.jpg#xywh=0,0,160,90\n\
            \n00:00:02.500 --> 00:00:04.000\nsprite.jpg#xywh=160,0,160,90\n";
        assert_eq!(vtt, expected);
    }
}
