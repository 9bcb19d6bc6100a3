use serde::Deserialize;

/// Construction-time settings for a [`Tilemap`](crate::Tilemap).
///
/// ```json
/// { "tile_scale": 2.0, "repeat_tiles": false, "viewport": [1280, 720] }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TilemapOptions {
    /// Device pixels per map pixel.
    pub tile_scale: f32,
    /// Wrap tile layers around instead of clipping at their edges.
    pub repeat_tiles: bool,
    /// Initial viewport size in device pixels.
    pub viewport: Option<(f32, f32)>,
}

impl Default for TilemapOptions {
    fn default() -> Self {
        Self {
            tile_scale: 1.0,
            repeat_tiles: false,
            viewport: None,
        }
    }
}

impl TilemapOptions {
    /// Parses options, taking defaults for missing fields.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
