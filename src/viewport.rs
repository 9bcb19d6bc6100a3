use macroquad::prelude::*;

/// Raw viewport size plus the uniform tile scale.
///
/// Setters return true only when something changed; callers re-push the
/// scaled size to the shaders exactly then.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    size: Vec2,
    scaled: Vec2,
    tile_scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            size: Vec2::ZERO,
            scaled: Vec2::ZERO,
            tile_scale: 1.0,
        }
    }
}

impl Viewport {
    /// Sets the device-pixel size.
    pub fn resize(&mut self, width: f32, height: f32) -> bool {
        let size = vec2(width, height);
        if size == self.size {
            return false;
        }
        self.size = size;
        self.rescale();
        true
    }

    /// Non-positive or non-finite scales are rejected.
    pub fn set_tile_scale(&mut self, scale: f32) -> bool {
        if !scale.is_finite() || scale <= 0.0 {
            log::warn!("ignoring invalid tile scale {}", scale);
            return false;
        }
        if scale == self.tile_scale {
            return false;
        }
        self.tile_scale = scale;
        self.rescale();
        true
    }

    fn rescale(&mut self) {
        self.scaled = self.size / self.tile_scale;
    }

    /// Device-pixel size.
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Size divided by the tile scale.
    pub fn scaled(&self) -> Vec2 {
        self.scaled
    }

    #[allow(missing_docs)]
    pub fn tile_scale(&self) -> f32 {
        self.tile_scale
    }
}
