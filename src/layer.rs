mod animation;
mod image_layer;
mod tile_layer;

pub use animation::AnimationClock;
pub use image_layer::ImageLayerState;
pub use tile_layer::TileLayerState;

use crate::gpu::Gpu;
use macroquad::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Tile,
    Image,
}

/// A drawable layer. Draw order is the order of [`Tilemap::layers`](crate::Tilemap::layers).
#[derive(Debug)]
pub enum Layer<T> {
    Tile(TileLayerState<T>),
    Image(ImageLayerState<T>),
}

impl<T> Layer<T> {
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Tile(_) => LayerKind::Tile,
            Layer::Image(_) => LayerKind::Image,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Layer::Tile(l) => &l.name,
            Layer::Image(l) => &l.name,
        }
    }

    pub fn visible(&self) -> bool {
        match self {
            Layer::Tile(l) => l.visible(),
            Layer::Image(l) => l.visible(),
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        match self {
            Layer::Tile(l) => l.set_visible(visible),
            Layer::Image(l) => l.set_visible(visible),
        }
    }

    pub fn opacity(&self) -> f32 {
        match self {
            Layer::Tile(l) => l.opacity(),
            Layer::Image(l) => l.opacity(),
        }
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        match self {
            Layer::Tile(l) => l.set_opacity(opacity),
            Layer::Image(l) => l.set_opacity(opacity),
        }
    }

    pub fn offset(&self) -> Vec2 {
        match self {
            Layer::Tile(l) => l.offset(),
            Layer::Image(l) => l.offset(),
        }
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        match self {
            Layer::Tile(l) => l.set_offset(offset),
            Layer::Image(l) => l.set_offset(offset),
        }
    }

    pub fn scroll_scale(&self) -> Vec2 {
        match self {
            Layer::Tile(l) => l.scroll_scale(),
            Layer::Image(l) => l.scroll_scale(),
        }
    }

    pub fn set_scroll_scale(&mut self, scroll_scale: Vec2) {
        match self {
            Layer::Tile(l) => l.set_scroll_scale(scroll_scale),
            Layer::Image(l) => l.set_scroll_scale(scroll_scale),
        }
    }

    /// The texture bound to unit 0 when this layer draws.
    pub fn texture(&self) -> &T {
        match self {
            Layer::Tile(l) => l.texture(),
            Layer::Image(l) => l.texture(),
        }
    }

    pub fn screen_offset(&self, camera: Vec2, tile_scale: f32) -> Vec2 {
        match self {
            Layer::Tile(l) => l.screen_offset(camera, tile_scale),
            Layer::Image(l) => l.screen_offset(camera, tile_scale),
        }
    }

    pub fn upload_uniforms<G>(&self, gpu: &mut G)
    where
        G: Gpu<Texture = T>,
    {
        match self {
            Layer::Tile(l) => l.upload_uniforms(gpu),
            Layer::Image(l) => l.upload_uniforms(gpu),
        }
    }

    pub fn as_tile(&self) -> Option<&TileLayerState<T>> {
        match self {
            Layer::Tile(l) => Some(l),
            Layer::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageLayerState<T>> {
        match self {
            Layer::Image(l) => Some(l),
            Layer::Tile(_) => None,
        }
    }
}
