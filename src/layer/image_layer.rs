use crate::error::MapError;
use crate::gpu::{Gpu, Uniform};
use crate::ir_map::IrLayer;
use macroquad::prelude::*;
use std::path::Path;

#[derive(Debug)]
pub struct ImageLayerState<T> {
    pub name: String,
    visible: bool,
    opacity: f32,
    offset: Vec2,
    scroll_scale: Vec2,
    texture: T,
    size: Vec2,
}

impl<T> ImageLayerState<T> {
    pub fn new<G>(gpu: &mut G, desc: &IrLayer, image: &Path, base_dir: &Path) -> Result<Self, MapError>
    where
        G: Gpu<Texture = T>,
    {
        let loaded = gpu.load_texture(&base_dir.join(image))?;
        if loaded.width == 0 || loaded.height == 0 {
            return Err(MapError::Texture {
                path: image.to_path_buf(),
                message: "image has no pixels".to_owned(),
            });
        }
        Ok(Self {
            name: desc.name.clone(),
            visible: desc.visible,
            opacity: desc.opacity,
            offset: desc.offset,
            scroll_scale: desc.parallax,
            texture: loaded.texture,
            size: vec2(loaded.width as f32, loaded.height as f32),
        })
    }

    pub fn upload_uniforms<G>(&self, gpu: &mut G)
    where
        G: Gpu<Texture = T>,
    {
        gpu.set_uniform("uAlpha", Uniform::Float(self.opacity));
        gpu.set_uniform("uSize", Uniform::Vec2(self.size));
    }

    /// Mirrors the tile-layer convention: the layer offset is added unscaled on
    /// x and subtracted on y, and only the parallax camera term is scaled.
    pub fn screen_offset(&self, camera: Vec2, tile_scale: f32) -> Vec2 {
        let motion = camera * self.scroll_scale * tile_scale;
        vec2(
            (self.offset.x - motion.x).floor(),
            (-self.offset.y + motion.y).floor(),
        )
    }

    pub fn texture(&self) -> &T {
        &self.texture
    }

    /// Image size in pixels.
    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    pub fn scroll_scale(&self) -> Vec2 {
        self.scroll_scale
    }

    pub fn set_scroll_scale(&mut self, scroll_scale: Vec2) {
        self.scroll_scale = scroll_scale;
    }
}
