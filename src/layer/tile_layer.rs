use super::animation::AnimationClock;
use crate::atlas::TilesetAtlasRegistry;
use crate::error::MapError;
use crate::gpu::{Gpu, Uniform};
use crate::ir_map::{IrLayer, FLIPPED_DIAGONALLY, FLIPPED_HORIZONTALLY, FLIPPED_VERTICALLY, GID_MASK};
use macroquad::prelude::*;
use std::collections::HashMap;

const EMPTY_CELL: [u8; 4] = [255; 4];

/// Flip bits as stored in the alpha channel of the layer data texture.
fn flip_bits(raw_gid: u32) -> u8 {
    let mut bits = 0;
    if raw_gid & FLIPPED_HORIZONTALLY != 0 {
        bits |= 1;
    }
    if raw_gid & FLIPPED_VERTICALLY != 0 {
        bits |= 2;
    }
    if raw_gid & FLIPPED_DIAGONALLY != 0 {
        bits |= 4;
    }
    bits
}

/// One texel: column, row, global image index, flip bits.
fn encode_cell<T>(registry: &TilesetAtlasRegistry<T>, gid: u32, flips: u8) -> Option<[u8; 4]> {
    let loc = registry.locate(gid)?;
    Some([loc.column, loc.row, loc.image, flips])
}

/// Cells showing one animated tile definition.
#[derive(Debug, Clone)]
struct AnimatedCells {
    clock: AnimationClock,
    /// (cell index, flip bits)
    cells: Vec<(usize, u8)>,
}

/// Runtime state of a tile layer: its data texture and animation clocks.
#[derive(Debug)]
pub struct TileLayerState<T> {
    pub name: String,
    width: usize,
    height: usize,
    visible: bool,
    opacity: f32,
    offset: Vec2,
    scroll_scale: Vec2,
    repeat_tiles: bool,
    texels: Vec<u8>,
    texture: T,
    animations: Vec<AnimatedCells>,
    dirty: bool,
}

impl<T> TileLayerState<T> {
    pub fn new<G>(
        gpu: &mut G,
        desc: &IrLayer,
        width: usize,
        height: usize,
        data: &[u32],
        registry: &TilesetAtlasRegistry<T>,
    ) -> Result<Self, MapError>
    where
        G: Gpu<Texture = T>,
    {
        if data.len() != width * height {
            return Err(MapError::InvalidLayerSize {
                layer: desc.name.clone(),
                expected: width * height,
                actual: data.len(),
            });
        }
        if width == 0 || height == 0 || width > u16::MAX as usize || height > u16::MAX as usize {
            return Err(MapError::InvalidMap(format!(
                "tile layer '{}' is {}x{}; each side must be 1..=65535",
                desc.name, width, height
            )));
        }

        let mut texels = Vec::with_capacity(data.len() * 4);
        let mut by_gid: HashMap<u32, usize> = HashMap::new();
        let mut animations: Vec<AnimatedCells> = Vec::new();

        for (cell, &raw) in data.iter().enumerate() {
            let gid = raw & GID_MASK;
            if gid == 0 {
                texels.extend(EMPTY_CELL);
                continue;
            }
            let flips = flip_bits(raw);
            let mut shown = gid;

            if let Some(frames) = registry.animation(gid) {
                let slot = *by_gid.entry(gid).or_insert_with(|| {
                    animations.push(AnimatedCells {
                        clock: AnimationClock::new(frames.to_vec()),
                        cells: Vec::new(),
                    });
                    animations.len() - 1
                });
                animations[slot].cells.push((cell, flips));
                shown = animations[slot].clock.current_gid();
            }

            let texel = encode_cell(registry, shown, flips).ok_or(MapError::InvalidTileGid {
                layer: desc.name.clone(),
                gid: shown,
                max_gid: registry.max_gid(),
            })?;
            texels.extend(texel);
        }

        let texture = gpu.create_data_texture(width as u32, height as u32, &texels);
        log::debug!(
            "tile layer '{}': {}x{}, {} animated tile definitions",
            desc.name,
            width,
            height,
            animations.len()
        );

        Ok(Self {
            name: desc.name.clone(),
            width,
            height,
            visible: desc.visible,
            opacity: desc.opacity,
            offset: desc.offset,
            scroll_scale: desc.parallax,
            repeat_tiles: false,
            texels,
            texture,
            animations,
            dirty: false,
        })
    }

    /// Advances every animation clock by `dt_ms` and rewrites the cells whose
    /// frame changed. Returns true when the data texture needs re-uploading.
    pub fn update(&mut self, dt_ms: f32, registry: &TilesetAtlasRegistry<T>) -> bool {
        for anim in &mut self.animations {
            if !anim.clock.advance(f64::from(dt_ms)) {
                continue;
            }
            let gid = anim.clock.current_gid();
            // The registry rejects animations with unresolvable frames.
            let Some(texel) = encode_cell(registry, gid, 0) else {
                log::warn!("layer '{}': animation frame gid {} has no image cell", self.name, gid);
                continue;
            };
            for &(cell, flips) in &anim.cells {
                self.texels[cell * 4..cell * 4 + 3].copy_from_slice(&texel[..3]);
                self.texels[cell * 4 + 3] = flips;
            }
            log::trace!("layer '{}': animation now shows gid {}", self.name, gid);
            self.dirty = true;
        }
        self.dirty
    }

    /// Pushes pending texel changes to the GPU.
    pub fn flush<G>(&mut self, gpu: &mut G)
    where
        G: Gpu<Texture = T>,
    {
        if self.dirty {
            gpu.update_data_texture(
                &self.texture,
                self.width as u32,
                self.height as u32,
                &self.texels,
            );
            self.dirty = false;
        }
    }

    pub fn upload_uniforms<G>(&self, gpu: &mut G)
    where
        G: Gpu<Texture = T>,
    {
        gpu.set_uniform("uAlpha", Uniform::Float(self.opacity));
        gpu.set_uniform("uRepeatTiles", Uniform::Int(self.repeat_tiles as i32));
        gpu.set_uniform(
            "uInverseLayerTileCount",
            Uniform::Vec2(vec2(1.0 / self.width as f32, 1.0 / self.height as f32)),
        );
    }

    /// Device-pixel offset: camera motion scaled by parallax, minus the layer offset.
    pub fn screen_offset(&self, camera: Vec2, tile_scale: f32) -> Vec2 {
        ((-self.offset + camera * self.scroll_scale) * tile_scale).floor()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn texture(&self) -> &T {
        &self.texture
    }

    /// Raw RGBA texels of the data texture.
    pub fn texels(&self) -> &[u8] {
        &self.texels
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

    pub fn repeat_tiles(&self) -> bool {
        self.repeat_tiles
    }

    pub fn set_repeat_tiles(&mut self, repeat: bool) {
        self.repeat_tiles = repeat;
    }

    /// Number of distinct animated tiles used by this layer.
    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }
}
