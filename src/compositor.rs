use crate::atlas::TilesetAtlasRegistry;
use crate::error::MapError;
use crate::gpu::{Gpu, Uniform};
use crate::ir_map::{IrLayerKind, IrMap};
use crate::layer::{ImageLayerState, Layer, LayerKind, TileLayerState};
use crate::options::TilemapOptions;
use crate::packing::PackedUniforms;
use crate::shader::{ProgramCache, TileProgram};
use crate::viewport::Viewport;
use macroquad::prelude::*;
use std::path::Path;

/// Two triangles covering clip space, interleaved `x, y, u, v`.
#[rustfmt::skip]
pub const QUAD_VERTICES: [f32; 24] = [
    -1.0, -1.0, 0.0, 1.0,
     1.0, -1.0, 1.0, 1.0,
     1.0,  1.0, 1.0, 0.0,

    -1.0, -1.0, 0.0, 1.0,
     1.0,  1.0, 1.0, 0.0,
    -1.0,  1.0, 0.0, 0.0,
];
/// Vertices drawn per layer.
pub const QUAD_VERTEX_COUNT: usize = 6;

/// What one [`Tilemap::draw`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Programs bound, including the first one of the frame.
    pub program_binds: usize,
    /// Binds caused by a layer kind differing from the previous visible layer.
    pub program_switches: usize,
    /// One per visible layer.
    pub draw_calls: usize,
    /// Invisible layers, plus tile layers without a tile program.
    pub skipped_layers: usize,
}

/// Binding state the draw loop carries from one visible layer to the next.
#[derive(Debug, Default)]
struct FrameState {
    /// Kind of the last visible layer drawn; `None` until a program is bound.
    last_kind: Option<LayerKind>,
    stats: FrameStats,
}

/// Composites every layer of a map with one quad draw per visible layer.
pub struct Tilemap<G: Gpu> {
    gpu: G,
    tilesets: TilesetAtlasRegistry<G::Texture>,
    layers: Vec<Layer<G::Texture>>,
    programs: ProgramCache<G::Program>,
    quad: G::Buffer,
    viewport: Viewport,
}

impl<G: Gpu> Tilemap<G> {
    /// Builds textures, packs the tile shader arrays and compiles both
    /// programs. Image paths in `map` are resolved against `base_dir`.
    pub fn new(
        mut gpu: G,
        map: IrMap,
        base_dir: &Path,
        options: &TilemapOptions,
    ) -> Result<Self, MapError> {
        if map.tile_w == 0 || map.tile_h == 0 {
            return Err(MapError::InvalidMap(format!(
                "map tile size must be positive, got {}x{}",
                map.tile_w, map.tile_h
            )));
        }

        let quad = gpu.create_quad(&QUAD_VERTICES);
        let tilesets = TilesetAtlasRegistry::new(&mut gpu, &map.tilesets, base_dir)?;

        let available_units = gpu.max_texture_units();
        if tilesets.image_count() + 1 > available_units {
            return Err(MapError::TooManyTilesetImages {
                images: tilesets.image_count(),
                available_units,
            });
        }

        let mut layers = Vec::with_capacity(map.layers.len());
        for desc in &map.layers {
            let layer = match &desc.kind {
                IrLayerKind::Tiles {
                    width,
                    height,
                    data,
                } => Layer::Tile(TileLayerState::new(
                    &mut gpu, desc, *width, *height, data, &tilesets,
                )?),
                IrLayerKind::Image { image } => {
                    Layer::Image(ImageLayerState::new(&mut gpu, desc, image, base_dir)?)
                }
            };
            layers.push(layer);
        }

        let has_tile_layers = layers.iter().any(|l| l.kind() == LayerKind::Tile);
        let tile_program = if tilesets.image_count() > 0 {
            let packed = PackedUniforms::pack(&tilesets);
            let inverse_tile_size = vec2(1.0 / map.tile_w as f32, 1.0 / map.tile_h as f32);
            Some(TileProgram::compile(&mut gpu, packed, inverse_tile_size)?)
        } else if has_tile_layers {
            return Err(MapError::InvalidMap(
                "map has tile layers but no tileset images".to_owned(),
            ));
        } else {
            None
        };
        let programs = ProgramCache::new(&mut gpu, tile_program)?;

        log::debug!(
            "tilemap ready: {} layers, {} tilesets, {} tileset images",
            layers.len(),
            tilesets.len(),
            tilesets.image_count()
        );

        let mut tilemap = Self {
            gpu,
            tilesets,
            layers,
            programs,
            quad,
            viewport: Viewport::default(),
        };
        tilemap.set_tile_scale(options.tile_scale);
        tilemap.set_repeat_tiles(options.repeat_tiles);
        if let Some((w, h)) = options.viewport {
            tilemap.resize_viewport(w, h);
        }
        Ok(tilemap)
    }

    /// Layers in draw order.
    pub fn layers(&self) -> &[Layer<G::Texture>] {
        &self.layers
    }

    /// Mutable access to the layer at `index`, for visibility and offset changes.
    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer<G::Texture>> {
        self.layers.get_mut(index)
    }

    /// First layer named `name`.
    pub fn layer_by_name(&self, name: &str) -> Option<&Layer<G::Texture>> {
        self.layers.iter().find(|l| l.name() == name)
    }

    #[allow(missing_docs)]
    pub fn layer_by_name_mut(&mut self, name: &str) -> Option<&mut Layer<G::Texture>> {
        self.layers.iter_mut().find(|l| l.name() == name)
    }

    /// Loaded tilesets and their textures.
    pub fn tilesets(&self) -> &TilesetAtlasRegistry<G::Texture> {
        &self.tilesets
    }

    /// The packed tile shader arrays, if the map has any tileset image.
    pub fn packed_uniforms(&self) -> Option<&PackedUniforms> {
        self.programs.tile().map(|t| t.packed())
    }

    /// The backend, e.g. to inspect a [`RecordingGpu`](crate::gpu::RecordingGpu) call log.
    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    #[allow(missing_docs)]
    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    /// Viewport width in device pixels.
    pub fn viewport_width(&self) -> f32 {
        self.viewport.size().x
    }

    /// Viewport height in device pixels.
    pub fn viewport_height(&self) -> f32 {
        self.viewport.size().y
    }

    /// Viewport width divided by the tile scale, as the shaders see it.
    pub fn scaled_viewport_width(&self) -> f32 {
        self.viewport.scaled().x
    }

    #[allow(missing_docs)]
    pub fn scaled_viewport_height(&self) -> f32 {
        self.viewport.scaled().y
    }

    /// Resizes the viewport; both programs get the new scaled size. Repeating
    /// the current size does nothing.
    pub fn resize_viewport(&mut self, width: f32, height: f32) {
        if self.viewport.resize(width, height) {
            self.push_viewport();
        }
    }

    /// Device pixels per map pixel.
    pub fn tile_scale(&self) -> f32 {
        self.viewport.tile_scale()
    }

    /// Changes the tile scale; non-positive values are ignored.
    pub fn set_tile_scale(&mut self, scale: f32) {
        if self.viewport.set_tile_scale(scale) {
            self.push_viewport();
        }
    }

    fn push_viewport(&mut self) {
        log::trace!("viewport scaled to {:?}", self.viewport.scaled());
        self.programs
            .push_viewport(&mut self.gpu, self.viewport.scaled());
    }

    /// Turns wrap-around sampling on or off for every tile layer.
    pub fn set_repeat_tiles(&mut self, repeat: bool) {
        for layer in &mut self.layers {
            if let Layer::Tile(tile) = layer {
                tile.set_repeat_tiles(repeat);
            }
        }
    }

    /// Advances tile animations by `dt_ms` milliseconds and re-uploads the
    /// data of every layer whose visible frames changed.
    pub fn update(&mut self, dt_ms: f32) {
        for layer in &mut self.layers {
            if let Layer::Tile(tile) = layer {
                if tile.update(dt_ms, &self.tilesets) {
                    tile.flush(&mut self.gpu);
                }
            }
        }
    }

    /// Draws every visible layer with the camera at (`x`, `y`).
    pub fn draw(&mut self, x: f32, y: f32) -> FrameStats {
        let camera = vec2(x, y);
        let tile_scale = self.viewport.tile_scale();
        let gpu = &mut self.gpu;

        gpu.begin_frame();
        gpu.bind_quad(&self.quad);

        for bound in self.tilesets.images() {
            gpu.active_texture(bound.texture_unit);
            gpu.bind_texture(&bound.image.texture);
        }
        gpu.active_texture(0);

        let mut frame = FrameState::default();

        for layer in &self.layers {
            if !layer.visible() {
                frame.stats.skipped_layers += 1;
                continue;
            }

            let kind = layer.kind();
            if frame.last_kind != Some(kind) {
                if !self.programs.bind(gpu, kind) {
                    frame.stats.skipped_layers += 1;
                    continue;
                }
                if frame.last_kind.is_some() {
                    frame.stats.program_switches += 1;
                }
                frame.stats.program_binds += 1;
                frame.last_kind = Some(kind);
            }

            layer.upload_uniforms(gpu);
            gpu.set_uniform(
                "uOffset",
                Uniform::Vec2(layer.screen_offset(camera, tile_scale)),
            );

            gpu.bind_texture(layer.texture());
            gpu.draw_triangles(0, QUAD_VERTEX_COUNT);
            frame.stats.draw_calls += 1;
        }

        gpu.end_frame();
        frame.stats
    }
}
