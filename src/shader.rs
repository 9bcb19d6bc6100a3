use crate::error::MapError;
use crate::gpu::{Gpu, ProgramDesc, Uniform, UniformDecl, UniformKind};
use crate::layer::LayerKind;
use crate::packing::PackedUniforms;
use macroquad::prelude::*;

pub const TILELAYER_VERT: &str = include_str!("shaders/tilelayer.vert");
pub const TILELAYER_FRAG: &str = include_str!("shaders/tilelayer.frag");
pub const IMAGELAYER_VERT: &str = include_str!("shaders/imagelayer.vert");
pub const IMAGELAYER_FRAG: &str = include_str!("shaders/imagelayer.frag");

const NUM_TILESETS_MARKER: &str = "#pragma NUM_TILESETS";
const NUM_TILESET_IMAGES_MARKER: &str = "#pragma NUM_TILESET_IMAGES";

/// Substitutes the array-size markers of the tile fragment shader.
pub fn specialize_tile_fragment(source: &str, tilesets: usize, images: usize) -> String {
    source
        .replacen(
            NUM_TILESETS_MARKER,
            &format!("#define NUM_TILESETS {tilesets}"),
            1,
        )
        .replacen(
            NUM_TILESET_IMAGES_MARKER,
            &format!("#define NUM_TILESET_IMAGES {images}"),
            1,
        )
}

fn tile_uniforms(images: usize) -> Vec<UniformDecl> {
    vec![
        UniformDecl::new("uViewportSize", UniformKind::Vec2),
        UniformDecl::new("uOffset", UniformKind::Vec2),
        UniformDecl::new("uInverseLayerTileSize", UniformKind::Vec2),
        UniformDecl::new("uInverseLayerTileCount", UniformKind::Vec2),
        UniformDecl::array("uTilesetTileSize", UniformKind::Vec2, images),
        UniformDecl::array("uInverseTilesetTextureSize", UniformKind::Vec2, images),
        UniformDecl::new("uAlpha", UniformKind::Float),
        UniformDecl::new("uRepeatTiles", UniformKind::Int),
        UniformDecl::new("uLayer", UniformKind::Sampler),
        UniformDecl::array("uTilesets", UniformKind::Sampler, images),
    ]
}

fn image_uniforms() -> Vec<UniformDecl> {
    vec![
        UniformDecl::new("uViewportSize", UniformKind::Vec2),
        UniformDecl::new("uOffset", UniformKind::Vec2),
        UniformDecl::new("uSize", UniformKind::Vec2),
        UniformDecl::new("uAlpha", UniformKind::Float),
        UniformDecl::new("uImage", UniformKind::Sampler),
    ]
}

/// The tile-layer program, specialized for one set of packed arrays.
///
/// Only constructible from a [`PackedUniforms`], so the compiled array sizes
/// and the data uploaded into them cannot disagree.
pub struct TileProgram<P> {
    program: P,
    packed: PackedUniforms,
    inverse_layer_tile_size: Vec2,
}

impl<P> TileProgram<P> {
    pub fn compile<G>(
        gpu: &mut G,
        packed: PackedUniforms,
        inverse_layer_tile_size: Vec2,
    ) -> Result<Self, MapError>
    where
        G: Gpu<Program = P>,
    {
        let fragment =
            specialize_tile_fragment(TILELAYER_FRAG, packed.tileset_count(), packed.image_count());
        let program = gpu.compile_program(&ProgramDesc {
            label: "tilelayer",
            vertex: TILELAYER_VERT,
            fragment: &fragment,
            uniforms: tile_uniforms(packed.image_count()),
        })?;
        Ok(Self {
            program,
            packed,
            inverse_layer_tile_size,
        })
    }

    pub fn packed(&self) -> &PackedUniforms {
        &self.packed
    }

    fn upload_static<G>(&self, gpu: &mut G)
    where
        G: Gpu<Program = P>,
    {
        gpu.set_uniform("uLayer", Uniform::Int(0));
        gpu.set_uniform(
            "uInverseLayerTileSize",
            Uniform::Vec2(self.inverse_layer_tile_size),
        );
        gpu.set_uniform("uTilesets", Uniform::Ints(self.packed.texture_units()));
        gpu.set_uniform("uTilesetTileSize", Uniform::Vec2s(self.packed.tile_sizes()));
        gpu.set_uniform(
            "uInverseTilesetTextureSize",
            Uniform::Vec2s(self.packed.inverse_texture_sizes()),
        );
    }
}

/// Both layer programs plus the one-time upload latch for the tile program.
pub struct ProgramCache<P> {
    /// Absent when the map has no tileset images; construction guarantees
    /// there are no tile layers then.
    tile: Option<TileProgram<P>>,
    image: P,
    tile_statics_uploaded: bool,
}

impl<P> ProgramCache<P> {
    pub fn new<G>(gpu: &mut G, tile: Option<TileProgram<P>>) -> Result<Self, MapError>
    where
        G: Gpu<Program = P>,
    {
        let image = gpu.compile_program(&ProgramDesc {
            label: "imagelayer",
            vertex: IMAGELAYER_VERT,
            fragment: IMAGELAYER_FRAG,
            uniforms: image_uniforms(),
        })?;
        Ok(Self {
            tile,
            image,
            tile_statics_uploaded: false,
        })
    }

    pub fn tile(&self) -> Option<&TileProgram<P>> {
        self.tile.as_ref()
    }

    /// Binds the program for `kind`. The tile program's static arrays are
    /// pushed the first time it is bound and never again.
    pub fn bind<G>(&mut self, gpu: &mut G, kind: LayerKind) -> bool
    where
        G: Gpu<Program = P>,
    {
        match kind {
            LayerKind::Tile => {
                let Some(tile) = &self.tile else {
                    return false;
                };
                gpu.use_program(&tile.program);
                if !self.tile_statics_uploaded {
                    self.tile_statics_uploaded = true;
                    tile.upload_static(gpu);
                }
                true
            }
            LayerKind::Image => {
                gpu.use_program(&self.image);
                true
            }
        }
    }

    /// Writes `uViewportSize` into every program, leaving the last one bound.
    pub fn push_viewport<G>(&self, gpu: &mut G, scaled: Vec2)
    where
        G: Gpu<Program = P>,
    {
        if let Some(tile) = &self.tile {
            gpu.use_program(&tile.program);
            gpu.set_uniform("uViewportSize", Uniform::Vec2(scaled));
        }
        gpu.use_program(&self.image);
        gpu.set_uniform("uViewportSize", Uniform::Vec2(scaled));
    }
}
