//! The graphics-context seam.
//!
//! The compositor speaks a small GL-style protocol: one active program, an
//! active texture unit, textures bound per unit, and uniforms written to the
//! currently bound program. Backends own that binding state.

mod macroquad_gpu;
pub mod recording;

pub use self::macroquad_gpu::MacroquadGpu;
pub use self::recording::RecordingGpu;

use crate::error::MapError;
use macroquad::prelude::Vec2;
use std::path::Path;

/// Attribute name to location mapping shared by every program.
pub const ATTRIBUTES: [(&str, u32); 2] = [("aPosition", 0), ("aTexture", 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Float,
    Vec2,
    Sampler,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: &'static str,
    pub kind: UniformKind,
    /// Array length; 1 for scalars.
    pub count: usize,
}

impl UniformDecl {
    pub const fn new(name: &'static str, kind: UniformKind) -> Self {
        Self {
            name,
            kind,
            count: 1,
        }
    }

    pub const fn array(name: &'static str, kind: UniformKind, count: usize) -> Self {
        Self { name, kind, count }
    }
}

/// Everything a backend needs to compile and link one program.
#[derive(Debug, Clone)]
pub struct ProgramDesc<'a> {
    pub label: &'static str,
    pub vertex: &'a str,
    pub fragment: &'a str,
    pub uniforms: Vec<UniformDecl>,
}

/// A value written to a uniform of the bound program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform<'a> {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Ints(&'a [i32]),
    /// Flattened `vec2` array, two floats per element.
    Vec2s(&'a [f32]),
}

/// A decoded image living on the GPU.
#[derive(Debug, Clone)]
pub struct LoadedTexture<T> {
    pub texture: T,
    pub width: u32,
    pub height: u32,
}

pub trait Gpu {
    type Texture: Clone;
    type Program;
    type Buffer;

    /// Texture units usable by a fragment shader.
    fn max_texture_units(&self) -> usize;

    fn load_texture(&mut self, path: &Path) -> Result<LoadedTexture<Self::Texture>, MapError>;

    /// Creates a nearest-filtered RGBA8 texture.
    fn create_data_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Self::Texture;

    fn update_data_texture(
        &mut self,
        texture: &Self::Texture,
        width: u32,
        height: u32,
        rgba: &[u8],
    );

    /// Uploads interleaved `x, y, u, v` vertices for a static quad.
    fn create_quad(&mut self, vertices: &[f32]) -> Self::Buffer;

    fn compile_program(&mut self, desc: &ProgramDesc<'_>) -> Result<Self::Program, MapError>;

    /// Starts a frame with straight-alpha "over" blending enabled.
    fn begin_frame(&mut self);

    fn end_frame(&mut self);

    fn bind_quad(&mut self, quad: &Self::Buffer);

    fn active_texture(&mut self, unit: usize);

    /// Binds to the active unit.
    fn bind_texture(&mut self, texture: &Self::Texture);

    fn use_program(&mut self, program: &Self::Program);

    /// Writes to the bound program.
    fn set_uniform(&mut self, name: &str, value: Uniform<'_>);

    fn draw_triangles(&mut self, first: usize, count: usize);
}
