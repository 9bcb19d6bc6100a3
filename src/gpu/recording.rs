//! A headless [`Gpu`] that records every call instead of touching a GPU.

use super::{Gpu, LoadedTexture, ProgramDesc, Uniform, UniformDecl};
use crate::error::MapError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordedTexture(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordedProgram(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordedQuad(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedUniform {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Ints(Vec<i32>),
    Vec2s(Vec<f32>),
}

impl From<Uniform<'_>> for RecordedUniform {
    fn from(value: Uniform<'_>) -> Self {
        match value {
            Uniform::Int(v) => RecordedUniform::Int(v),
            Uniform::Float(v) => RecordedUniform::Float(v),
            Uniform::Vec2(v) => RecordedUniform::Vec2(v.to_array()),
            Uniform::Ints(vs) => RecordedUniform::Ints(vs.to_vec()),
            Uniform::Vec2s(vs) => RecordedUniform::Vec2s(vs.to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    BeginFrame,
    EndFrame,
    BindQuad(RecordedQuad),
    ActiveTexture(usize),
    BindTexture(RecordedTexture),
    UseProgram(RecordedProgram),
    SetUniform {
        program: Option<RecordedProgram>,
        name: String,
        value: RecordedUniform,
    },
    Draw {
        first: usize,
        count: usize,
    },
    UpdateTexture(RecordedTexture),
}

#[derive(Debug, Clone)]
pub struct ProgramRecord {
    pub label: &'static str,
    pub vertex: String,
    pub fragment: String,
    pub uniforms: Vec<UniformDecl>,
}

#[derive(Debug, Clone)]
pub struct TextureRecord {
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Images are registered up front with [`RecordingGpu::with_image`]; loading
/// anything else fails the way a missing file would. Fragment sources that
/// still carry unresolved `#pragma NUM_` markers fail to "compile".
#[derive(Debug, Default)]
pub struct RecordingGpu {
    pub calls: Vec<GpuCall>,
    images: HashMap<PathBuf, (u32, u32)>,
    textures: Vec<TextureRecord>,
    programs: Vec<ProgramRecord>,
    quads: Vec<Vec<f32>>,
    bound_program: Option<RecordedProgram>,
    max_units: Option<usize>,
}

impl RecordingGpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        self.images.insert(path.into(), (width, height));
        self
    }

    pub fn with_max_texture_units(mut self, units: usize) -> Self {
        self.max_units = Some(units);
        self
    }

    /// Drains the call log.
    pub fn take_calls(&mut self) -> Vec<GpuCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn program(&self, program: RecordedProgram) -> &ProgramRecord {
        &self.programs[program.0 as usize]
    }

    pub fn program_by_label(&self, label: &str) -> Option<RecordedProgram> {
        self.programs
            .iter()
            .position(|p| p.label == label)
            .map(|i| RecordedProgram(i as u32))
    }

    pub fn texture(&self, texture: RecordedTexture) -> &TextureRecord {
        &self.textures[texture.0 as usize]
    }

    pub fn quad_vertices(&self, quad: RecordedQuad) -> &[f32] {
        &self.quads[quad.0 as usize]
    }

    fn push_texture(&mut self, record: TextureRecord) -> RecordedTexture {
        self.textures.push(record);
        RecordedTexture(self.textures.len() as u32 - 1)
    }
}

impl Gpu for RecordingGpu {
    type Texture = RecordedTexture;
    type Program = RecordedProgram;
    type Buffer = RecordedQuad;

    fn max_texture_units(&self) -> usize {
        self.max_units.unwrap_or(16)
    }

    fn load_texture(&mut self, path: &Path) -> Result<LoadedTexture<RecordedTexture>, MapError> {
        let Some(&(width, height)) = self.images.get(path) else {
            return Err(MapError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "image not registered"),
            });
        };
        let texture = self.push_texture(TextureRecord {
            path: Some(path.to_path_buf()),
            width,
            height,
            data: Vec::new(),
        });
        Ok(LoadedTexture {
            texture,
            width,
            height,
        })
    }

    fn create_data_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> RecordedTexture {
        self.push_texture(TextureRecord {
            path: None,
            width,
            height,
            data: rgba.to_vec(),
        })
    }

    fn update_data_texture(
        &mut self,
        texture: &RecordedTexture,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) {
        let record = &mut self.textures[texture.0 as usize];
        record.width = width;
        record.height = height;
        record.data = rgba.to_vec();
        self.calls.push(GpuCall::UpdateTexture(*texture));
    }

    fn create_quad(&mut self, vertices: &[f32]) -> RecordedQuad {
        self.quads.push(vertices.to_vec());
        RecordedQuad(self.quads.len() as u32 - 1)
    }

    fn compile_program(&mut self, desc: &ProgramDesc<'_>) -> Result<RecordedProgram, MapError> {
        if desc.fragment.contains("#pragma NUM_") {
            return Err(MapError::Shader {
                program: desc.label,
                message: "unresolved array size marker".to_owned(),
            });
        }
        self.programs.push(ProgramRecord {
            label: desc.label,
            vertex: desc.vertex.to_owned(),
            fragment: desc.fragment.to_owned(),
            uniforms: desc.uniforms.clone(),
        });
        Ok(RecordedProgram(self.programs.len() as u32 - 1))
    }

    fn begin_frame(&mut self) {
        self.calls.push(GpuCall::BeginFrame);
    }

    fn end_frame(&mut self) {
        self.calls.push(GpuCall::EndFrame);
    }

    fn bind_quad(&mut self, quad: &RecordedQuad) {
        self.calls.push(GpuCall::BindQuad(*quad));
    }

    fn active_texture(&mut self, unit: usize) {
        self.calls.push(GpuCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, texture: &RecordedTexture) {
        self.calls.push(GpuCall::BindTexture(*texture));
    }

    fn use_program(&mut self, program: &RecordedProgram) {
        self.bound_program = Some(*program);
        self.calls.push(GpuCall::UseProgram(*program));
    }

    fn set_uniform(&mut self, name: &str, value: Uniform<'_>) {
        self.calls.push(GpuCall::SetUniform {
            program: self.bound_program,
            name: name.to_owned(),
            value: value.into(),
        });
    }

    fn draw_triangles(&mut self, first: usize, count: usize) {
        self.calls.push(GpuCall::Draw { first, count });
    }
}
