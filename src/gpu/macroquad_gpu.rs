use super::{Gpu, LoadedTexture, ProgramDesc, Uniform, UniformDecl, UniformKind, ATTRIBUTES};
use crate::error::MapError;
use macroquad::miniquad::{
    BlendFactor, BlendState, BlendValue, BufferId, BufferLayout, BufferSource, BufferType,
    BufferUsage, Bindings, Equation, PassAction, Pipeline, PipelineParams, ShaderMeta,
    ShaderSource, TextureId, UniformBlockLayout, UniformDesc, UniformType, VertexAttribute,
    VertexFormat,
};
use macroquad::prelude::*;
use macroquad::window::get_internal_gl;
use std::path::Path;

/// miniquad guarantees at least this many fragment units on every backend it targets.
const FRAGMENT_TEXTURE_UNITS: usize = 16;

/// [`Gpu`] backed by macroquad's miniquad context.
///
/// miniquad has no persistent GL binding state, so this keeps it host-side:
/// uniform values live in a per-program byte block, texture bindings live in a
/// unit table, and both are resolved into a pipeline/bindings pair at draw time.
/// A sampler uniform picks which unit its texture comes from, exactly like
/// `glUniform1i` on a sampler.
pub struct MacroquadGpu {
    programs: Vec<ProgramSlot>,
    quads: Vec<(BufferId, BufferId)>,
    active_program: Option<usize>,
    active_quad: Option<usize>,
    active_unit: usize,
    units: Vec<Option<Texture2D>>,
    blank: Texture2D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqProgram(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqQuad(usize);

struct ProgramSlot {
    label: &'static str,
    pipeline: Pipeline,
    values: Vec<ValueSlot>,
    samplers: Vec<SamplerSlot>,
    bytes: Vec<u8>,
}

struct ValueSlot {
    name: &'static str,
    kind: UniformKind,
    count: usize,
    offset: usize,
}

struct SamplerSlot {
    name: &'static str,
    element: usize,
    unit: usize,
}

impl MacroquadGpu {
    /// Must be called from inside the macroquad main loop.
    pub fn new() -> Self {
        let blank = Texture2D::from_rgba8(1, 1, &[0, 0, 0, 0]);
        blank.set_filter(FilterMode::Nearest);
        Self {
            programs: Vec::new(),
            quads: Vec::new(),
            active_program: None,
            active_quad: None,
            active_unit: 0,
            units: vec![None; FRAGMENT_TEXTURE_UNITS],
            blank,
        }
    }

    fn ctx() -> &'static mut dyn macroquad::miniquad::RenderingBackend {
        unsafe { get_internal_gl() }.quad_context
    }

    fn unit_texture(&self, unit: usize) -> TextureId {
        self.units
            .get(unit)
            .and_then(|t| t.as_ref())
            .unwrap_or(&self.blank)
            .raw_miniquad_id()
    }
}

impl Default for MacroquadGpu {
    fn default() -> Self {
        Self::new()
    }
}

fn uniform_type(kind: UniformKind) -> UniformType {
    match kind {
        UniformKind::Int | UniformKind::Sampler => UniformType::Int1,
        UniformKind::Float => UniformType::Float1,
        UniformKind::Vec2 => UniformType::Float2,
    }
}

fn slot_size(kind: UniformKind, count: usize) -> usize {
    let components = match kind {
        UniformKind::Vec2 => 2,
        _ => 1,
    };
    components * count * 4
}

fn sampler_names(decl: &UniformDecl) -> Vec<String> {
    if decl.count == 1 {
        vec![decl.name.to_owned()]
    } else {
        (0..decl.count)
            .map(|i| format!("{}[{}]", decl.name, i))
            .collect()
    }
}

impl Gpu for MacroquadGpu {
    type Texture = Texture2D;
    type Program = MqProgram;
    type Buffer = MqQuad;

    fn max_texture_units(&self) -> usize {
        FRAGMENT_TEXTURE_UNITS
    }

    fn load_texture(&mut self, path: &Path) -> Result<LoadedTexture<Texture2D>, MapError> {
        let bytes = std::fs::read(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let image = Image::from_file_with_format(&bytes, None).map_err(|e| MapError::Texture {
            path: path.to_path_buf(),
            message: format!("{e:?}"),
        })?;
        let texture = Texture2D::from_image(&image);
        texture.set_filter(FilterMode::Nearest);
        Ok(LoadedTexture {
            width: image.width() as u32,
            height: image.height() as u32,
            texture,
        })
    }

    fn create_data_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Texture2D {
        let texture = Texture2D::from_rgba8(width as u16, height as u16, rgba);
        texture.set_filter(FilterMode::Nearest);
        texture
    }

    fn update_data_texture(&mut self, texture: &Texture2D, width: u32, height: u32, rgba: &[u8]) {
        texture.update_from_bytes(width, height, rgba);
    }

    fn create_quad(&mut self, vertices: &[f32]) -> MqQuad {
        let ctx = Self::ctx();
        let vertex_buffer = ctx.new_buffer(
            BufferType::VertexBuffer,
            BufferUsage::Immutable,
            BufferSource::slice(vertices),
        );
        let indices: Vec<u16> = (0..(vertices.len() / 4) as u16).collect();
        let index_buffer = ctx.new_buffer(
            BufferType::IndexBuffer,
            BufferUsage::Immutable,
            BufferSource::slice(&indices),
        );
        self.quads.push((vertex_buffer, index_buffer));
        MqQuad(self.quads.len() - 1)
    }

    fn compile_program(&mut self, desc: &ProgramDesc<'_>) -> Result<MqProgram, MapError> {
        let mut values = Vec::new();
        let mut samplers = Vec::new();
        let mut uniform_descs = Vec::new();
        let mut images = Vec::new();
        let mut offset = 0;

        for decl in &desc.uniforms {
            if decl.kind == UniformKind::Sampler {
                for (element, name) in sampler_names(decl).into_iter().enumerate() {
                    samplers.push(SamplerSlot {
                        name: decl.name,
                        element,
                        unit: images.len(),
                    });
                    images.push(name);
                }
                continue;
            }
            uniform_descs.push(UniformDesc::new(decl.name, uniform_type(decl.kind)).array(decl.count));
            values.push(ValueSlot {
                name: decl.name,
                kind: decl.kind,
                count: decl.count,
                offset,
            });
            offset += slot_size(decl.kind, decl.count);
        }

        let ctx = Self::ctx();
        let shader = ctx
            .new_shader(
                ShaderSource::Glsl {
                    vertex: desc.vertex,
                    fragment: desc.fragment,
                },
                ShaderMeta {
                    images,
                    uniforms: UniformBlockLayout {
                        uniforms: uniform_descs,
                    },
                },
            )
            .map_err(|e| MapError::Shader {
                program: desc.label,
                message: format!("{e:?}"),
            })?;

        let attributes: Vec<VertexAttribute> = ATTRIBUTES
            .iter()
            .map(|&(name, _)| VertexAttribute::new(name, VertexFormat::Float2))
            .collect();
        let pipeline = ctx.new_pipeline(
            &[BufferLayout::default()],
            &attributes,
            shader,
            PipelineParams {
                color_blend: Some(BlendState::new(
                    Equation::Add,
                    BlendFactor::Value(BlendValue::SourceAlpha),
                    BlendFactor::OneMinusValue(BlendValue::SourceAlpha),
                )),
                ..Default::default()
            },
        );

        self.programs.push(ProgramSlot {
            label: desc.label,
            pipeline,
            values,
            samplers,
            bytes: vec![0; offset],
        });
        Ok(MqProgram(self.programs.len() - 1))
    }

    fn begin_frame(&mut self) {
        let mut gl = unsafe { get_internal_gl() };
        gl.flush();
        gl.quad_context.begin_default_pass(PassAction::Nothing);
    }

    fn end_frame(&mut self) {
        Self::ctx().end_render_pass();
    }

    fn bind_quad(&mut self, quad: &MqQuad) {
        self.active_quad = Some(quad.0);
    }

    fn active_texture(&mut self, unit: usize) {
        self.active_unit = unit;
    }

    fn bind_texture(&mut self, texture: &Texture2D) {
        match self.units.get_mut(self.active_unit) {
            Some(slot) => *slot = Some(texture.clone()),
            None => log::warn!("texture unit {} is out of range", self.active_unit),
        }
    }

    fn use_program(&mut self, program: &MqProgram) {
        self.active_program = Some(program.0);
    }

    fn set_uniform(&mut self, name: &str, value: Uniform<'_>) {
        let Some(index) = self.active_program else {
            log::warn!("uniform {} set with no program bound", name);
            return;
        };
        let program = &mut self.programs[index];

        if let Some(slot) = program.values.iter().find(|v| v.name == name) {
            let mut words: Vec<[u8; 4]> = Vec::new();
            match value {
                Uniform::Int(v) => words.push(v.to_ne_bytes()),
                Uniform::Float(v) => words.push(v.to_ne_bytes()),
                Uniform::Vec2(v) => words.extend(v.to_array().map(f32::to_ne_bytes)),
                Uniform::Ints(vs) => words.extend(vs.iter().map(|v| v.to_ne_bytes())),
                Uniform::Vec2s(vs) => words.extend(vs.iter().map(|v| v.to_ne_bytes())),
            }
            let capacity = slot_size(slot.kind, slot.count);
            let bytes = words.concat();
            let len = bytes.len().min(capacity);
            program.bytes[slot.offset..slot.offset + len].copy_from_slice(&bytes[..len]);
            return;
        }

        let units: &[i32] = match &value {
            Uniform::Int(v) => std::slice::from_ref(v),
            Uniform::Ints(vs) => *vs,
            _ => {
                log::warn!("{} program: {} is not an int uniform", program.label, name);
                return;
            }
        };
        let mut matched = false;
        for sampler in program.samplers.iter_mut().filter(|s| s.name == name) {
            if let Some(&unit) = units.get(sampler.element) {
                sampler.unit = unit.max(0) as usize;
                matched = true;
            }
        }
        if !matched {
            log::warn!("{} program has no uniform named {}", program.label, name);
        }
    }

    fn draw_triangles(&mut self, first: usize, count: usize) {
        let (Some(program_index), Some(quad_index)) = (self.active_program, self.active_quad) else {
            log::warn!("draw issued without a bound program and quad");
            return;
        };
        let program = &self.programs[program_index];
        let (vertex_buffer, index_buffer) = self.quads[quad_index];
        let images = program
            .samplers
            .iter()
            .map(|s| self.unit_texture(s.unit))
            .collect();

        let ctx = Self::ctx();
        ctx.apply_pipeline(&program.pipeline);
        ctx.apply_bindings(&Bindings {
            vertex_buffers: vec![vertex_buffer],
            index_buffer,
            images,
        });
        ctx.apply_uniforms_from_bytes(program.bytes.as_ptr(), program.bytes.len());
        ctx.draw(first as i32, count as i32, 1);
    }
}
