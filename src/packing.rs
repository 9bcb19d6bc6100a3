use crate::atlas::TilesetAtlasRegistry;

/// The fixed-size arrays the tile fragment shader is specialized for.
///
/// Element `k` of every array describes the `k`-th image of
/// [`TilesetAtlasRegistry::images`], which is bound to texture unit `k + 1`.
/// Built once; the tile program is compiled against these lengths, so they
/// never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedUniforms {
    tileset_count: usize,
    texture_units: Vec<i32>,
    tile_sizes: Vec<f32>,
    inverse_texture_sizes: Vec<f32>,
}

impl PackedUniforms {
    pub fn pack<T>(registry: &TilesetAtlasRegistry<T>) -> Self {
        let count = registry.image_count();
        let mut texture_units = Vec::with_capacity(count);
        let mut tile_sizes = Vec::with_capacity(count * 2);
        let mut inverse_texture_sizes = Vec::with_capacity(count * 2);

        for bound in registry.images() {
            texture_units.push(bound.texture_unit as i32);
            tile_sizes.extend([bound.tileset.tile_w as f32, bound.tileset.tile_h as f32]);
            inverse_texture_sizes.extend([
                1.0 / bound.image.width as f32,
                1.0 / bound.image.height as f32,
            ]);
        }

        Self {
            tileset_count: registry.len(),
            texture_units,
            tile_sizes,
            inverse_texture_sizes,
        }
    }

    pub fn tileset_count(&self) -> usize {
        self.tileset_count
    }

    /// Length of every array, in elements.
    pub fn image_count(&self) -> usize {
        self.texture_units.len()
    }

    /// `[1, 2, ..., image_count]`
    pub fn texture_units(&self) -> &[i32] {
        &self.texture_units
    }

    /// Flattened `(tile width, tile height)` pairs.
    pub fn tile_sizes(&self) -> &[f32] {
        &self.tile_sizes
    }

    /// Flattened `(1 / image width, 1 / image height)` pairs.
    pub fn inverse_texture_sizes(&self) -> &[f32] {
        &self.inverse_texture_sizes
    }
}
