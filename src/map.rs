use crate::compositor::Tilemap;
use crate::error::MapError;
use crate::gpu::MacroquadGpu;
use crate::loader::json_loader::decode_map_file_to_ir;
use crate::options::TilemapOptions;

/// A [`Tilemap`] drawing through macroquad's own GL context.
pub type Map = Tilemap<MacroquadGpu>;

impl Tilemap<MacroquadGpu> {
    /// Loads a Tiled `.json` map and everything it references.
    ///
    /// Must run inside the macroquad main loop, after the window exists.
    pub fn load(path: &str) -> Result<Self, MapError> {
        Self::load_with_options(path, &TilemapOptions::default())
    }

    /// Like [`load`](Self::load), applying `options` once the map is built.
    pub fn load_with_options(path: &str, options: &TilemapOptions) -> Result<Self, MapError> {
        let (ir, base) = decode_map_file_to_ir(path)?;
        Tilemap::new(MacroquadGpu::new(), ir, &base, options)
    }
}
