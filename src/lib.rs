#![warn(missing_docs)]

//! GPU tile-layer compositor for Tiled JSON maps on Macroquad.
//!
//! Every layer is drawn as one full-screen quad. Tile layers upload their grid
//! as a small data texture and a fragment shader looks each cell up in the
//! tileset atlases; image layers sample a single texture.

#[allow(missing_docs)]
pub mod atlas;
mod compositor;
mod error;
#[allow(missing_docs)]
pub mod gpu;
#[allow(missing_docs)]
pub mod ir_map;
#[allow(missing_docs)]
pub mod layer;
pub mod loader {
    //! Map description loaders.
    #[allow(missing_docs)]
    pub mod json_loader;
}
mod map;
mod options;
#[allow(missing_docs)]
pub mod packing;
#[allow(missing_docs)]
pub mod shader;
mod viewport;

pub use compositor::{FrameStats, Tilemap, QUAD_VERTEX_COUNT, QUAD_VERTICES};
pub use error::MapError;
pub use map::Map;
pub use options::TilemapOptions;
pub use viewport::Viewport;
