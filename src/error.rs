use std::fmt;
use std::io;
use std::path::PathBuf;

/// Everything that can go wrong while turning a map description into a
/// drawable [`Tilemap`](crate::Tilemap).
///
/// All variants are construction failures: no partially built map is ever
/// returned, and the per-frame draw path has no error cases.
#[derive(Debug)]
pub enum MapError {
    /// Reading a map, tileset or image file failed
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// A map or tileset file is not valid JSON for the expected shape
    Json {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
    /// The description is structurally unusable
    InvalidMap(String),
    /// A tile layer's data length does not match width * height
    InvalidLayerSize {
        /// Layer name
        layer: String,
        /// width * height
        expected: usize,
        /// Entries in the layer data
        actual: usize,
    },
    /// A tile layer references a gid no tileset covers
    InvalidTileGid {
        /// Layer name
        layer: String,
        /// Offending gid, flags stripped
        gid: u32,
        /// Highest gid any tileset covers
        max_gid: u32,
    },
    /// An image could not be decoded or uploaded
    Texture {
        /// Image path
        path: PathBuf,
        /// What went wrong
        message: String,
    },
    /// A shader program failed to compile or link
    Shader {
        /// `"tilelayer"` or `"imagelayer"`
        program: &'static str,
        /// Compiler or linker log
        message: String,
    },
    /// The tileset images plus the layer unit need more texture units than the GPU has
    TooManyTilesetImages {
        /// Tileset images in the map
        images: usize,
        /// Texture units the GPU exposes
        available_units: usize,
    },
    /// An atlas grid does not fit in the byte-sized layer data encoding
    AtlasTooLarge {
        /// Tileset name
        tileset: String,
        /// Grid columns
        columns: u32,
        /// Grid rows
        rows: u32,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Io { path, source } => {
                write!(f, "I/O error reading {}: {}", path.display(), source)
            }
            MapError::Json { path, source } => {
                write!(f, "JSON parse error in {}: {}", path.display(), source)
            }
            MapError::InvalidMap(msg) => write!(f, "Invalid map: {}", msg),
            MapError::InvalidLayerSize {
                layer,
                expected,
                actual,
            } => write!(
                f,
                "Invalid layer size for layer '{}': expected {} tiles, found {}",
                layer, expected, actual
            ),
            MapError::InvalidTileGid {
                layer,
                gid,
                max_gid,
            } => write!(
                f,
                "Layer '{}' references gid {} but the highest tileset gid is {}",
                layer, gid, max_gid
            ),
            MapError::Texture { path, message } => {
                write!(f, "Failed to load texture {}: {}", path.display(), message)
            }
            MapError::Shader { program, message } => {
                write!(f, "Failed to build {} shader program: {}", program, message)
            }
            MapError::TooManyTilesetImages {
                images,
                available_units,
            } => write!(
                f,
                "{} tileset images need {} texture units but only {} are available",
                images,
                images + 1,
                available_units
            ),
            MapError::AtlasTooLarge {
                tileset,
                columns,
                rows,
            } => write!(
                f,
                "Tileset '{}' has a {}x{} tile grid; at most 255x255 is supported",
                tileset, columns, rows
            ),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Io { source, .. } => Some(source),
            MapError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
