use macroquad::prelude::*;
use std::path::PathBuf;

pub const FLIPPED_HORIZONTALLY: u32 = 0x8000_0000;
pub const FLIPPED_VERTICALLY: u32 = 0x4000_0000;
pub const FLIPPED_DIAGONALLY: u32 = 0x2000_0000;
pub const ROTATED_HEXAGONAL_120: u32 = 0x1000_0000;
/// Strips every flag bit from a raw gid.
pub const GID_MASK: u32 =
    !(FLIPPED_HORIZONTALLY | FLIPPED_VERTICALLY | FLIPPED_DIAGONALLY | ROTATED_HEXAGONAL_120);

/// `first_gid + tilecount` must not run past the flag bits.
pub fn gid_range_fits(first_gid: u32, tilecount: u32) -> bool {
    u64::from(first_gid) + u64::from(tilecount) <= u64::from(GID_MASK) + 1
}

/// Canonical, format-agnostic map description consumed by the compositor.
#[derive(Debug, Clone)]
pub struct IrMap {
    pub tile_w: u32,
    pub tile_h: u32,
    pub tilesets: Vec<IrTileset>, // must be sorted by first_gid
    pub layers: Vec<IrLayer>,     // draw order: array order
}

#[derive(Debug, Clone)]
pub struct IrTileset {
    pub name: String,
    pub first_gid: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub tilecount: u32,
    /// Atlas column count; 0 for image collections.
    pub columns: u32,
    pub images: Vec<IrTilesetImage>,
    pub animations: Vec<IrTileAnimation>,
}

impl IrTileset {
    /// A tileset whose tiles are cut from a single image.
    pub fn atlas(
        name: impl Into<String>,
        first_gid: u32,
        tile_size: (u32, u32),
        columns: u32,
        tilecount: u32,
        image: IrTilesetImage,
    ) -> Self {
        Self {
            name: name.into(),
            first_gid,
            tile_w: tile_size.0,
            tile_h: tile_size.1,
            tilecount,
            columns,
            images: vec![image],
            animations: Vec::new(),
        }
    }

    pub fn is_collection(&self) -> bool {
        self.images.iter().any(|img| img.tile_id.is_some())
    }

    /// Highest gid this tileset covers. Saturates for ranges that
    /// [`fits_gid_space`](Self::fits_gid_space) rejects.
    pub fn last_gid(&self) -> u32 {
        self.first_gid.saturating_add(self.tilecount.saturating_sub(1))
    }

    /// True when every gid of `first_gid..first_gid + tilecount` survives
    /// [`GID_MASK`] unchanged.
    pub fn fits_gid_space(&self) -> bool {
        gid_range_fits(self.first_gid, self.tilecount)
    }
}

#[derive(Debug, Clone)]
pub struct IrTilesetImage {
    /// Relative to the map's base directory.
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Local tile id this image belongs to (image-collection tilesets only).
    pub tile_id: Option<u32>,
}

impl IrTilesetImage {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            tile_id: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrTileAnimation {
    /// Local id of the animated tile inside its tileset.
    pub tile_id: u32,
    pub frames: Vec<IrAnimationFrame>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrAnimationFrame {
    /// Local tile id shown during this frame.
    pub tile_id: u32,
    pub duration_ms: u32,
}

#[derive(Debug, Clone)]
pub enum IrLayerKind {
    Tiles {
        width: usize,
        height: usize,
        data: Vec<u32>, // raw GIDs, flip flags included
    },
    Image {
        image: PathBuf,
    },
}

#[derive(Debug, Clone)]
pub struct IrLayer {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub offset: Vec2,   // pixel offset for this layer
    pub parallax: Vec2, // scroll scale, (1, 1) follows the camera exactly
    pub kind: IrLayerKind,
}

impl IrLayer {
    pub fn tiles(name: impl Into<String>, width: usize, height: usize, data: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            offset: Vec2::ZERO,
            parallax: Vec2::ONE,
            kind: IrLayerKind::Tiles {
                width,
                height,
                data,
            },
        }
    }

    pub fn image(name: impl Into<String>, image: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            opacity: 1.0,
            offset: Vec2::ZERO,
            parallax: Vec2::ONE,
            kind: IrLayerKind::Image {
                image: image.into(),
            },
        }
    }

    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset = vec2(x, y);
        self
    }

    pub fn with_parallax(mut self, x: f32, y: f32) -> Self {
        self.parallax = vec2(x, y);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}
