use crate::error::MapError;
use crate::gpu::Gpu;
use crate::ir_map::{IrTileset, GID_MASK};
use std::collections::HashMap;
use std::path::Path;

/// Grid coordinates and image indices are stored as bytes in the layer data
/// texture; 255 is reserved for empty cells.
pub const MAX_ENCODED_INDEX: u32 = 254;

/// One loaded tileset image.
#[derive(Debug, Clone)]
pub struct AtlasImage<T> {
    pub texture: T,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    pub gid: u32,
    pub duration_ms: u32,
}

/// Where a tile lives: which image (global index across every tileset) and
/// which cell of that image's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLocation {
    pub image: u8,
    pub column: u8,
    pub row: u8,
}

#[derive(Debug)]
pub struct AtlasTileset<T> {
    pub name: String,
    pub first_gid: u32,
    pub tile_count: u32,
    pub columns: u32,
    pub tile_w: u32,
    pub tile_h: u32,
    pub images: Vec<AtlasImage<T>>,
    /// Global index of `images[0]`.
    pub first_image: usize,
    collection: HashMap<u32, usize>,
    animations: HashMap<u32, Vec<AnimationFrame>>,
}

impl<T> AtlasTileset<T> {
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn contains(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid - self.first_gid < self.tile_count
    }
}

/// Image entry yielded by [`TilesetAtlasRegistry::images`].
pub struct BoundImage<'a, T> {
    pub tileset: &'a AtlasTileset<T>,
    pub image: &'a AtlasImage<T>,
    /// Position in the packed uniform arrays.
    pub index: usize,
    pub texture_unit: usize,
}

/// Owns every tileset and its textures, in gid order.
#[derive(Debug)]
pub struct TilesetAtlasRegistry<T> {
    tilesets: Vec<AtlasTileset<T>>,
    image_count: usize,
}

impl<T> TilesetAtlasRegistry<T> {
    /// Loads every tileset image through `gpu`. Any failure aborts the whole
    /// registry; nothing partial is returned.
    pub fn new<G>(gpu: &mut G, tilesets: &[IrTileset], base_dir: &Path) -> Result<Self, MapError>
    where
        G: Gpu<Texture = T>,
    {
        let mut out: Vec<AtlasTileset<T>> = Vec::with_capacity(tilesets.len());
        let mut image_count = 0usize;

        for ts in tilesets {
            if !ts.fits_gid_space() {
                return Err(MapError::InvalidMap(format!(
                    "tileset '{}' ({} tiles from gid {}) runs past the highest gid {}",
                    ts.name, ts.tilecount, ts.first_gid, GID_MASK
                )));
            }
            if let Some(prev) = out.last() {
                if ts.first_gid < prev.first_gid + prev.tile_count {
                    return Err(MapError::InvalidMap(format!(
                        "tileset '{}' (first gid {}) overlaps '{}' (gids {}..{})",
                        ts.name,
                        ts.first_gid,
                        prev.name,
                        prev.first_gid,
                        prev.first_gid + prev.tile_count
                    )));
                }
            }
            if ts.first_gid == 0 || ts.tile_w == 0 || ts.tile_h == 0 || ts.images.is_empty() {
                return Err(MapError::InvalidMap(format!(
                    "tileset '{}' needs a positive first gid, a tile size and at least one image",
                    ts.name
                )));
            }

            let collection: HashMap<u32, usize> = ts
                .images
                .iter()
                .enumerate()
                .filter_map(|(i, img)| img.tile_id.map(|id| (id, i)))
                .collect();
            if collection.is_empty() {
                if ts.images.len() != 1 || ts.columns == 0 {
                    return Err(MapError::InvalidMap(format!(
                        "atlas tileset '{}' needs exactly one image and a column count",
                        ts.name
                    )));
                }
                let rows = ts.tilecount.div_ceil(ts.columns);
                if ts.columns > MAX_ENCODED_INDEX + 1 || rows > MAX_ENCODED_INDEX + 1 {
                    return Err(MapError::AtlasTooLarge {
                        tileset: ts.name.clone(),
                        columns: ts.columns,
                        rows,
                    });
                }
            } else if collection.len() != ts.images.len() {
                return Err(MapError::InvalidMap(format!(
                    "image collection '{}' has images without a tile id",
                    ts.name
                )));
            }

            // Every frame must resolve, so animation updates never lose a cell.
            for anim in &ts.animations {
                let frames = anim.frames.iter().map(|f| f.tile_id);
                for frame in std::iter::once(anim.tile_id).chain(frames) {
                    let drawable = frame < ts.tilecount
                        && (collection.is_empty() || collection.contains_key(&frame));
                    if !drawable {
                        return Err(MapError::InvalidMap(format!(
                            "tileset '{}': animation of tile {} uses tile {}, which has no image cell",
                            ts.name, anim.tile_id, frame
                        )));
                    }
                }
            }

            if image_count + ts.images.len() > MAX_ENCODED_INDEX as usize {
                return Err(MapError::InvalidMap(format!(
                    "tileset '{}' brings the image count to {}; the layer encoding holds at most {}",
                    ts.name,
                    image_count + ts.images.len(),
                    MAX_ENCODED_INDEX
                )));
            }

            let mut images = Vec::with_capacity(ts.images.len());
            for img in &ts.images {
                let loaded = gpu.load_texture(&base_dir.join(&img.path))?;
                // The descriptor's declared size wins; fall back to the decoded one.
                let width = if img.width > 0 { img.width } else { loaded.width };
                let height = if img.height > 0 { img.height } else { loaded.height };
                images.push(AtlasImage {
                    texture: loaded.texture,
                    width,
                    height,
                });
            }

            let animations = ts
                .animations
                .iter()
                .filter(|anim| !anim.frames.is_empty())
                .map(|anim| {
                    let frames = anim
                        .frames
                        .iter()
                        .map(|f| AnimationFrame {
                            gid: ts.first_gid + f.tile_id,
                            duration_ms: f.duration_ms,
                        })
                        .collect();
                    (anim.tile_id, frames)
                })
                .collect();

            out.push(AtlasTileset {
                name: ts.name.clone(),
                first_gid: ts.first_gid,
                tile_count: ts.tilecount,
                columns: ts.columns,
                tile_w: ts.tile_w,
                tile_h: ts.tile_h,
                first_image: image_count,
                images,
                collection,
                animations,
            });
            image_count += ts.images.len();
        }

        log::debug!(
            "tileset registry: {} tilesets, {} images",
            out.len(),
            image_count
        );

        Ok(Self {
            tilesets: out,
            image_count,
        })
    }

    /// Number of tilesets.
    pub fn len(&self) -> usize {
        self.tilesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tilesets.is_empty()
    }

    /// Sum of image counts across every tileset.
    pub fn image_count(&self) -> usize {
        self.image_count
    }

    pub fn tilesets(&self) -> &[AtlasTileset<T>] {
        &self.tilesets
    }

    pub fn max_gid(&self) -> u32 {
        self.tilesets
            .last()
            .map(|t| t.first_gid + t.tile_count - 1)
            .unwrap_or(0)
    }

    /// Every image in tileset order, then image order. The packed uniform
    /// arrays and the per-frame texture binds both walk this, so position `k`
    /// always lands on texture unit `k + 1`.
    pub fn images(&self) -> impl Iterator<Item = BoundImage<'_, T>> {
        self.tilesets.iter().flat_map(|tileset| {
            tileset
                .images
                .iter()
                .enumerate()
                .map(move |(i, image)| BoundImage {
                    tileset,
                    image,
                    index: tileset.first_image + i,
                    texture_unit: tileset.first_image + i + 1,
                })
        })
    }

    pub fn tileset_for_gid(&self, gid: u32) -> Option<&AtlasTileset<T>> {
        let gid = gid & GID_MASK;
        let idx = self.tilesets.partition_point(|t| t.first_gid <= gid);
        let ts = self.tilesets.get(idx.checked_sub(1)?)?;
        ts.contains(gid).then_some(ts)
    }

    /// Resolves a (flag-free or flagged) gid to its image cell.
    pub fn locate(&self, gid: u32) -> Option<TileLocation> {
        let clean = gid & GID_MASK;
        let ts = self.tileset_for_gid(clean)?;
        let local = clean - ts.first_gid;

        if ts.collection.is_empty() {
            Some(TileLocation {
                image: ts.first_image as u8,
                column: (local % ts.columns) as u8,
                row: (local / ts.columns) as u8,
            })
        } else {
            let image = ts.collection.get(&local)?;
            Some(TileLocation {
                image: (ts.first_image + image) as u8,
                column: 0,
                row: 0,
            })
        }
    }

    /// Animation frames for `gid`, if its tileset animates it.
    pub fn animation(&self, gid: u32) -> Option<&[AnimationFrame]> {
        let clean = gid & GID_MASK;
        let ts = self.tileset_for_gid(clean)?;
        ts.animations
            .get(&(clean - ts.first_gid))
            .map(|frames| frames.as_slice())
    }
}
