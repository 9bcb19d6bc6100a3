// src/loader/json_loader.rs
use crate::error::MapError;
use crate::ir_map::*;
use macroquad::prelude::*;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct JsonLayer {
    #[serde(default)]
    data: JsonValue,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default = "one")]
    opacity: f32,
    #[serde(default)]
    offsetx: f32,
    #[serde(default)]
    offsety: f32,
    #[serde(default = "one")]
    parallaxx: f32,
    #[serde(default = "one")]
    parallaxy: f32,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>, // "tilelayer" when absent
    #[serde(default)]
    image: String,
    #[serde(default)]
    layers: Vec<JsonLayer>,
}

fn default_true() -> bool {
    true
}
fn one() -> f32 {
    1.0
}

#[derive(Deserialize)]
struct JsonTilesetRef {
    firstgid: u32,
    #[serde(default)]
    source: Option<String>,
    #[serde(flatten)]
    embedded: serde_json::Map<String, JsonValue>,
}

#[derive(Deserialize)]
struct JsonMap {
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    infinite: bool,
    layers: Vec<JsonLayer>,
    #[serde(default)]
    tilesets: Vec<JsonTilesetRef>,
}

#[derive(Deserialize)]
struct JsonTileset {
    #[serde(default)]
    name: String,
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    tilecount: u32,
    #[serde(default)]
    columns: u32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
    #[serde(default)]
    tiles: Vec<JsonTile>,
}

#[derive(Deserialize)]
struct JsonTile {
    id: u32,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: u32,
    #[serde(default)]
    imageheight: u32,
    #[serde(default)]
    animation: Vec<JsonFrame>,
}

#[derive(Deserialize)]
struct JsonFrame {
    tileid: u32,
    duration: u32,
}

/// Accumulated state of the enclosing group layers.
#[derive(Clone, Copy)]
struct GroupState {
    visible: bool,
    opacity: f32,
    offset: Vec2,
    parallax: Vec2,
}

impl GroupState {
    const ROOT: GroupState = GroupState {
        visible: true,
        opacity: 1.0,
        offset: Vec2::ZERO,
        parallax: Vec2::ONE,
    };

    fn child(&self, l: &JsonLayer) -> GroupState {
        GroupState {
            visible: self.visible && l.visible,
            opacity: self.opacity * l.opacity,
            offset: self.offset + vec2(l.offsetx, l.offsety),
            parallax: self.parallax * vec2(l.parallaxx, l.parallaxy),
        }
    }
}

fn tileset_to_ir(first_gid: u32, ts: JsonTileset, image_dir: &Path) -> Result<IrTileset, MapError> {
    if ts.spacing != 0 || ts.margin != 0 {
        return Err(MapError::InvalidMap(format!(
            "tileset '{}' uses spacing/margin, which the atlas shader does not sample",
            ts.name
        )));
    }

    let animations = ts
        .tiles
        .iter()
        .filter(|t| !t.animation.is_empty())
        .map(|t| IrTileAnimation {
            tile_id: t.id,
            frames: t
                .animation
                .iter()
                .map(|f| IrAnimationFrame {
                    tile_id: f.tileid,
                    duration_ms: f.duration,
                })
                .collect(),
        })
        .collect();

    let (images, tilecount) = match &ts.image {
        Some(image) if !image.is_empty() => (
            vec![IrTilesetImage::new(
                image_dir.join(image),
                ts.imagewidth,
                ts.imageheight,
            )],
            ts.tilecount,
        ),
        _ => {
            // Image collection: one image per tile, ids may be sparse.
            let images: Vec<IrTilesetImage> = ts
                .tiles
                .iter()
                .filter_map(|t| {
                    t.image.as_ref().map(|img| IrTilesetImage {
                        tile_id: Some(t.id),
                        ..IrTilesetImage::new(image_dir.join(img), t.imagewidth, t.imageheight)
                    })
                })
                .collect();
            if images.is_empty() {
                return Err(MapError::InvalidMap(format!(
                    "tileset '{}' has no image",
                    ts.name
                )));
            }
            let highest = images.iter().filter_map(|i| i.tile_id).max().unwrap_or(0);
            let count = highest.checked_add(1).ok_or_else(|| {
                MapError::InvalidMap(format!("tileset '{}' has tile id {}", ts.name, highest))
            })?;
            (images, ts.tilecount.max(count))
        }
    };

    if !gid_range_fits(first_gid, tilecount) {
        return Err(MapError::InvalidMap(format!(
            "tileset '{}' spans gids {}..{}, past the highest encodable gid {}",
            ts.name,
            first_gid,
            u64::from(first_gid) + u64::from(tilecount),
            GID_MASK
        )));
    }

    Ok(IrTileset {
        name: ts.name,
        first_gid,
        tile_w: ts.tilewidth,
        tile_h: ts.tileheight,
        tilecount,
        columns: ts.columns,
        images,
        animations,
    })
}

fn tile_data(l: &JsonLayer) -> Result<Vec<u32>, MapError> {
    if let Some(encoding) = l.encoding.as_deref().filter(|e| *e != "csv") {
        return Err(MapError::InvalidMap(format!(
            "layer '{}' uses {} encoding; only plain arrays are supported",
            l.name, encoding
        )));
    }
    match &l.data {
        JsonValue::Array(values) => values
            .iter()
            .map(|v| {
                v.as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| {
                        MapError::InvalidMap(format!("layer '{}' has a non-gid entry: {}", l.name, v))
                    })
            })
            .collect(),
        JsonValue::Null => Ok(Vec::new()),
        other => Err(MapError::InvalidMap(format!(
            "layer '{}' data must be an array, found {}",
            l.name, other
        ))),
    }
}

fn flatten_layers(
    layers: Vec<JsonLayer>,
    parent: GroupState,
    max_gid: u32,
    out: &mut Vec<IrLayer>,
) -> Result<(), MapError> {
    for l in layers {
        let state = parent.child(&l);
        let kind = match l.kind.as_deref().unwrap_or("tilelayer") {
            "tilelayer" => {
                let data = tile_data(&l)?;
                let expected = l.width.checked_mul(l.height).ok_or_else(|| {
                    MapError::InvalidMap(format!(
                        "layer '{}' is {}x{} tiles",
                        l.name, l.width, l.height
                    ))
                })?;
                if data.len() != expected {
                    return Err(MapError::InvalidLayerSize {
                        layer: l.name,
                        expected,
                        actual: data.len(),
                    });
                }
                for &raw_gid in &data {
                    let gid = raw_gid & GID_MASK;
                    if gid != 0 && gid > max_gid {
                        return Err(MapError::InvalidTileGid {
                            layer: l.name.clone(),
                            gid,
                            max_gid,
                        });
                    }
                }
                IrLayerKind::Tiles {
                    width: l.width,
                    height: l.height,
                    data,
                }
            }
            "imagelayer" => {
                if l.image.is_empty() {
                    log::warn!("image layer '{}' has no image, skipping", l.name);
                    continue;
                }
                IrLayerKind::Image {
                    image: PathBuf::from(&l.image),
                }
            }
            "group" => {
                flatten_layers(l.layers, state, max_gid, out)?;
                continue;
            }
            other => {
                log::debug!("skipping unsupported {} layer '{}'", other, l.name);
                continue;
            }
        };
        out.push(IrLayer {
            name: l.name,
            visible: state.visible,
            opacity: state.opacity,
            offset: state.offset,
            parallax: state.parallax,
            kind,
        });
    }
    Ok(())
}

/// Decodes map JSON whose external references resolve against `map_dir`.
pub fn decode_map_str_to_ir(txt: &str, map_dir: &Path, origin: &Path) -> Result<IrMap, MapError> {
    let j: JsonMap = serde_json::from_str(txt).map_err(|source| MapError::Json {
        path: origin.to_path_buf(),
        source,
    })?;

    if j.infinite {
        return Err(MapError::InvalidMap(
            "infinite (chunked) maps are not supported".to_owned(),
        ));
    }

    // Build IR tilesets
    let mut ir_tilesets = Vec::with_capacity(j.tilesets.len());
    for ts in j.tilesets {
        let (parsed, image_dir) = match &ts.source {
            Some(source) => {
                if !source.ends_with(".json") {
                    return Err(MapError::InvalidMap(format!(
                        "External tileset must be JSON: {}",
                        source
                    )));
                }
                let ts_path = map_dir.join(source);
                let ext_txt = std::fs::read_to_string(&ts_path).map_err(|source| MapError::Io {
                    path: ts_path.clone(),
                    source,
                })?;
                let ext: JsonTileset =
                    serde_json::from_str(&ext_txt).map_err(|source| MapError::Json {
                        path: ts_path,
                        source,
                    })?;
                // Images are relative to the tileset file; IR paths are relative to the map.
                let dir = Path::new(source)
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                (ext, dir)
            }
            None => {
                let embedded: JsonTileset = serde_json::from_value(JsonValue::Object(ts.embedded))
                    .map_err(|source| MapError::Json {
                        path: origin.to_path_buf(),
                        source,
                    })?;
                (embedded, PathBuf::new())
            }
        };
        ir_tilesets.push(tileset_to_ir(ts.firstgid, parsed, &image_dir)?);
    }

    // Sort by first_gid so the registry can binary-search
    ir_tilesets.sort_by_key(|t| t.first_gid);

    let max_gid = ir_tilesets.iter().map(|t| t.last_gid()).max().unwrap_or(0);

    let mut ir_layers = Vec::with_capacity(j.layers.len());
    flatten_layers(j.layers, GroupState::ROOT, max_gid, &mut ir_layers)?;

    Ok(IrMap {
        tile_w: j.tilewidth,
        tile_h: j.tileheight,
        tilesets: ir_tilesets,
        layers: ir_layers,
    })
}

pub fn decode_map_file_to_ir(path: &str) -> Result<(IrMap, PathBuf), MapError> {
    let p = Path::new(path);
    if p.extension().and_then(|e| e.to_str()) != Some("json") {
        return Err(MapError::InvalidMap(format!(
            "Map file must be a JSON file: {path}"
        )));
    }

    let txt = std::fs::read_to_string(p).map_err(|source| MapError::Io {
        path: p.to_path_buf(),
        source,
    })?;

    let map_dir = p
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));

    let ir = decode_map_str_to_ir(&txt, &map_dir, p)?;
    Ok((ir, map_dir))
}
