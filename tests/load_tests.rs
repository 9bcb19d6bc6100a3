// tests/load_tests.rs

use macroquad_tiled_gpu::gpu::recording::GpuCall;
use macroquad_tiled_gpu::gpu::RecordingGpu;
use macroquad_tiled_gpu::layer::LayerKind;
use macroquad_tiled_gpu::loader::json_loader::{decode_map_file_to_ir, decode_map_str_to_ir};
use macroquad_tiled_gpu::{MapError, Tilemap, TilemapOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const MAP: &str = r#"{
  "tilewidth": 16, "tileheight": 16, "infinite": false,
  "layers": [
    { "type": "imagelayer", "name": "sky", "image": "sky.png",
      "parallaxx": 0.25, "parallaxy": 0.25 },
    { "type": "group", "name": "world", "offsetx": 4, "offsety": 8, "layers": [
      { "type": "tilelayer", "name": "ground", "width": 3, "height": 2,
        "data": [1, 2, 3, 0, 2147483652, 9] },
      { "type": "objectgroup", "name": "spawns", "objects": [] }
    ]}
  ],
  "tilesets": [
    { "firstgid": 1, "source": "tilesets/terrain.json" },
    { "firstgid": 9, "name": "props", "tilewidth": 16, "tileheight": 16,
      "tilecount": 1, "columns": 0,
      "tiles": [ { "id": 0, "image": "props/crate.png",
                   "imagewidth": 16, "imageheight": 16 } ] }
  ]
}"#;

const TERRAIN: &str = r#"{
  "name": "terrain", "tilewidth": 16, "tileheight": 16,
  "tilecount": 8, "columns": 4,
  "image": "terrain.png", "imagewidth": 64, "imageheight": 32
}"#;

fn temp_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("mq_tiled_gpu_it_{nanos}"));
    fs::create_dir_all(dir.join("tilesets")).expect("failed to create temp dir");
    dir
}

fn gpu_for(dir: &Path) -> RecordingGpu {
    RecordingGpu::new()
        .with_image(dir.join("sky.png"), 320, 180)
        .with_image(dir.join("tilesets/terrain.png"), 64, 32)
        .with_image(dir.join("props/crate.png"), 16, 16)
}

#[test]
fn loads_a_map_file_into_a_drawable_tilemap() {
    let dir = temp_dir();
    let map_path = dir.join("level.json");
    fs::write(&map_path, MAP).expect("write map");
    fs::write(dir.join("tilesets/terrain.json"), TERRAIN).expect("write tileset");

    let (ir, base) =
        decode_map_file_to_ir(map_path.to_str().expect("utf-8 path")).expect("decode map");
    assert_eq!(base, dir);
    assert_eq!(ir.layers.len(), 2);

    let mut tilemap =
        Tilemap::new(gpu_for(&dir), ir, &base, &TilemapOptions::default()).expect("tilemap");

    let kinds: Vec<LayerKind> = tilemap.layers().iter().map(|l| l.kind()).collect();
    assert_eq!(kinds, vec![LayerKind::Image, LayerKind::Tile]);

    let ground = tilemap.layers()[1].as_tile().expect("ground is a tile layer");
    assert_eq!(ground.offset().to_array(), [4.0, 8.0]);
    assert_eq!(
        ground.texels(),
        &[
            0, 0, 0, 0, //
            1, 0, 0, 0, //
            2, 0, 0, 0, //
            255, 255, 255, 255, //
            3, 0, 0, 1, //
            0, 0, 1, 0, //
        ]
    );
    assert_eq!(tilemap.packed_uniforms().expect("packed").texture_units(), &[1, 2]);

    tilemap.gpu_mut().take_calls();
    let stats = tilemap.draw(0.0, 0.0);
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.program_switches, 1);
    let calls = tilemap.gpu_mut().take_calls();
    assert!(calls.contains(&GpuCall::EndFrame));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_tileset_image_fails_construction() {
    let dir = temp_dir();
    fs::write(dir.join("tilesets/terrain.json"), TERRAIN).expect("write tileset");
    let ir = decode_map_str_to_ir(MAP, &dir, &dir.join("level.json")).expect("decode");

    let gpu = RecordingGpu::new().with_image(dir.join("sky.png"), 320, 180);
    let err = Tilemap::new(gpu, ir, &dir, &TilemapOptions::default())
        .err()
        .expect("expected texture error");
    match err {
        MapError::Io { path, .. } => assert!(path.ends_with("tilesets/terrain.png")),
        other => panic!("unexpected error: {other}"),
    }

    let _ = fs::remove_dir_all(&dir);
}
