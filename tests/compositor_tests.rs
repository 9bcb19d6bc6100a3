// tests/compositor_tests.rs

use macroquad::prelude::{vec2, Vec2};
use macroquad_tiled_gpu::gpu::recording::{GpuCall, RecordedProgram, RecordedUniform};
use macroquad_tiled_gpu::gpu::RecordingGpu;
use macroquad_tiled_gpu::ir_map::{
    IrAnimationFrame, IrLayer, IrMap, IrTileAnimation, IrTileset, IrTilesetImage,
};
use macroquad_tiled_gpu::layer::Layer;
use macroquad_tiled_gpu::{MapError, Tilemap, TilemapOptions, QUAD_VERTEX_COUNT};
use std::path::Path;

fn gpu() -> RecordingGpu {
    RecordingGpu::new()
        .with_image("ground.png", 256, 256)
        .with_image("props_a.png", 32, 32)
        .with_image("props_b.png", 64, 32)
        .with_image("sky.png", 640, 360)
}

fn tilesets() -> Vec<IrTileset> {
    let mut ground = IrTileset::atlas(
        "ground",
        1,
        (32, 32),
        8,
        64,
        IrTilesetImage::new("ground.png", 256, 256),
    );
    ground.animations.push(IrTileAnimation {
        tile_id: 0,
        frames: vec![
            IrAnimationFrame {
                tile_id: 0,
                duration_ms: 15,
            },
            IrAnimationFrame {
                tile_id: 1,
                duration_ms: 15,
            },
        ],
    });
    let props = IrTileset {
        name: "props".into(),
        first_gid: 65,
        tile_w: 32,
        tile_h: 32,
        tilecount: 2,
        columns: 0,
        images: vec![
            IrTilesetImage {
                tile_id: Some(0),
                ..IrTilesetImage::new("props_a.png", 32, 32)
            },
            IrTilesetImage {
                tile_id: Some(1),
                ..IrTilesetImage::new("props_b.png", 64, 32)
            },
        ],
        animations: Vec::new(),
    };
    vec![ground, props]
}

fn map(layers: Vec<IrLayer>) -> IrMap {
    IrMap {
        tile_w: 32,
        tile_h: 32,
        tilesets: tilesets(),
        layers,
    }
}

fn ground(name: &str) -> IrLayer {
    IrLayer::tiles(name, 2, 2, vec![1, 2, 65, 0])
}

fn build(layers: Vec<IrLayer>) -> Tilemap<RecordingGpu> {
    Tilemap::new(gpu(), map(layers), Path::new(""), &TilemapOptions::default())
        .expect("tilemap should build")
}

fn program_binds(calls: &[GpuCall]) -> Vec<RecordedProgram> {
    calls
        .iter()
        .filter_map(|c| match c {
            GpuCall::UseProgram(p) => Some(*p),
            _ => None,
        })
        .collect()
}

fn uniform_names(calls: &[GpuCall]) -> Vec<String> {
    calls
        .iter()
        .filter_map(|c| match c {
            GpuCall::SetUniform { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

fn draws(calls: &[GpuCall]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, GpuCall::Draw { .. }))
        .count()
}

fn uniform(calls: &[GpuCall], wanted: &str) -> Vec<RecordedUniform> {
    calls
        .iter()
        .filter_map(|c| match c {
            GpuCall::SetUniform { name, value, .. } if name == wanted => Some(value.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn packed_arrays_match_image_traversal() {
    let tilemap = build(vec![ground("ground")]);
    let packed = tilemap.packed_uniforms().expect("tile program");

    assert_eq!(tilemap.tilesets().image_count(), 3);
    assert_eq!(packed.texture_units(), &[1, 2, 3]);
    assert_eq!(packed.tile_sizes().len(), 2 * 3);
    assert_eq!(packed.inverse_texture_sizes().len(), 2 * 3);
    assert_eq!(&packed.inverse_texture_sizes()[..2], &[1.0 / 256.0, 1.0 / 256.0]);

    let tile = tilemap
        .gpu()
        .program_by_label("tilelayer")
        .expect("tile program compiled");
    let fragment = &tilemap.gpu().program(tile).fragment;
    assert!(fragment.contains("#define NUM_TILESETS 2"));
    assert!(fragment.contains("#define NUM_TILESET_IMAGES 3"));
}

#[test]
fn frame_binds_atlases_once_then_draws_each_layer_on_unit_zero() {
    let mut tilemap = build(vec![ground("a"), IrLayer::image("sky", "sky.png")]);
    tilemap.gpu_mut().take_calls();

    let stats = tilemap.draw(0.0, 0.0);
    let calls = tilemap.gpu_mut().take_calls();

    assert_eq!(calls[0], GpuCall::BeginFrame);
    assert!(matches!(calls[1], GpuCall::BindQuad(_)));
    let units: Vec<usize> = calls
        .iter()
        .filter_map(|c| match c {
            GpuCall::ActiveTexture(u) => Some(*u),
            _ => None,
        })
        .collect();
    assert_eq!(units, vec![1, 2, 3, 0]);
    assert_eq!(calls.last(), Some(&GpuCall::EndFrame));

    let layer_textures: Vec<_> = tilemap.layers().iter().map(|l| *l.texture()).collect();
    let draw_positions: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, GpuCall::Draw { .. }))
        .map(|(i, _)| i)
        .collect();
    for (texture, pos) in layer_textures.iter().zip(&draw_positions) {
        assert_eq!(calls[pos - 1], GpuCall::BindTexture(*texture));
        assert_eq!(
            calls[*pos],
            GpuCall::Draw {
                first: 0,
                count: QUAD_VERTEX_COUNT
            }
        );
    }
    assert_eq!(stats.draw_calls, 2);
}

#[test]
fn switches_programs_only_on_kind_transitions() {
    let mut tilemap = build(vec![
        ground("a"),
        IrLayer::image("sky", "sky.png"),
        ground("b"),
    ]);
    let tile = tilemap.gpu().program_by_label("tilelayer").expect("tile");
    let image = tilemap.gpu().program_by_label("imagelayer").expect("image");
    tilemap.gpu_mut().take_calls();

    let stats = tilemap.draw(0.0, 0.0);
    let calls = tilemap.gpu_mut().take_calls();

    assert_eq!(program_binds(&calls), vec![tile, image, tile]);
    assert_eq!(stats.program_switches, 2);
    assert_eq!(stats.program_binds, 3);

    let mut same_kind = build(vec![ground("a"), ground("b"), ground("c")]);
    same_kind.gpu_mut().take_calls();
    let stats = same_kind.draw(0.0, 0.0);
    assert_eq!(stats.program_binds, 1);
    assert_eq!(stats.program_switches, 0);
    assert_eq!(stats.draw_calls, 3);
}

#[test]
fn static_tile_uniforms_upload_once_per_lifetime() {
    let mut tilemap = build(vec![ground("a"), IrLayer::image("sky", "sky.png"), ground("b")]);
    tilemap.gpu_mut().take_calls();

    tilemap.draw(0.0, 0.0);
    let first = tilemap.gpu_mut().take_calls();
    tilemap.draw(0.0, 0.0);
    let second = tilemap.gpu_mut().take_calls();

    assert_eq!(uniform(&first, "uTilesets"), vec![RecordedUniform::Ints(vec![1, 2, 3])]);
    assert_eq!(uniform(&first, "uLayer"), vec![RecordedUniform::Int(0)]);
    assert_eq!(
        uniform(&first, "uInverseLayerTileSize"),
        vec![RecordedUniform::Vec2([1.0 / 32.0, 1.0 / 32.0])]
    );
    assert_eq!(uniform(&first, "uTilesetTileSize").len(), 1);
    assert_eq!(uniform(&first, "uInverseTilesetTextureSize").len(), 1);

    for name in ["uTilesets", "uLayer", "uInverseLayerTileSize", "uTilesetTileSize"] {
        assert!(uniform(&second, name).is_empty(), "{name} re-uploaded");
    }
}

#[test]
fn invisible_layers_cost_nothing_and_keep_switch_state() {
    let mut tilemap = build(vec![
        ground("a"),
        IrLayer::image("sky", "sky.png").hidden(),
        ground("b"),
    ]);
    let tile = tilemap.gpu().program_by_label("tilelayer").expect("tile");
    tilemap.gpu_mut().take_calls();

    let stats = tilemap.draw(0.0, 0.0);
    let calls = tilemap.gpu_mut().take_calls();

    assert_eq!(program_binds(&calls), vec![tile]);
    assert_eq!(draws(&calls), 2);
    assert_eq!(stats.skipped_layers, 1);
    assert!(!uniform_names(&calls).contains(&"uSize".to_owned()));
    assert_eq!(uniform(&calls, "uOffset").len(), 2);
}

#[test]
fn all_hidden_layers_draw_nothing() {
    let mut tilemap = build(vec![ground("a").hidden()]);
    tilemap.gpu_mut().take_calls();

    let stats = tilemap.draw(0.0, 0.0);
    let calls = tilemap.gpu_mut().take_calls();

    assert_eq!(stats.draw_calls, 0);
    assert!(program_binds(&calls).is_empty());
    assert!(uniform_names(&calls).is_empty());
}

#[test]
fn tile_and_image_offsets_use_mirrored_signs() {
    let mut tilemap = build(vec![
        ground("a").with_offset(10.0, 20.0),
        IrLayer::image("sky", "sky.png").with_offset(10.0, 20.0),
    ]);
    tilemap.set_tile_scale(2.0);
    tilemap.gpu_mut().take_calls();

    tilemap.draw(5.0, 0.0);
    let calls = tilemap.gpu_mut().take_calls();

    assert_eq!(
        uniform(&calls, "uOffset"),
        vec![
            RecordedUniform::Vec2([-10.0, -40.0]),
            RecordedUniform::Vec2([0.0, -20.0]),
        ]
    );
}

#[test]
fn parallax_scales_camera_motion() {
    let mut tilemap = build(vec![ground("far").with_parallax(0.5, 0.25)]);
    tilemap.gpu_mut().take_calls();

    tilemap.draw(101.0, 40.0);
    let calls = tilemap.gpu_mut().take_calls();

    assert_eq!(
        uniform(&calls, "uOffset"),
        vec![RecordedUniform::Vec2([50.0, 10.0])]
    );
}

#[test]
fn resize_pushes_scaled_viewport_to_both_programs_once() {
    let mut tilemap = build(vec![ground("a")]);
    tilemap.set_tile_scale(2.0);
    tilemap.gpu_mut().take_calls();

    tilemap.resize_viewport(800.0, 600.0);
    let calls = tilemap.gpu_mut().take_calls();
    assert_eq!(program_binds(&calls).len(), 2);
    assert_eq!(
        uniform(&calls, "uViewportSize"),
        vec![
            RecordedUniform::Vec2([400.0, 300.0]),
            RecordedUniform::Vec2([400.0, 300.0]),
        ]
    );

    tilemap.resize_viewport(800.0, 600.0);
    assert!(tilemap.gpu_mut().take_calls().is_empty());
    assert_eq!(tilemap.scaled_viewport_width(), 400.0);
    assert_eq!(tilemap.scaled_viewport_height(), 300.0);
    assert_eq!(tilemap.viewport_width(), 800.0);
}

#[test]
fn tile_scale_change_repushes_viewport() {
    let mut tilemap = build(vec![ground("a")]);
    tilemap.resize_viewport(640.0, 480.0);
    tilemap.gpu_mut().take_calls();

    tilemap.set_tile_scale(4.0);
    let calls = tilemap.gpu_mut().take_calls();
    assert_eq!(uniform(&calls, "uViewportSize").len(), 2);
    assert_eq!(tilemap.scaled_viewport_width(), 160.0);

    tilemap.set_tile_scale(4.0);
    assert!(tilemap.gpu_mut().take_calls().is_empty());
    tilemap.set_tile_scale(-1.0);
    assert_eq!(tilemap.tile_scale(), 4.0);
}

#[test]
fn update_reuploads_only_changed_layers() {
    let mut tilemap = build(vec![
        ground("animated"),
        IrLayer::tiles("still", 1, 1, vec![3]),
    ]);
    let animated = *tilemap.layers()[0].texture();
    tilemap.gpu_mut().take_calls();

    tilemap.update(10.0);
    assert!(tilemap.gpu_mut().take_calls().is_empty());

    tilemap.update(10.0);
    let calls = tilemap.gpu_mut().take_calls();
    assert_eq!(calls, vec![GpuCall::UpdateTexture(animated)]);
    assert_eq!(&tilemap.gpu().texture(animated).data[..4], &[1, 0, 0, 0]);
}

#[test]
fn split_updates_equal_one_update() {
    let mut split = build(vec![ground("a")]);
    let mut whole = build(vec![ground("a")]);

    for _ in 0..7 {
        split.update(10.0);
        split.update(10.0);
        whole.update(20.0);

        let a = split.layers()[0].as_tile().expect("tile").texels().to_vec();
        let b = whole.layers()[0].as_tile().expect("tile").texels().to_vec();
        assert_eq!(a, b);
    }
}

#[test]
fn repeat_tiles_forwards_the_flag() {
    let mut tilemap = build(vec![ground("a"), IrLayer::image("sky", "sky.png")]);
    tilemap.set_repeat_tiles(true);
    tilemap.gpu_mut().take_calls();

    tilemap.draw(0.0, 0.0);
    let calls = tilemap.gpu_mut().take_calls();
    assert_eq!(uniform(&calls, "uRepeatTiles"), vec![RecordedUniform::Int(1)]);

    tilemap.set_repeat_tiles(false);
    assert!(!tilemap.layers()[0].as_tile().expect("tile").repeat_tiles());
}

#[test]
fn layer_setters_apply_on_next_draw() {
    let mut tilemap = build(vec![ground("a"), IrLayer::image("sky", "sky.png")]);
    if let Some(layer) = tilemap.layer_by_name_mut("sky") {
        layer.set_visible(false);
    }
    if let Some(Layer::Tile(tile)) = tilemap.layer_mut(0) {
        tile.set_opacity(0.5);
        tile.set_scroll_scale(Vec2::ZERO);
    }
    tilemap.gpu_mut().take_calls();

    let stats = tilemap.draw(100.0, 100.0);
    let calls = tilemap.gpu_mut().take_calls();

    assert_eq!(stats.draw_calls, 1);
    assert_eq!(uniform(&calls, "uAlpha"), vec![RecordedUniform::Float(0.5)]);
    assert_eq!(
        uniform(&calls, "uOffset"),
        vec![RecordedUniform::Vec2(vec2(0.0, 0.0).to_array())]
    );
}

#[test]
fn options_apply_at_construction() {
    let options = TilemapOptions {
        tile_scale: 2.0,
        repeat_tiles: true,
        viewport: Some((1280.0, 720.0)),
    };
    let tilemap = Tilemap::new(gpu(), map(vec![ground("a")]), Path::new(""), &options)
        .expect("tilemap");

    assert_eq!(tilemap.tile_scale(), 2.0);
    assert_eq!(tilemap.scaled_viewport_width(), 640.0);
    assert!(tilemap.layers()[0].as_tile().expect("tile").repeat_tiles());
}

#[test]
fn construction_fails_without_enough_texture_units() {
    let err = Tilemap::new(
        gpu().with_max_texture_units(3),
        map(vec![ground("a")]),
        Path::new(""),
        &TilemapOptions::default(),
    )
    .err()
    .expect("expected unit error");
    assert!(matches!(
        err,
        MapError::TooManyTilesetImages {
            images: 3,
            available_units: 3
        }
    ));
}

#[test]
fn construction_fails_on_missing_image_layer_texture() {
    let err = Tilemap::new(
        gpu(),
        map(vec![IrLayer::image("void", "missing.png")]),
        Path::new(""),
        &TilemapOptions::default(),
    )
    .err()
    .expect("expected texture error");
    assert!(matches!(err, MapError::Io { .. }));
}

#[test]
fn image_only_maps_skip_the_tile_program() {
    let ir = IrMap {
        tile_w: 16,
        tile_h: 16,
        tilesets: Vec::new(),
        layers: vec![IrLayer::image("sky", "sky.png")],
    };
    let mut tilemap =
        Tilemap::new(gpu(), ir, Path::new(""), &TilemapOptions::default()).expect("tilemap");
    assert!(tilemap.packed_uniforms().is_none());
    assert!(tilemap.gpu().program_by_label("tilelayer").is_none());
    assert_eq!(tilemap.draw(0.0, 0.0).draw_calls, 1);

    let with_tiles = IrMap {
        tile_w: 16,
        tile_h: 16,
        tilesets: Vec::new(),
        layers: vec![IrLayer::tiles("empty", 1, 1, vec![0])],
    };
    let err = Tilemap::new(gpu(), with_tiles, Path::new(""), &TilemapOptions::default())
        .err()
        .expect("expected missing tileset error");
    assert!(matches!(err, MapError::InvalidMap(_)));
}

#[test]
fn animation_with_unknown_frame_fails_construction() {
    let mut ir = map(vec![IrLayer::tiles("a", 1, 1, vec![1])]);
    ir.tilesets[0].animations[0].frames[1].tile_id = 99;

    let err = Tilemap::new(gpu(), ir, Path::new(""), &TilemapOptions::default())
        .err()
        .expect("expected animation frame error");
    assert!(matches!(err, MapError::InvalidMap(_)));
}
