use macroquad::prelude::*;
use macroquad_tiled_gpu::layer::Layer;
use macroquad_tiled_gpu::{Map, TilemapOptions};

fn window_conf() -> Conf {
    Conf {
        window_title: "Parallax Example".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    let options = std::fs::read_to_string("assets/options.json")
        .ok()
        .and_then(|txt| TilemapOptions::from_json_str(&txt).ok())
        .unwrap_or_default();

    let mut map = Map::load_with_options("assets/map.json", &options).expect("Failed to load map");

    for layer in map.layers() {
        let kind = match layer {
            Layer::Tile(_) => "tiles",
            Layer::Image(_) => "image",
        };
        println!(
            "{kind:>5} {:<20} scroll={:?} offset={:?}",
            layer.name(),
            layer.scroll_scale(),
            layer.offset()
        );
    }

    let mut t = 0.0f32;
    let mut repeat = options.repeat_tiles;

    loop {
        clear_background(SKYBLUE);

        t += get_frame_time();
        if is_key_pressed(KeyCode::R) {
            repeat = !repeat;
            map.set_repeat_tiles(repeat);
        }
        if is_key_pressed(KeyCode::Equal) {
            let scale = map.tile_scale();
            map.set_tile_scale(scale + 1.0);
        }
        if is_key_pressed(KeyCode::Minus) {
            let scale = map.tile_scale();
            map.set_tile_scale((scale - 1.0).max(1.0));
        }

        map.resize_viewport(screen_width(), screen_height());
        map.update(get_frame_time() * 1000.0);
        map.draw(t * 60.0, 0.0);

        draw_text("parallax example (R: repeat, +/-: scale)", 20.0, 30.0, 32.0, WHITE);
        next_frame().await;
    }
}
