use anyhow::Context;
use macroquad::prelude::*;
use macroquad_tiled_gpu::{Map, TilemapOptions};

// ❶ Override the default 800 × 450 pixels here
fn window_conf() -> Conf {
    Conf {
        window_title: "Basic Map".into(),
        window_width: 1280, // ← any size you like
        window_height: 720,
        ..Default::default()
    }
}

fn load() -> anyhow::Result<Map> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "assets/map.json".to_owned());
    let options = TilemapOptions {
        tile_scale: 2.0,
        ..Default::default()
    };
    Map::load_with_options(&path, &options).with_context(|| format!("Loading map {path}"))
}

#[macroquad::main(window_conf)] // ❷ pass the window config function here
async fn main() {
    env_logger::init();

    let mut map = match load() {
        Ok(map) => map,
        Err(e) => {
            log::error!("{e:#}");
            return;
        }
    };

    let mut camera = Vec2::ZERO;
    let speed = 240.0;

    loop {
        clear_background(BLACK);

        let dt = get_frame_time();
        if is_key_down(KeyCode::Right) {
            camera.x += speed * dt;
        }
        if is_key_down(KeyCode::Left) {
            camera.x -= speed * dt;
        }
        if is_key_down(KeyCode::Down) {
            camera.y += speed * dt;
        }
        if is_key_down(KeyCode::Up) {
            camera.y -= speed * dt;
        }

        map.resize_viewport(screen_width(), screen_height());
        map.update(dt * 1000.0);
        let stats = map.draw(camera.x, camera.y);

        // Draw the frame rate in the top-left corner
        draw_text(
            &format!("FPS: {}  draws: {}", get_fps(), stats.draw_calls),
            20.0,
            30.0,
            30.0,
            RED,
        );

        next_frame().await;
    }
}
