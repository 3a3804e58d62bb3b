mod app;
mod color;
mod config;
mod data;
mod geo;
mod render;
mod selection;
mod state;
mod ui;

use app::JeonseMapApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration, falling back to defaults: {e:#}");
            config::AppConfig::default()
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "든든전세주택 대시보드",
        options,
        Box::new(|cc| {
            // Install image loaders so egui can render floor-plan png/jpg files.
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(JeonseMapApp::new(config)))
        }),
    )
}
