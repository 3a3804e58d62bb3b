use eframe::egui;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::ui::{detail, map, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct JeonseMapApp {
    pub state: AppState,
}

impl JeonseMapApp {
    /// Build the session and load the configured listing file.
    pub fn new(config: AppConfig) -> Self {
        let mut state = AppState::new(config);
        let path = state.data_path.clone();
        state.load(&path);
        Self { state }
    }
}

impl eframe::App for JeonseMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll_geo_update();

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Right side panel: selected listing ----
        if self.state.table.is_some() {
            egui::SidePanel::right("detail_panel")
                .default_width(320.0)
                .resizable(true)
                .show(ctx, |ui| {
                    detail::detail_panel(ui, &self.state);
                });
        }

        // ---- Central panel: map ----
        egui::CentralPanel::default().show(ctx, |ui| {
            map::listing_map(ui, &mut self.state);
        });
    }
}
