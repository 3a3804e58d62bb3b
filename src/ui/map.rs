use eframe::egui::{self, Color32, Ui};
use egui_plot::{MarkerShape, Plot, PlotPoint, Points};

use crate::selection::nearest_marker;
use crate::state::AppState;

const MARKER_RADIUS: f32 = 6.0;
/// Screen distance within which a click picks a marker.
const CLICK_TOLERANCE_PX: f64 = 12.0;

// ---------------------------------------------------------------------------
// Listing map (central panel)
// ---------------------------------------------------------------------------

/// Render the listing map in the central panel.
pub fn listing_map(ui: &mut Ui, state: &mut AppState) {
    if state.table.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            match &state.status {
                Some(status) => ui.heading(&status.message),
                None => ui.heading("파일 → 열기…에서 매물 데이터를 불러오세요"),
            };
        });
        return;
    }

    if state.rendered.markers.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("필터링 조건에 맞는 데이터가 없습니다.");
        });
        return;
    }

    // Longitude degrees shrink with latitude; keep the map undistorted.
    let aspect = state
        .rendered
        .center
        .map(|c| 1.0 / c.lat.to_radians().cos())
        .unwrap_or(1.0) as f32;

    let selected = state.selection.id();
    let dark = state.map_style.is_dark();

    let response = ui
        .scope(|ui: &mut Ui| {
            *ui.visuals_mut() = if dark {
                egui::Visuals::dark()
            } else {
                egui::Visuals::light()
            };

            Plot::new("listing_map")
                .data_aspect(aspect)
                .x_axis_label("경도")
                .y_axis_label("위도")
                .allow_boxed_zoom(true)
                .allow_drag(true)
                .allow_scroll(true)
                .allow_zoom(true)
                .label_formatter(|name, value| {
                    if name.is_empty() {
                        format!("{:.5}, {:.5}", value.y, value.x)
                    } else {
                        name.to_owned()
                    }
                })
                .show(ui, |plot_ui| {
                    for marker in &state.rendered.markers {
                        let point = [marker.position.lon, marker.position.lat];
                        if selected == Some(marker.id) {
                            plot_ui.points(
                                Points::new(vec![point])
                                    .shape(MarkerShape::Circle)
                                    .radius(MARKER_RADIUS + 3.0)
                                    .filled(false)
                                    .color(if dark { Color32::WHITE } else { Color32::BLACK }),
                            );
                        }
                        plot_ui.points(
                            Points::new(vec![point])
                                .shape(MarkerShape::Circle)
                                .radius(MARKER_RADIUS)
                                .filled(true)
                                .color(marker.fill.gamma_multiply(0.85))
                                .name(&marker.tooltip),
                        );
                    }
                })
        })
        .inner;

    if !response.response.clicked() {
        return;
    }
    let Some(pointer) = response.response.interact_pointer_pos() else {
        return;
    };
    let transform = &response.transform;
    let hit = nearest_marker(
        &state.rendered.markers,
        [pointer.x as f64, pointer.y as f64],
        CLICK_TOLERANCE_PX,
        |m| {
            let p = transform.position_from_point(&PlotPoint::new(m.position.lon, m.position.lat));
            [p.x as f64, p.y as f64]
        },
    );
    if let Some(index) = hit {
        state.click_marker(index);
    }
}
