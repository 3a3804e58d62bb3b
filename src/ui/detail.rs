use eframe::egui::{self, Grid, RichText, Ui};

use crate::render::MarkerDetail;
use crate::state::AppState;

/// Right panel: detail of the selected listing, if it is still on the map.
pub fn detail_panel(ui: &mut Ui, state: &AppState) {
    ui.heading("건물 상세 정보");
    ui.separator();

    let Some(marker) = state.selected_marker() else {
        ui.label("지도에서 건물을 클릭하세요.");
        return;
    };
    let detail = &marker.detail;

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            detail_grid(ui, detail);
            ui.add_space(8.0);
            ui.hyperlink_to("카카오맵 로드뷰 보기", &detail.roadview_url);

            if let Some(image) = &detail.image {
                ui.add_space(8.0);
                ui.strong("평면도");
                ui.add(
                    egui::Image::new(format!("file://{}", image.display()))
                        .max_width(ui.available_width())
                        .max_height(300.0),
                );
            }
        });
}

fn detail_grid(ui: &mut Ui, detail: &MarkerDetail) {
    Grid::new("listing_detail")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            row(ui, "번호", detail.id.to_string());
            row(ui, "주소", detail.address.clone());
            row(ui, "주택유형", detail.housing_type.clone());
            row(ui, "전용면적", format!("{:.1}평", detail.area_pyeong));
            row(ui, "보증금", format!("{}만원", detail.deposit as i64));
            row(ui, "m2당 보증금", format!("{}만원", detail.deposit_per_m2 as i64));
            row(ui, "예상통근시간", detail.commute.to_string());
            row(ui, "신청자수", format!("{}명", detail.applicants));
            if let Some(station) = &detail.nearest_station {
                let text = match detail.station_distance_m {
                    Some(d) => format!("{station} ({}m)", d as i64),
                    None => station.clone(),
                };
                row(ui, "가까운 역", text);
            }
        });
}

fn row(ui: &mut Ui, label: &str, value: String) {
    ui.label(RichText::new(label).strong());
    ui.label(value);
    ui.end_row();
}
