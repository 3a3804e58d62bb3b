use eframe::egui::{self, Color32, RichText, ScrollArea, Sense, Ui};

use crate::color::ColorColumn;
use crate::data::filter::{FilterCriteria, FilterOutcome};
use crate::render::html::export_html;
use crate::render::MapStyle;
use crate::state::{AppState, Status, StatusKind};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("필터 설정");
    ui.separator();

    if state.table.is_none() {
        ui.label("불러온 데이터가 없습니다.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Thresholds ----
            let mut criteria = state.criteria;
            ui.strong("최대 보증금(만원)");
            ui.add(
                egui::DragValue::new(&mut criteria.max_deposit)
                    .speed(1000.0)
                    .range(0.0..=f64::MAX)
                    .suffix(" 만원"),
            );
            ui.strong("최대 통근시간(분)");
            ui.add(
                egui::DragValue::new(&mut criteria.max_commute_minutes)
                    .speed(5.0)
                    .range(0.0..=f64::MAX)
                    .suffix(" 분"),
            );
            state.set_criteria(FilterCriteria::new(
                criteria.max_deposit,
                criteria.max_commute_minutes,
            ));
            ui.separator();

            // ---- Colour-by selector ----
            ui.strong("건물 표시색상");
            let current = state.color_column;
            egui::ComboBox::from_id_salt("color_by")
                .selected_text(current.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for column in ColorColumn::ALL {
                        if ui
                            .selectable_label(current == column, column.label())
                            .clicked()
                        {
                            state.set_color_column(column);
                        }
                    }
                });
            legend(ui, state);
            ui.separator();

            // ---- Map style ----
            ui.strong("지도 스타일");
            egui::ComboBox::from_id_salt("map_style")
                .selected_text(state.map_style.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for style in MapStyle::ALL {
                        ui.selectable_value(&mut state.map_style, style, style.label());
                    }
                });
            ui.separator();

            office_section(ui, state);
        });
}

/// Gradient bar with the observed range of the colour column.
fn legend(ui: &mut Ui, state: &AppState) {
    let scale = &state.color_scale;
    ui.label(RichText::new(scale.column.caption()).small());

    let steps = scale.legend_steps(32);
    let (rect, _) = ui.allocate_exact_size(egui::vec2(ui.available_width(), 10.0), Sense::hover());
    let step_width = rect.width() / steps.len() as f32;
    for (i, color) in steps.iter().enumerate() {
        let x = rect.left() + i as f32 * step_width;
        let swatch = egui::Rect::from_min_size(egui::pos2(x, rect.top()), egui::vec2(step_width, rect.height()));
        ui.painter().rect_filled(swatch, 0.0, *color);
    }

    match scale.bounds() {
        Some((lo, hi)) if !scale.is_constant() => {
            ui.horizontal(|ui: &mut Ui| {
                ui.small(format!("{lo:.0}"));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui: &mut Ui| {
                    ui.small(format!("{hi:.0}"));
                });
            });
        }
        Some((v, _)) => {
            ui.small(format!("모든 값 {v:.0}"));
        }
        None => {}
    }
}

/// Office address → commute recomputation.
fn office_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("회사 주소");
    let running = state.geo_job.is_some();
    ui.add_enabled(
        !running,
        egui::TextEdit::singleline(&mut state.office_address).hint_text("예: 경기 성남시 분당구 판교역로 166"),
    );

    if !state.geo_available() {
        ui.label(RichText::new("카카오 API 클라이언트를 사용할 수 없습니다").color(Color32::RED));
        return;
    }

    if let Some(job) = &state.geo_job {
        let fraction = if job.total == 0 {
            0.0
        } else {
            job.done as f32 / job.total as f32
        };
        ui.small(format!("'{}' 기준으로 계산 중", job.address));
        ui.add(egui::ProgressBar::new(fraction).text(format!("{}/{}", job.done, job.total)));
    } else if ui.button("통근시간 다시 계산").clicked() {
        let ctx = ui.ctx().clone();
        state.start_geo_update(move || ctx.request_repaint());
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("파일", |ui: &mut Ui| {
            if ui.button("열기…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = !state.rendered.markers.is_empty();
            if ui.add_enabled(can_export, egui::Button::new("지도 내보내기…")).clicked() {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!("전체 {}개 중 {}개 표시", table.len(), state.visible.len()));
            match state.filter_outcome() {
                FilterOutcome::Matches(n) => {
                    ui.label(RichText::new(format!("조건에 맞는 건물: {n}개")).color(Color32::LIGHT_BLUE));
                }
                FilterOutcome::NoMatches => {
                    ui.label(
                        RichText::new("필터링 조건에 맞는 데이터가 없습니다. 필터 설정을 조정해주세요.")
                            .color(Color32::YELLOW),
                    );
                }
            }
            if state.rendered.skipped_without_coords > 0 {
                ui.label(format!(
                    "(좌표 없음 {}개)",
                    state.rendered.skipped_without_coords
                ));
            }
        }

        ui.separator();

        if let Some(status) = &state.status {
            let color = match status.kind {
                StatusKind::Info => Color32::LIGHT_GREEN,
                StatusKind::Warning => Color32::YELLOW,
                StatusKind::Error => Color32::RED,
            };
            ui.label(RichText::new(&status.message).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("매물 데이터 열기")
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.load(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("지도 내보내기")
        .add_filter("HTML", &["html"])
        .set_file_name("map.html")
        .save_file();

    if let Some(path) = file {
        if let Err(e) = export_html(&path, &state.rendered, &state.color_scale, state.map_style) {
            log::error!("Failed to export map: {e:#}");
            state.status = Some(Status::new(StatusKind::Error, format!("지도를 내보낼 수 없습니다: {e:#}")));
        }
    }
}
