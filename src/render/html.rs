use std::path::Path;

use anyhow::{Context, Result};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use serde_json::json;

use super::markers::{MapMarker, MarkerDetail, RenderedMap};
use super::MapStyle;
use crate::color::{to_hex, ColorScale};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const ZOOM_START: u8 = 11;
const MARKER_RADIUS: u8 = 8;
const LEGEND_STEPS: usize = 8;

// ---------------------------------------------------------------------------
// Popup
// ---------------------------------------------------------------------------

pub fn popup_markup(detail: &MarkerDetail) -> Markup {
    html! {
        div style="width:300px; max-height:250px; overflow-y:auto;" {
            h4 style="margin-top:0; margin-bottom:10px;" { "건물 상세 정보" }
            table style="width:100%; border-collapse:collapse;" {
                tr { td style="width:120px;" { b { "번호:" } } td { (detail.id) } }
                tr { td style="width:120px;" { b { "주소:" } } td { (detail.address) } }
                tr { td style="width:120px;" { b { "주택유형:" } } td { (detail.housing_type) } }
                tr { td style="width:120px;" { b { "전용면적:" } } td { (format!("{:.1}평", detail.area_pyeong)) } }
                tr { td style="width:120px;" { b { "보증금:" } } td { (detail.deposit as i64) "만원" } }
                tr { td style="width:120px;" { b { "m2당 보증금:" } } td { (detail.deposit_per_m2 as i64) "만원" } }
                tr { td style="width:120px;" { b { "예상통근시간:" } } td { (detail.commute) } }
                tr { td style="width:120px;" { b { "신청자수:" } } td { (detail.applicants) "명" } }
                @if let Some(station) = &detail.nearest_station {
                    tr {
                        td style="width:120px;" { b { "가까운 역:" } }
                        td {
                            (station)
                            @if let Some(d) = detail.station_distance_m { " (" (d as i64) "m)" }
                        }
                    }
                }
            }
            div style="margin-top:10px;" {
                a href=(detail.roadview_url) target="_blank" { "카카오맵 로드뷰 보기" }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Standalone Leaflet page
// ---------------------------------------------------------------------------

/// Render the current view as a self-contained Leaflet page.
pub fn map_page(map: &RenderedMap, scale: &ColorScale, style: MapStyle) -> Markup {
    let center = map
        .center
        .map(|c| [c.lat, c.lon])
        .unwrap_or([37.5665, 126.978]);
    let markers: Vec<_> = map.markers.iter().map(marker_json).collect();
    let legend: Vec<String> = scale.legend_steps(LEGEND_STEPS).into_iter().map(to_hex).collect();

    let data = json!({
        "center": center,
        "zoom": ZOOM_START,
        "tiles": { "url": style.tile_url(), "attribution": style.attribution() },
        "markers": markers,
        "legend": {
            "caption": scale.column.caption(),
            "colors": legend,
            "min": scale.bounds().map(|b| b.0),
            "max": scale.bounds().map(|b| b.1),
        },
    });
    // Keep the payload from closing the surrounding <script>.
    let payload = data.to_string().replace("</", "<\\/");

    html! {
        (DOCTYPE)
        html lang="ko" {
            head {
                meta charset="utf-8";
                title { "든든전세주택 위치 지도" }
                link rel="stylesheet" href=(LEAFLET_CSS);
                script src=(LEAFLET_JS) {}
                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                div #map {}
                script { (PreEscaped(format!("const DATA = {payload};\n{PAGE_JS}"))) }
            }
        }
    }
}

fn marker_json(marker: &MapMarker) -> serde_json::Value {
    json!({
        "id": marker.id.0,
        "lat": marker.position.lat,
        "lon": marker.position.lon,
        "fill": to_hex(marker.fill),
        "radius": MARKER_RADIUS,
        "tooltip": marker.tooltip,
        "popup": popup_markup(&marker.detail).into_string(),
    })
}

pub fn export_html(path: &Path, map: &RenderedMap, scale: &ColorScale, style: MapStyle) -> Result<()> {
    let page = map_page(map, scale, style).into_string();
    std::fs::write(path, page).with_context(|| format!("writing {}", path.display()))?;
    log::info!("Exported {} markers to {}", map.markers.len(), path.display());
    Ok(())
}

const PAGE_CSS: &str = "html, body, #map { height: 100%; margin: 0; }
.legend { background: white; padding: 6px 8px; border-radius: 4px; font: 12px sans-serif; }
.legend .bar { height: 10px; width: 200px; }";

const PAGE_JS: &str = r#"const map = L.map('map').setView(DATA.center, DATA.zoom);
L.tileLayer(DATA.tiles.url, { attribution: DATA.tiles.attribution, subdomains: 'abcd' }).addTo(map);
for (const m of DATA.markers) {
  L.circleMarker([m.lat, m.lon], {
    radius: m.radius, color: 'black', weight: 1, fill: true, fillColor: m.fill, fillOpacity: 0.7,
  }).bindPopup(m.popup, { maxWidth: 300 }).bindTooltip(m.tooltip).addTo(map);
}
const legend = L.control({ position: 'topright' });
legend.onAdd = () => {
  const div = L.DomUtil.create('div', 'legend');
  const bar = document.createElement('div');
  bar.className = 'bar';
  bar.style.background = DATA.legend.colors.length > 1
    ? `linear-gradient(to right, ${DATA.legend.colors.join(',')})`
    : DATA.legend.colors[0];
  const caption = document.createElement('div');
  const range = DATA.legend.min === null ? '' : ` ${DATA.legend.min} – ${DATA.legend.max}`;
  caption.textContent = DATA.legend.caption + range;
  div.append(caption, bar);
  return div;
};
legend.addTo(map);"#;
