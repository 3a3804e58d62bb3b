use std::path::{Path, PathBuf};

use eframe::egui::Color32;

use crate::color::ColorScale;
use crate::data::model::{CommuteTime, GeoPoint, Listing, ListingId, ListingTable};

/// m² per pyeong (평).
pub const M2_PER_PYEONG: f64 = 3.30579;

const ROADVIEW_BASE_URL: &str = "https://map.kakao.com/link/roadview";
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

// ---------------------------------------------------------------------------
// Marker types
// ---------------------------------------------------------------------------

/// Popup / detail payload of one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDetail {
    pub id: ListingId,
    pub address: String,
    pub housing_type: String,
    pub area_pyeong: f64,
    pub deposit: f64,
    pub deposit_per_m2: f64,
    pub commute: CommuteTime,
    pub applicants: u32,
    pub nearest_station: Option<String>,
    pub station_distance_m: Option<f64>,
    pub roadview_url: String,
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub id: ListingId,
    pub position: GeoPoint,
    pub fill: Color32,
    pub tooltip: String,
    pub detail: MarkerDetail,
}

/// Everything needed to draw the current view. Rebuilt on every input change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedMap {
    pub markers: Vec<MapMarker>,
    /// Midpoint of the markers' bounding box; `None` when nothing is drawn.
    pub center: Option<GeoPoint>,
    pub skipped_without_coords: usize,
}

impl RenderedMap {
    pub fn position_of(&self, id: ListingId) -> Option<usize> {
        self.markers.iter().position(|m| m.id == id)
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// One marker per visible listing that has coordinates, in `visible` order.
pub fn build_markers(
    table: &ListingTable,
    visible: &[usize],
    scale: &ColorScale,
    images_dir: &Path,
) -> RenderedMap {
    let mut skipped_without_coords = 0;
    let markers: Vec<MapMarker> = visible
        .iter()
        .filter_map(|&idx| table.listings.get(idx))
        .filter_map(|listing| {
            let Some(position) = listing.coords else {
                skipped_without_coords += 1;
                return None;
            };
            Some(MapMarker {
                id: listing.id,
                position,
                fill: scale.color_for(listing),
                tooltip: format!(
                    "번호: {} | 보증금: {}만원",
                    listing.id, listing.deposit as i64
                ),
                detail: detail_for(listing, position, images_dir),
            })
        })
        .collect();

    if skipped_without_coords > 0 {
        log::debug!("{skipped_without_coords} visible listings have no coordinates");
    }

    RenderedMap {
        center: bounding_box_center(markers.iter().map(|m| m.position)),
        markers,
        skipped_without_coords,
    }
}

fn detail_for(listing: &Listing, position: GeoPoint, images_dir: &Path) -> MarkerDetail {
    MarkerDetail {
        id: listing.id,
        address: listing.address.clone(),
        housing_type: listing.housing_type.clone(),
        area_pyeong: to_pyeong(listing.area_m2),
        deposit: listing.deposit,
        deposit_per_m2: listing.deposit_per_m2,
        commute: listing.commute,
        applicants: listing.applicants,
        nearest_station: listing.nearest_station.clone(),
        station_distance_m: listing.station_distance_m,
        roadview_url: roadview_url(position),
        image: resolve_image(listing, images_dir),
    }
}

/// Area in pyeong, rounded to one decimal.
pub fn to_pyeong(area_m2: f64) -> f64 {
    (area_m2 / M2_PER_PYEONG * 10.0).round() / 10.0
}

pub fn roadview_url(position: GeoPoint) -> String {
    format!("{ROADVIEW_BASE_URL}/{},{}", position.lat, position.lon)
}

pub fn bounding_box_center(points: impl IntoIterator<Item = GeoPoint>) -> Option<GeoPoint> {
    let (min, max) = points.into_iter().fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((lo, hi)) => Some((
            GeoPoint::new(f64::min(lo.lat, p.lat), f64::min(lo.lon, p.lon)),
            GeoPoint::new(f64::max(hi.lat, p.lat), f64::max(hi.lon, p.lon)),
        )),
    })?;
    Some(GeoPoint::new((min.lat + max.lat) / 2.0, (min.lon + max.lon) / 2.0))
}

/// Floor-plan image for a listing, keyed by its id.
///
/// An explicit image reference wins (relative paths resolve against
/// `images_dir`); otherwise `{images_dir}/{id}.{png,jpg,jpeg}` if present.
pub fn resolve_image(listing: &Listing, images_dir: &Path) -> Option<PathBuf> {
    if let Some(image) = &listing.image {
        let path = if image.is_absolute() {
            image.clone()
        } else {
            images_dir.join(image)
        };
        return Some(path);
    }
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| images_dir.join(format!("{}.{ext}", listing.id)))
        .find(|p| p.is_file())
}
