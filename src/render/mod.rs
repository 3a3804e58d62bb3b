//! Turning the filtered, colourized listings into map markers.

pub mod html;
pub mod markers;

use serde::Deserialize;

pub use markers::{build_markers, MapMarker, MarkerDetail, RenderedMap};

// ---------------------------------------------------------------------------
// Map style (tile layer)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStyle {
    #[default]
    OpenStreetMap,
    StamenTerrain,
    StamenToner,
    CartoDbPositron,
    CartoDbDarkMatter,
}

impl MapStyle {
    pub const ALL: [MapStyle; 5] = [
        MapStyle::OpenStreetMap,
        MapStyle::StamenTerrain,
        MapStyle::StamenToner,
        MapStyle::CartoDbPositron,
        MapStyle::CartoDbDarkMatter,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MapStyle::OpenStreetMap => "OpenStreetMap",
            MapStyle::StamenTerrain => "Stamen Terrain",
            MapStyle::StamenToner => "Stamen Toner",
            MapStyle::CartoDbPositron => "CartoDB positron",
            MapStyle::CartoDbDarkMatter => "CartoDB dark_matter",
        }
    }

    /// Leaflet-style `{z}/{x}/{y}` tile URL template.
    pub fn tile_url(&self) -> &'static str {
        match self {
            MapStyle::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            MapStyle::StamenTerrain => {
                "https://tiles.stadiamaps.com/tiles/stamen_terrain/{z}/{x}/{y}.png"
            }
            MapStyle::StamenToner => "https://tiles.stadiamaps.com/tiles/stamen_toner/{z}/{x}/{y}.png",
            MapStyle::CartoDbPositron => {
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png"
            }
            MapStyle::CartoDbDarkMatter => {
                "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png"
            }
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            MapStyle::OpenStreetMap => "&copy; OpenStreetMap contributors",
            MapStyle::StamenTerrain | MapStyle::StamenToner => {
                "&copy; Stadia Maps &copy; Stamen Design &copy; OpenStreetMap contributors"
            }
            MapStyle::CartoDbPositron | MapStyle::CartoDbDarkMatter => {
                "&copy; OpenStreetMap contributors &copy; CARTO"
            }
        }
    }

    /// Dark basemaps get a dark plot background in the app.
    pub fn is_dark(&self) -> bool {
        matches!(self, MapStyle::StamenToner | MapStyle::CartoDbDarkMatter)
    }
}
