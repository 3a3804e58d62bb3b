use crate::data::model::ListingId;
use crate::render::{MapMarker, RenderedMap};

// ---------------------------------------------------------------------------
// Selection: Idle / Selected(id)
// ---------------------------------------------------------------------------

/// Which listing's detail is shown.
///
/// Keyed by id, not by marker position, so a filter change can never make it
/// point at a different listing. An id that is no longer rendered resolves to
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Idle,
    Selected(ListingId),
}

impl Selection {
    /// Resolve a click on marker `index` of the currently rendered sequence.
    pub fn from_click(index: usize, markers: &[MapMarker]) -> Self {
        match markers.get(index) {
            Some(marker) => Selection::Selected(marker.id),
            None => {
                log::debug!(
                    "Click index {index} outside rendered range 0..{}",
                    markers.len()
                );
                Selection::Idle
            }
        }
    }

    /// A click replaces any prior selection.
    pub fn click(&mut self, index: usize, markers: &[MapMarker]) {
        *self = Selection::from_click(index, markers);
    }

    pub fn id(&self) -> Option<ListingId> {
        match self {
            Selection::Idle => None,
            Selection::Selected(id) => Some(*id),
        }
    }

    /// The selected marker, if it is part of `map`.
    pub fn resolve<'a>(&self, map: &'a RenderedMap) -> Option<&'a MapMarker> {
        let index = map.position_of(self.id()?)?;
        map.markers.get(index)
    }
}

/// Index of the marker closest to `click` within `tolerance`, measured in the
/// space `project` maps marker positions into (screen pixels in the UI).
pub fn nearest_marker(
    markers: &[MapMarker],
    click: [f64; 2],
    tolerance: f64,
    project: impl Fn(&MapMarker) -> [f64; 2],
) -> Option<usize> {
    markers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let [x, y] = project(m);
            let d = ((x - click[0]).powi(2) + (y - click[1]).powi(2)).sqrt();
            (i, d)
        })
        .filter(|(_, d)| *d <= tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorColumn, ColorScale};
    use crate::data::filter::{filtered_indices, FilterCriteria};
    use crate::data::model::tests::listing;
    use crate::data::model::{CommuteTime, ListingTable};
    use crate::render::build_markers;
    use std::path::Path;

    fn table() -> ListingTable {
        ListingTable::from_listings(vec![
            listing(1, 10000.0, Some(30.0)),
            listing(2, 20000.0, Some(60.0)),
            listing(3, 40000.0, Some(120.0)),
        ])
    }

    fn view(table: &ListingTable, criteria: FilterCriteria) -> RenderedMap {
        let visible = filtered_indices(table, &criteria);
        let scale = ColorScale::for_rows(
            ColorColumn::Deposit,
            visible.iter().map(|&i| &table.listings[i]),
        );
        build_markers(table, &visible, &scale, Path::new("."))
    }

    #[test]
    fn click_in_range_selects_that_row() {
        let table = table();
        let map = view(&table, FilterCriteria::new(25000.0, 90.0));
        for (i, marker) in map.markers.iter().enumerate() {
            let sel = Selection::from_click(i, &map.markers);
            assert_eq!(sel, Selection::Selected(marker.id));
            assert_eq!(sel.resolve(&map).map(|m| m.id), Some(marker.id));
        }
    }

    #[test]
    fn click_out_of_range_is_idle() {
        let table = table();
        let map = view(&table, FilterCriteria::new(25000.0, 90.0));
        assert_eq!(Selection::from_click(2, &map.markers), Selection::Idle);
        assert_eq!(Selection::from_click(usize::MAX, &map.markers), Selection::Idle);
        assert_eq!(Selection::from_click(0, &[]), Selection::Idle);
    }

    #[test]
    fn new_click_replaces_selection() {
        let table = table();
        let map = view(&table, FilterCriteria::new(50000.0, 180.0));
        let mut sel = Selection::default();
        sel.click(0, &map.markers);
        sel.click(2, &map.markers);
        assert_eq!(sel, Selection::Selected(ListingId(3)));
    }

    #[test]
    fn selection_survives_filter_change_by_id() {
        let table = table();
        let wide = view(&table, FilterCriteria::new(50000.0, 180.0));
        let sel = Selection::from_click(1, &wide.markers);
        assert_eq!(sel, Selection::Selected(ListingId(2)));

        // Listing 1 drops out; listing 2 moves to position 0 but stays selected.
        let mut recomputed = table.clone();
        recomputed.listings[0].commute = CommuteTime::Unknown;
        let shifted = view(&recomputed, FilterCriteria::new(50000.0, 180.0));
        assert_eq!(shifted.position_of(ListingId(2)), Some(0));
        assert_eq!(sel.resolve(&shifted).map(|m| m.id), Some(ListingId(2)));

        // Listing 2 filtered out: no selection rather than a wrong row.
        let tiny = view(&table, FilterCriteria::new(15000.0, 90.0));
        assert!(sel.resolve(&tiny).is_none());
    }

    #[test]
    fn nearest_marker_respects_tolerance() {
        let table = table();
        let map = view(&table, FilterCriteria::new(50000.0, 180.0));
        let project = |m: &MapMarker| [m.position.lon * 1000.0, m.position.lat * 1000.0];
        let [x, y] = project(&map.markers[1]);
        assert_eq!(nearest_marker(&map.markers, [x + 1.0, y], 5.0, project), Some(1));
        assert_eq!(nearest_marker(&map.markers, [x - 8.0, y + 8.0], 5.0, project), None);
    }
}
