use eframe::egui::Color32;
use palette::{named, LinSrgb, Mix, Srgb};
use serde::Deserialize;

use crate::data::model::Listing;

// ---------------------------------------------------------------------------
// Colour-by column
// ---------------------------------------------------------------------------

/// Numeric listing attribute markers can be coloured by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorColumn {
    Deposit,
    #[default]
    DepositPerArea,
    Applicants,
    CommuteTime,
}

impl ColorColumn {
    pub const ALL: [ColorColumn; 4] = [
        ColorColumn::Deposit,
        ColorColumn::Applicants,
        ColorColumn::DepositPerArea,
        ColorColumn::CommuteTime,
    ];

    /// Name shown in the colour-by selector.
    pub fn label(&self) -> &'static str {
        match self {
            ColorColumn::Deposit => "보증금",
            ColorColumn::DepositPerArea => "m2당 보증금",
            ColorColumn::Applicants => "신청자수",
            ColorColumn::CommuteTime => "예상통근시간",
        }
    }

    /// Legend caption, with unit.
    pub fn caption(&self) -> &'static str {
        match self {
            ColorColumn::Deposit => "보증금 (만원)",
            ColorColumn::DepositPerArea => "m2당 보증금",
            ColorColumn::Applicants => "신청자수 (명)",
            ColorColumn::CommuteTime => "예상통근시간 (분)",
        }
    }

    pub fn value(&self, listing: &Listing) -> Option<f64> {
        match self {
            ColorColumn::Deposit => Some(listing.deposit),
            ColorColumn::DepositPerArea => Some(listing.deposit_per_m2),
            ColorColumn::Applicants => Some(listing.applicants as f64),
            ColorColumn::CommuteTime => listing.commute.minutes(),
        }
        .filter(|v| v.is_finite())
    }
}

// ---------------------------------------------------------------------------
// Continuous colour scale: value → Color32
// ---------------------------------------------------------------------------

/// Used for every row when the observed range is degenerate.
pub const DEFAULT_COLOR: Color32 = Color32::BLUE;
/// Used for rows without a value in the chosen column.
pub const MISSING_COLOR: Color32 = Color32::GRAY;

/// Linear blue → green → yellow → red scale anchored on the observed range
/// of the rows it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    pub column: ColorColumn,
    /// `None` when there is no usable range (no values, or min == max).
    range: Option<(f64, f64)>,
    observed: Option<(f64, f64)>,
}

impl ColorScale {
    /// Anchor the scale on `rows`, normally the filtered subset.
    pub fn for_rows<'a>(column: ColorColumn, rows: impl IntoIterator<Item = &'a Listing>) -> Self {
        let observed = rows
            .into_iter()
            .filter_map(|l| column.value(l))
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            });

        // Zero variance (including a single row) maps everything to one colour.
        let range = observed.filter(|(lo, hi)| hi > lo);

        ColorScale {
            column,
            range,
            observed,
        }
    }

    /// Observed (min, max) of the anchoring rows.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.observed
    }

    pub fn is_constant(&self) -> bool {
        self.range.is_none()
    }

    pub fn color_for(&self, listing: &Listing) -> Color32 {
        match self.column.value(listing) {
            Some(v) => self.color_for_value(v),
            None => MISSING_COLOR,
        }
    }

    pub fn color_for_value(&self, value: f64) -> Color32 {
        match self.range {
            Some((lo, hi)) => gradient(((value - lo) / (hi - lo)).clamp(0.0, 1.0) as f32),
            None => DEFAULT_COLOR,
        }
    }

    /// Evenly spaced swatches for the legend.
    pub fn legend_steps(&self, n: usize) -> Vec<Color32> {
        if self.is_constant() || n < 2 {
            return vec![DEFAULT_COLOR];
        }
        (0..n)
            .map(|i| gradient(i as f32 / (n - 1) as f32))
            .collect()
    }
}

/// Piecewise-linear interpolation over the four stops, in linear RGB.
fn gradient(t: f32) -> Color32 {
    let stops: [LinSrgb; 4] = [named::BLUE, named::GREEN, named::YELLOW, named::RED]
        .map(|c| c.into_format::<f32>().into_linear());

    let segments = (stops.len() - 1) as f32;
    let scaled = t * segments;
    let idx = (scaled.floor() as usize).min(stops.len() - 2);
    let local = scaled - idx as f32;

    let mixed = stops[idx].mix(stops[idx + 1], local);
    let rgb: Srgb<u8> = Srgb::<f32>::from_linear(mixed).into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

/// `#rrggbb`, for the exported HTML map.
pub fn to_hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filtered_indices, FilterCriteria};
    use crate::data::model::tests::listing;
    use crate::data::model::ListingTable;

    #[test]
    fn single_row_gets_default_color() {
        let rows = vec![listing(1, 10000.0, Some(30.0))];
        for column in ColorColumn::ALL {
            let scale = ColorScale::for_rows(column, &rows);
            assert!(scale.is_constant());
            assert_eq!(scale.color_for(&rows[0]), DEFAULT_COLOR);
        }
    }

    #[test]
    fn zero_variance_gets_default_color() {
        let rows = vec![listing(1, 10000.0, Some(30.0)), listing(2, 10000.0, Some(30.0))];
        let scale = ColorScale::for_rows(ColorColumn::Deposit, &rows);
        assert!(scale.is_constant());
        assert!(rows.iter().all(|l| scale.color_for(l) == DEFAULT_COLOR));
        assert_eq!(scale.bounds(), Some((10000.0, 10000.0)));
    }

    #[test]
    fn empty_rows_do_not_panic() {
        let scale = ColorScale::for_rows(ColorColumn::Applicants, std::iter::empty());
        assert!(scale.is_constant());
        assert_eq!(scale.bounds(), None);
        assert_eq!(scale.color_for_value(3.0), DEFAULT_COLOR);
    }

    #[test]
    fn endpoints_hit_first_and_last_stop() {
        let rows = vec![listing(1, 0.0, Some(1.0)), listing(2, 100.0, Some(1.0))];
        let scale = ColorScale::for_rows(ColorColumn::Deposit, &rows);
        assert_eq!(scale.color_for(&rows[0]), Color32::from_rgb(0, 0, 255));
        assert_eq!(scale.color_for(&rows[1]), Color32::from_rgb(255, 0, 0));
        assert_eq!(scale.legend_steps(4).len(), 4);
    }

    #[test]
    fn unknown_commute_uses_missing_color() {
        let rows = vec![
            listing(1, 1.0, Some(10.0)),
            listing(2, 1.0, Some(20.0)),
            listing(3, 1.0, None),
        ];
        let scale = ColorScale::for_rows(ColorColumn::CommuteTime, &rows);
        assert_eq!(scale.bounds(), Some((10.0, 20.0)));
        assert_eq!(scale.color_for(&rows[2]), MISSING_COLOR);
    }

    #[test]
    fn anchors_follow_the_filtered_subset() {
        let table = ListingTable::from_listings(vec![
            listing(1, 10000.0, Some(30.0)),
            listing(2, 20000.0, Some(60.0)),
            listing(3, 40000.0, Some(120.0)),
        ]);
        let scale_for = |criteria: FilterCriteria| {
            let visible = filtered_indices(&table, &criteria);
            ColorScale::for_rows(
                ColorColumn::Deposit,
                visible.iter().map(|&i| &table.listings[i]),
            )
        };

        let wide = scale_for(FilterCriteria::new(50000.0, 180.0));
        let narrow = scale_for(FilterCriteria::new(25000.0, 90.0));
        assert_eq!(wide.bounds(), Some((10000.0, 40000.0)));
        assert_eq!(narrow.bounds(), Some((10000.0, 20000.0)));

        // Listing 2 is visible in both views but sits at the top of the narrow range.
        let second = &table.listings[1];
        assert_ne!(wide.color_for(second), narrow.color_for(second));
        assert_eq!(narrow.color_for(second), Color32::from_rgb(255, 0, 0));
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(to_hex(Color32::from_rgb(255, 0, 16)), "#ff0010");
    }
}
