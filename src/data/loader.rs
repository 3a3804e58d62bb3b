use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use thiserror::Error;

use super::model::{CommuteTime, GeoPoint, Listing, ListingId, ListingTable};
use crate::config::ColumnNames;

/// Relative tolerance for the stored deposit-per-m² column.
const DEPOSIT_PER_M2_REL_TOLERANCE: f64 = 0.01;
/// The source rounds deposit-per-m² to whole 만원.
const DEPOSIT_PER_M2_ABS_TOLERANCE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a listing file could not be turned into a table.
///
/// Distinct from an empty *filter* result: any of these halts rendering.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("listing file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("required column '{0}' is missing")]
    MissingColumn(String),
    #[error("row {row}, column '{column}': invalid value '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("duplicate listing id {0}")]
    DuplicateId(ListingId),
    #[error("listing file contains no rows")]
    Empty,
}

/// Load-time repairs, reported alongside the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Rows whose stored deposit-per-m² disagreed with deposit / area.
    pub repaired_deposit_per_m2: usize,
    pub without_coords: usize,
    pub unknown_commute: usize,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load listings from a CSV file, sorted ascending by id.
pub fn load_listings(
    path: &Path,
    columns: &ColumnNames,
) -> Result<(ListingTable, LoadReport), LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_listings(file, columns)
}

/// Parse listings from any reader. Split out for tests.
pub fn read_listings<R: std::io::Read>(
    reader: R,
    columns: &ColumnNames,
) -> Result<(ListingTable, LoadReport), LoadError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(LoadError::Empty);
    }
    let layout = ColumnLayout::resolve(&headers, columns)?;

    let mut report = LoadReport::default();
    let mut seen = BTreeSet::new();
    let mut listings = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        // 1-based, counting the header line
        let row = row_no + 2;
        let listing = layout.parse_row(&record, row, &mut report)?;
        if !seen.insert(listing.id) {
            return Err(LoadError::DuplicateId(listing.id));
        }
        listings.push(listing);
    }

    if listings.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok((ListingTable::from_listings(listings), report))
}

// ---------------------------------------------------------------------------
// Header resolution
// ---------------------------------------------------------------------------

struct ColumnLayout<'a> {
    names: &'a ColumnNames,
    id: usize,
    address: usize,
    housing_type: usize,
    area_m2: usize,
    deposit: usize,
    deposit_per_m2: Option<usize>,
    commute: usize,
    applicants: usize,
    latitude: usize,
    longitude: usize,
    nearest_station: Option<usize>,
    station_distance: Option<usize>,
    image: Option<usize>,
}

impl<'a> ColumnLayout<'a> {
    fn resolve(headers: &StringRecord, names: &'a ColumnNames) -> Result<Self, LoadError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require =
            |name: &str| find(name).ok_or_else(|| LoadError::MissingColumn(name.to_string()));

        Ok(ColumnLayout {
            names,
            id: require(&names.id)?,
            address: require(&names.address)?,
            housing_type: require(&names.housing_type)?,
            area_m2: require(&names.area_m2)?,
            deposit: require(&names.deposit)?,
            deposit_per_m2: find(&names.deposit_per_m2),
            commute: require(&names.commute_minutes)?,
            applicants: require(&names.applicants)?,
            latitude: require(&names.latitude)?,
            longitude: require(&names.longitude)?,
            nearest_station: find(&names.nearest_station),
            station_distance: find(&names.station_distance),
            image: find(&names.image),
        })
    }

    fn parse_row(
        &self,
        record: &StringRecord,
        row: usize,
        report: &mut LoadReport,
    ) -> Result<Listing, LoadError> {
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        let optional = |idx: Option<usize>| idx.map(cell).filter(|s| !s.is_empty());

        let id = parse_number::<u64>(cell(self.id), row, &self.names.id)?;
        let area_m2 = parse_number::<f64>(cell(self.area_m2), row, &self.names.area_m2)?;
        if area_m2 <= 0.0 || !area_m2.is_finite() {
            return Err(invalid(row, &self.names.area_m2, cell(self.area_m2)));
        }
        let deposit = parse_finite(cell(self.deposit), row, &self.names.deposit)?;

        let derived = deposit / area_m2;
        let deposit_per_m2 = match optional(self.deposit_per_m2) {
            None => derived,
            Some(raw) => {
                let stored = parse_number::<f64>(raw, row, &self.names.deposit_per_m2)?;
                let tolerance =
                    (derived.abs() * DEPOSIT_PER_M2_REL_TOLERANCE).max(DEPOSIT_PER_M2_ABS_TOLERANCE);
                if !stored.is_finite() || (stored - derived).abs() > tolerance {
                    log::warn!(
                        "Listing {id}: stored deposit/m² {stored} disagrees with {derived:.1}, using derived value"
                    );
                    report.repaired_deposit_per_m2 += 1;
                    derived
                } else {
                    stored
                }
            }
        };

        let commute = match optional(Some(self.commute)) {
            None => {
                report.unknown_commute += 1;
                CommuteTime::Unknown
            }
            Some(raw) => {
                CommuteTime::Known(parse_finite(raw, row, &self.names.commute_minutes)?)
            }
        };

        let coords = match (optional(Some(self.latitude)), optional(Some(self.longitude))) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(
                parse_number::<f64>(lat, row, &self.names.latitude)?,
                parse_number::<f64>(lon, row, &self.names.longitude)?,
            )),
            _ => None,
        }
        // `nan` / `inf` parse as f64 but cannot be placed on the map.
        .filter(|p| p.lat.is_finite() && p.lon.is_finite());
        if coords.is_none() {
            report.without_coords += 1;
        }

        let station_distance_m = optional(self.station_distance)
            .map(|raw| parse_finite(raw, row, &self.names.station_distance))
            .transpose()?;

        Ok(Listing {
            id: ListingId(id),
            address: cell(self.address).to_string(),
            coords,
            housing_type: cell(self.housing_type).to_string(),
            area_m2,
            deposit,
            deposit_per_m2,
            nearest_station: optional(self.nearest_station).map(str::to_string),
            station_distance_m,
            commute,
            applicants: parse_count(cell(self.applicants), row, &self.names.applicants)?,
            image: optional(self.image).map(PathBuf::from),
        })
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, row: usize, column: &str) -> Result<T, LoadError> {
    raw.parse::<T>().map_err(|_| invalid(row, column, raw))
}

/// Like `parse_number`, but `NaN` and infinities are invalid values.
fn parse_finite(raw: &str, row: usize, column: &str) -> Result<f64, LoadError> {
    let value = parse_number::<f64>(raw, row, column)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(row, column, raw))
    }
}

/// Applicant counts are sometimes exported as floats (`12.0`).
fn parse_count(raw: &str, row: usize, column: &str) -> Result<u32, LoadError> {
    if let Ok(n) = raw.parse::<u32>() {
        return Ok(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => Err(invalid(row, column, raw)),
    }
}

fn invalid(row: usize, column: &str, value: &str) -> LoadError {
    LoadError::InvalidValue {
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}
