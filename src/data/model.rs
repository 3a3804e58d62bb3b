use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// ListingId – stable join key between a rendered marker and its record
// ---------------------------------------------------------------------------

/// Listing number (`번호` in the source data). Unique within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListingId(pub u64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// GeoPoint
// ---------------------------------------------------------------------------

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Bit-exact key, used to memoize route lookups.
    pub fn key(&self) -> (u64, u64) {
        (self.lat.to_bits(), self.lon.to_bits())
    }
}

// ---------------------------------------------------------------------------
// CommuteTime
// ---------------------------------------------------------------------------

/// Expected commute from the office to a listing.
///
/// `Unknown` means the routing request failed (or the cell was empty); it is
/// never silently replaced by a stale value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CommuteTime {
    Known(f64),
    #[default]
    Unknown,
}

impl CommuteTime {
    pub fn minutes(&self) -> Option<f64> {
        match self {
            CommuteTime::Known(m) => Some(*m),
            CommuteTime::Unknown => None,
        }
    }

    pub fn from_seconds(seconds: f64) -> Self {
        CommuteTime::Known(seconds / 60.0)
    }
}

impl fmt::Display for CommuteTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommuteTime::Known(m) => write!(f, "{m:.1}분"),
            CommuteTime::Unknown => write!(f, "알 수 없음"),
        }
    }
}

// ---------------------------------------------------------------------------
// Listing – one row of the source table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    pub address: String,
    /// `None` when the source row has no coordinates; such rows are never rendered.
    pub coords: Option<GeoPoint>,
    pub housing_type: String,
    pub area_m2: f64,
    /// Deposit in 만원.
    pub deposit: f64,
    /// Deposit per m², validated against `deposit / area_m2` at load time.
    pub deposit_per_m2: f64,
    pub nearest_station: Option<String>,
    pub station_distance_m: Option<f64>,
    pub commute: CommuteTime,
    pub applicants: u32,
    pub image: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// ListingTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// All listings of a session, sorted ascending by id.
#[derive(Debug, Clone, Default)]
pub struct ListingTable {
    pub listings: Vec<Listing>,
}

impl ListingTable {
    /// Sorts by id. Uniqueness is checked by the loader.
    pub fn from_listings(mut listings: Vec<Listing>) -> Self {
        listings.sort_by_key(|l| l.id);
        ListingTable { listings }
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Replace the whole commute column. Ids missing from `update` become `Unknown`.
    pub fn apply_commute_update(&mut self, update: &CommuteUpdate) {
        for listing in &mut self.listings {
            listing.commute = update
                .commutes
                .get(&listing.id)
                .copied()
                .unwrap_or(CommuteTime::Unknown);
        }
    }
}

// ---------------------------------------------------------------------------
// CommuteUpdate – result of a geo-update batch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CommuteUpdate {
    pub office: GeoPoint,
    pub commutes: BTreeMap<ListingId, CommuteTime>,
    /// Listings that ended up `Unknown`.
    pub failed: usize,
    pub total: usize,
}

impl CommuteUpdate {
    pub fn summary(&self) -> String {
        if self.failed == 0 {
            format!("Updated commute times for all {} listings", self.total)
        } else {
            format!(
                "{} of {} listings could not be updated",
                self.failed, self.total
            )
        }
    }
}
