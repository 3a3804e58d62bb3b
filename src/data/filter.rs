use super::model::{Listing, ListingTable};

// ---------------------------------------------------------------------------
// Filter predicate: budget and commute thresholds
// ---------------------------------------------------------------------------

/// Both thresholds are inclusive and applied conjunctively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterCriteria {
    /// 만원
    pub max_deposit: f64,
    pub max_commute_minutes: f64,
}

impl FilterCriteria {
    pub fn new(max_deposit: f64, max_commute_minutes: f64) -> Self {
        Self {
            max_deposit,
            max_commute_minutes,
        }
    }

    /// An unknown commute never satisfies the commute threshold.
    pub fn matches(&self, listing: &Listing) -> bool {
        listing.deposit <= self.max_deposit
            && listing
                .commute
                .minutes()
                .is_some_and(|m| m <= self.max_commute_minutes)
    }
}

/// Indices into `table.listings` of rows passing `criteria`, in table order.
pub fn filtered_indices(table: &ListingTable, criteria: &FilterCriteria) -> Vec<usize> {
    table
        .listings
        .iter()
        .enumerate()
        .filter(|(_, listing)| criteria.matches(listing))
        .map(|(i, _)| i)
        .collect()
}

/// Outcome of a filter pass. `NoMatches` is informational, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Matches(usize),
    NoMatches,
}

impl FilterOutcome {
    pub fn of(visible: &[usize]) -> Self {
        if visible.is_empty() {
            FilterOutcome::NoMatches
        } else {
            FilterOutcome::Matches(visible.len())
        }
    }
}
