/// Data layer: listing types, loading, and filtering.
///
/// Architecture:
/// ```text
///   final.csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + validate rows → ListingTable (sorted by id)
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ ListingTable  │  Vec<Listing>, commute column replaceable
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  deposit ≤ max AND commute ≤ max → visible indices
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
