//! Office-address geocoding and commute-time recomputation.

pub mod error;
pub mod kakao;
pub mod updater;

pub use error::GeoError;
pub use kakao::KakaoClient;
pub use updater::{CommuteUpdater, RetryPolicy};

use crate::data::model::GeoPoint;

/// External geocoding + routing provider.
pub trait GeoService: Send + Sync {
    /// First candidate for a free-text address.
    fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError>;

    /// Fastest-by-time driving duration in seconds.
    fn route_seconds(&self, origin: GeoPoint, destination: GeoPoint) -> Result<f64, GeoError>;
}
