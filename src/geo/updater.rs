use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{GeoError, GeoService};
use crate::config::KakaoConfig;
use crate::data::model::{CommuteTime, CommuteUpdate, GeoPoint, ListingId, ListingTable};

type RouteKey = ((u64, u64), (u64, u64));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &KakaoConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_delay: Duration::from_millis(cfg.retry_base_delay_ms),
        }
    }

    /// Run `call`, retrying transient failures with exponential backoff.
    fn run<T>(&self, mut call: impl FnMut() -> Result<T, GeoError>) -> Result<T, GeoError> {
        let mut attempt = 0;
        loop {
            match call() {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
                    log::debug!("Transient error ({e}), retrying in {delay:?}");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CommuteUpdater
// ---------------------------------------------------------------------------

/// Recomputes the commute column against an office address.
///
/// Geocode and route results are memoized for the life of the updater;
/// failures are not cached.
pub struct CommuteUpdater {
    service: Box<dyn GeoService>,
    retry: RetryPolicy,
    max_concurrency: usize,
    geocoded: Mutex<HashMap<String, GeoPoint>>,
    routes: Mutex<HashMap<RouteKey, f64>>,
}

impl CommuteUpdater {
    pub fn new(service: Box<dyn GeoService>, retry: RetryPolicy, max_concurrency: usize) -> Self {
        Self {
            service,
            retry,
            max_concurrency: max_concurrency.max(1),
            geocoded: Mutex::new(HashMap::new()),
            routes: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the office address. An error leaves nothing to apply.
    pub fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeoError::UnresolvableAddress(String::new()));
        }
        if let Some(point) = lock(&self.geocoded).get(address) {
            return Ok(*point);
        }
        let point = self.retry.run(|| self.service.geocode(address))?;
        lock(&self.geocoded).insert(address.to_string(), point);
        Ok(point)
    }

    fn commute(&self, office: GeoPoint, destination: GeoPoint) -> Result<CommuteTime, GeoError> {
        let key = (office.key(), destination.key());
        if let Some(seconds) = lock(&self.routes).get(&key) {
            return Ok(CommuteTime::from_seconds(*seconds));
        }
        let seconds = self
            .retry
            .run(|| self.service.route_seconds(office, destination))?;
        lock(&self.routes).insert(key, seconds);
        Ok(CommuteTime::from_seconds(seconds))
    }

    /// Geocode `address`, then route to every listing with bounded concurrency.
    ///
    /// `progress(done, total)` is called from worker threads after each listing.
    /// A geocode failure is returned as-is; per-listing failures become
    /// [`CommuteTime::Unknown`] and are counted in the result.
    pub fn update(
        &self,
        address: &str,
        table: &ListingTable,
        progress: impl Fn(usize, usize) + Sync,
    ) -> Result<CommuteUpdate, GeoError> {
        let office = self.geocode(address)?;
        log::info!(
            "Office '{}' resolved to ({:.6}, {:.6})",
            address.trim(),
            office.lat,
            office.lon
        );

        let jobs: Vec<(ListingId, Option<GeoPoint>)> =
            table.listings.iter().map(|l| (l.id, l.coords)).collect();
        let total = jobs.len();
        let next = AtomicUsize::new(0);
        let done = AtomicUsize::new(0);
        let results = Mutex::new(BTreeMap::new());

        let workers = self.max_concurrency.min(total);
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(&(id, coords)) = jobs.get(i) else {
                        break;
                    };
                    let commute = match coords {
                        None => CommuteTime::Unknown,
                        Some(destination) => {
                            self.commute(office, destination).unwrap_or_else(|e| {
                                log::warn!("Listing {id}: commute lookup failed: {e}");
                                CommuteTime::Unknown
                            })
                        }
                    };
                    lock(&results).insert(id, commute);
                    progress(done.fetch_add(1, Ordering::Relaxed) + 1, total);
                });
            }
        });

        let commutes = results.into_inner().unwrap_or_else(|p| p.into_inner());
        let failed = commutes
            .values()
            .filter(|c| matches!(c, CommuteTime::Unknown))
            .count();
        let update = CommuteUpdate {
            office,
            commutes,
            failed,
            total,
        };
        log::info!("{}", update.summary());
        Ok(update)
    }
}

/// A poisoned cache is still a valid cache.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::listing;
    use std::sync::Arc;

    /// Resolves one address; routes fail for listings east of `fail_east_of`.
    struct FakeGeo {
        office: GeoPoint,
        fail_east_of: f64,
        transient_failures: AtomicUsize,
        geocode_calls: Arc<AtomicUsize>,
        route_calls: Arc<AtomicUsize>,
    }

    impl FakeGeo {
        fn new(fail_east_of: f64) -> Self {
            Self {
                office: GeoPoint::new(37.5665, 126.978),
                fail_east_of,
                transient_failures: AtomicUsize::new(0),
                geocode_calls: Arc::new(AtomicUsize::new(0)),
                route_calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl GeoService for FakeGeo {
        fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError> {
            self.geocode_calls.fetch_add(1, Ordering::SeqCst);
            if address == "서울시청" {
                Ok(self.office)
            } else {
                Err(GeoError::UnresolvableAddress(address.into()))
            }
        }

        fn route_seconds(&self, _origin: GeoPoint, dest: GeoPoint) -> Result<f64, GeoError> {
            self.route_calls.fetch_add(1, Ordering::SeqCst);
            if self
                .transient_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(GeoError::Timeout);
            }
            if dest.lon > self.fail_east_of {
                Err(GeoError::NoRoute("unreachable".into()))
            } else {
                // 10 minutes per 0.01° east of 127°E
                Ok(((dest.lon - 127.0) * 100.0).round() * 600.0)
            }
        }
    }

    fn no_wait() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::ZERO,
        }
    }

    fn table() -> ListingTable {
        // listing(i) sits at lon 127.0 + i * 0.01
        ListingTable::from_listings(vec![
            listing(1, 1.0, Some(5.0)),
            listing(2, 1.0, Some(5.0)),
            listing(3, 1.0, Some(5.0)),
        ])
    }

    #[test]
    fn unresolvable_address_leaves_table_untouched() {
        let updater = CommuteUpdater::new(Box::new(FakeGeo::new(f64::MAX)), no_wait(), 2);
        let mut table = table();
        let before = table.clone();

        let result = updater.update("어딘가", &table, |_, _| {});
        assert_eq!(result, Err(GeoError::UnresolvableAddress("어딘가".into())));
        if let Ok(update) = result {
            table.apply_commute_update(&update);
        }
        assert_eq!(table.listings, before.listings);
        assert!(updater.update("   ", &table, |_, _| {}).is_err());
    }

    #[test]
    fn partial_failures_are_marked_unknown() {
        let updater = CommuteUpdater::new(Box::new(FakeGeo::new(127.025)), no_wait(), 2);
        let mut table = table();
        table.listings[1].coords = None;

        let update = updater.update("서울시청", &table, |_, _| {}).unwrap();
        assert_eq!(update.total, 3);
        assert_eq!(update.failed, 2);
        assert_eq!(update.commutes[&ListingId(1)], CommuteTime::Known(10.0));
        assert_eq!(update.commutes[&ListingId(2)], CommuteTime::Unknown);
        assert_eq!(update.commutes[&ListingId(3)], CommuteTime::Unknown);

        table.apply_commute_update(&update);
        assert_eq!(table.listings[0].commute, CommuteTime::Known(10.0));
        assert_eq!(table.listings[2].commute, CommuteTime::Unknown);
        assert_eq!(update.summary(), "2 of 3 listings could not be updated");
    }

    #[test]
    fn progress_reaches_total() {
        let updater = CommuteUpdater::new(Box::new(FakeGeo::new(f64::MAX)), no_wait(), 3);
        let seen = AtomicUsize::new(0);
        updater
            .update("서울시청", &table(), |done, total| {
                assert_eq!(total, 3);
                seen.fetch_max(done, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn repeated_update_is_memoized() {
        let fake = FakeGeo::new(f64::MAX);
        let geocodes = fake.geocode_calls.clone();
        let routes = fake.route_calls.clone();
        let updater = CommuteUpdater::new(Box::new(fake), no_wait(), 2);

        let first = updater.update("서울시청", &table(), |_, _| {}).unwrap();
        let second = updater.update(" 서울시청 ", &table(), |_, _| {}).unwrap();
        assert_eq!(first, second);
        assert_eq!(geocodes.load(Ordering::SeqCst), 1);
        assert_eq!(routes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn transient_errors_are_retried() {
        let fake = FakeGeo::new(f64::MAX);
        fake.transient_failures.store(2, Ordering::SeqCst);
        let updater = CommuteUpdater::new(Box::new(fake), no_wait(), 1);
        let update = updater.update("서울시청", &table(), |_, _| {}).unwrap();
        assert_eq!(update.failed, 0);
    }

    #[test]
    fn exhausted_retries_mark_unknown() {
        let fake = FakeGeo::new(f64::MAX);
        fake.transient_failures.store(3, Ordering::SeqCst);
        let updater = CommuteUpdater::new(Box::new(fake), no_wait(), 1);
        let update = updater.update("서울시청", &table(), |_, _| {}).unwrap();
        // First listing burns all three attempts, the rest succeed.
        assert_eq!(update.failed, 1);
        assert_eq!(update.commutes[&ListingId(1)], CommuteTime::Unknown);
    }
}
