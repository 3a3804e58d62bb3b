use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;

use crate::color::{ColorColumn, ColorScale};
use crate::config::AppConfig;
use crate::data::filter::{filtered_indices, FilterCriteria, FilterOutcome};
use crate::data::loader::load_listings;
use crate::data::model::{CommuteUpdate, ListingTable};
use crate::geo::{CommuteUpdater, GeoError, KakaoClient, RetryPolicy};
use crate::render::{build_markers, MapMarker, MapStyle, RenderedMap};
use crate::selection::Selection;

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Background commute update
// ---------------------------------------------------------------------------

pub enum GeoMessage {
    Progress { done: usize, total: usize },
    Finished(Result<CommuteUpdate, GeoError>),
}

pub struct GeoJob {
    pub address: String,
    pub done: usize,
    pub total: usize,
    /// Table generation the job was started against.
    generation: u64,
    receiver: Receiver<GeoMessage>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Everything one dashboard session owns, independent of rendering.
pub struct AppState {
    pub config: AppConfig,

    /// Loaded listings (None until a file loads successfully).
    pub table: Option<ListingTable>,
    /// Path of the current (or last attempted) listing file.
    pub data_path: PathBuf,
    /// Bumped on every successful load; stale geo jobs are discarded.
    generation: u64,

    pub criteria: FilterCriteria,
    pub color_column: ColorColumn,
    pub map_style: MapStyle,

    /// Indices into `table.listings` passing the current filter (cached).
    pub visible: Vec<usize>,
    pub color_scale: ColorScale,
    pub rendered: RenderedMap,
    pub selection: Selection,

    pub office_address: String,
    pub geo_job: Option<GeoJob>,
    updater: Option<Arc<CommuteUpdater>>,

    pub status: Option<Status>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let updater = match KakaoClient::new(&config.kakao) {
            Ok(client) => Some(Arc::new(CommuteUpdater::new(
                Box::new(client),
                RetryPolicy::from_config(&config.kakao),
                config.kakao.max_concurrency,
            ))),
            Err(e) => {
                log::error!("Failed to create Kakao client: {e}");
                None
            }
        };
        Self::with_updater(config, updater)
    }

    pub fn with_updater(config: AppConfig, updater: Option<Arc<CommuteUpdater>>) -> Self {
        let defaults = config.filters.clone();
        Self {
            data_path: config.data.csv_path.clone(),
            config,
            table: None,
            generation: 0,
            criteria: FilterCriteria::new(defaults.max_deposit, defaults.max_commute_minutes),
            color_column: defaults.color_column,
            map_style: defaults.map_style,
            visible: Vec::new(),
            color_scale: ColorScale::for_rows(defaults.color_column, std::iter::empty()),
            rendered: RenderedMap::default(),
            selection: Selection::Idle,
            office_address: String::new(),
            geo_job: None,
            updater,
            status: None,
        }
    }

    // ---- Loading ----

    /// Load a listing file. On failure the previous table is dropped so
    /// nothing stale is rendered.
    pub fn load(&mut self, path: &Path) {
        self.data_path = path.to_path_buf();
        match load_listings(path, &self.config.data.columns) {
            Ok((table, report)) => {
                log::info!(
                    "Loaded {} listings from {} ({} without coordinates, {} deposit/m² repaired, {} unknown commute)",
                    table.len(),
                    path.display(),
                    report.without_coords,
                    report.repaired_deposit_per_m2,
                    report.unknown_commute
                );
                self.set_table(table);
                if report.repaired_deposit_per_m2 > 0 {
                    self.status = Some(Status::new(
                        StatusKind::Warning,
                        format!(
                            "{}개 건물의 m2당 보증금이 맞지 않아 다시 계산했습니다",
                            report.repaired_deposit_per_m2
                        ),
                    ));
                }
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.table = None;
                self.geo_job = None;
                self.visible.clear();
                self.rebuild_view();
                self.status = Some(Status::new(
                    StatusKind::Error,
                    format!("데이터를 불러올 수 없습니다: {e}"),
                ));
            }
        }
    }

    pub fn set_table(&mut self, table: ListingTable) {
        self.table = Some(table);
        self.generation += 1;
        self.geo_job = None;
        self.selection = Selection::Idle;
        self.status = None;
        self.refilter();
    }

    // ---- Pipeline ----

    /// Recompute visible rows, colour scale and markers from scratch.
    pub fn refilter(&mut self) {
        self.visible = match &self.table {
            Some(table) => filtered_indices(table, &self.criteria),
            None => Vec::new(),
        };
        log::debug!(
            "Filter deposit ≤ {} / commute ≤ {}: {} visible",
            self.criteria.max_deposit,
            self.criteria.max_commute_minutes,
            self.visible.len()
        );
        self.rebuild_view();
    }

    fn rebuild_view(&mut self) {
        let Some(table) = &self.table else {
            self.color_scale = ColorScale::for_rows(self.color_column, std::iter::empty());
            self.rendered = RenderedMap::default();
            return;
        };
        self.color_scale = ColorScale::for_rows(
            self.color_column,
            self.visible.iter().map(|&i| &table.listings[i]),
        );
        self.rendered = build_markers(
            table,
            &self.visible,
            &self.color_scale,
            &self.config.data.images_dir,
        );
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        if criteria != self.criteria {
            self.criteria = criteria;
            self.refilter();
        }
    }

    pub fn set_color_column(&mut self, column: ColorColumn) {
        if column != self.color_column {
            self.color_column = column;
            self.rebuild_view();
        }
    }

    pub fn filter_outcome(&self) -> FilterOutcome {
        FilterOutcome::of(&self.visible)
    }

    // ---- Selection ----

    pub fn click_marker(&mut self, index: usize) {
        self.selection.click(index, &self.rendered.markers);
    }

    pub fn selected_marker(&self) -> Option<&MapMarker> {
        self.selection.resolve(&self.rendered)
    }

    // ---- Commute update ----

    pub fn geo_available(&self) -> bool {
        self.updater.is_some()
    }

    /// Start recomputing commute times in the background.
    ///
    /// `repaint` is called whenever a message is queued for the UI.
    pub fn start_geo_update(&mut self, repaint: impl Fn() + Send + Sync + 'static) {
        if self.geo_job.is_some() {
            return;
        }
        let (Some(table), Some(updater)) = (&self.table, &self.updater) else {
            return;
        };
        let address = self.office_address.trim().to_string();
        if address.is_empty() {
            self.status = Some(Status::new(StatusKind::Warning, "회사 주소를 입력해주세요."));
            return;
        }

        let (tx, rx) = mpsc::channel();
        let table = table.clone();
        let updater = Arc::clone(updater);
        let job_address = address.clone();
        std::thread::spawn(move || {
            let progress_tx = tx.clone();
            let result = updater.update(&job_address, &table, |done, total| {
                let _ = progress_tx.send(GeoMessage::Progress { done, total });
                repaint();
            });
            let _ = tx.send(GeoMessage::Finished(result));
            repaint();
        });

        log::info!("Started commute update for '{address}'");
        self.geo_job = Some(GeoJob {
            address,
            done: 0,
            total: self.table.as_ref().map_or(0, ListingTable::len),
            generation: self.generation,
            receiver: rx,
        });
    }

    /// Drain messages from the running job; applies the result when done.
    pub fn poll_geo_update(&mut self) {
        let Some(job) = &mut self.geo_job else {
            return;
        };
        let finished = loop {
            match job.receiver.try_recv() {
                Ok(GeoMessage::Progress { done, total }) => {
                    job.done = done;
                    job.total = total;
                }
                Ok(GeoMessage::Finished(result)) => break Some((job.generation, result)),
                Err(TryRecvError::Empty) => break None,
                Err(TryRecvError::Disconnected) => {
                    break Some((
                        job.generation,
                        Err(GeoError::Network("commute worker exited".into())),
                    ))
                }
            }
        };

        if let Some((generation, result)) = finished {
            self.geo_job = None;
            self.finish_geo_update(generation, result);
        }
    }

    fn finish_geo_update(&mut self, generation: u64, result: Result<CommuteUpdate, GeoError>) {
        if generation != self.generation {
            log::info!("Discarding commute update for a previously loaded dataset");
            return;
        }
        match result {
            Ok(update) => {
                log::info!(
                    "Applying commute times from office at ({:.5}, {:.5})",
                    update.office.lat,
                    update.office.lon
                );
                if let Some(table) = &mut self.table {
                    table.apply_commute_update(&update);
                }
                let status = if update.failed == 0 {
                    Status::new(
                        StatusKind::Info,
                        format!("{}개 건물의 통근시간을 갱신했습니다", update.total),
                    )
                } else {
                    Status::new(
                        StatusKind::Warning,
                        format!(
                            "{}개 중 {}개 건물의 통근시간을 갱신하지 못했습니다",
                            update.total, update.failed
                        ),
                    )
                };
                self.status = Some(status);
                self.refilter();
            }
            Err(e) => {
                log::error!("Commute update failed: {e}");
                self.status = Some(Status::new(StatusKind::Error, geo_failure_message(&e)));
            }
        }
    }
}

/// Status-line text for a commute update that produced nothing to apply.
fn geo_failure_message(error: &GeoError) -> String {
    match error {
        GeoError::UnresolvableAddress(address) => {
            format!("주소를 찾을 수 없습니다: {address}")
        }
        GeoError::MissingApiKey => {
            "카카오 API 키가 설정되지 않았습니다 (JEONSE_KAKAO__API_KEY).".to_string()
        }
        GeoError::Status(401 | 403) => "카카오 API 인증에 실패했습니다. API 키를 확인해주세요.".to_string(),
        GeoError::Timeout | GeoError::Network(_) => {
            format!("카카오 API에 연결할 수 없습니다: {error}")
        }
        GeoError::Status(_) | GeoError::Decode(_) | GeoError::NoRoute(_) => {
            format!("통근시간을 계산할 수 없습니다: {error}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::listing;
    use crate::data::model::{CommuteTime, GeoPoint, ListingId};
    use crate::geo::GeoService;
    use std::io::Write;
    use std::time::{Duration, Instant};

    struct FixedGeo;

    impl GeoService for FixedGeo {
        fn geocode(&self, address: &str) -> Result<GeoPoint, GeoError> {
            match address {
                "판교역" => Ok(GeoPoint::new(37.3948, 127.1112)),
                other => Err(GeoError::UnresolvableAddress(other.into())),
            }
        }

        fn route_seconds(&self, _: GeoPoint, dest: GeoPoint) -> Result<f64, GeoError> {
            if dest.lat > 37.525 {
                Err(GeoError::Timeout)
            } else {
                Ok(1200.0)
            }
        }
    }

    fn state_with_fake() -> AppState {
        let updater = CommuteUpdater::new(
            Box::new(FixedGeo),
            RetryPolicy {
                max_retries: 0,
                base_delay: Duration::ZERO,
            },
            2,
        );
        let mut state = AppState::with_updater(AppConfig::default(), Some(Arc::new(updater)));
        state.criteria = FilterCriteria::new(25000.0, 90.0);
        state.set_table(ListingTable::from_listings(vec![
            listing(1, 10000.0, Some(30.0)),
            listing(2, 20000.0, Some(60.0)),
            listing(3, 40000.0, Some(120.0)),
        ]));
        state
    }

    fn wait_for_job(state: &mut AppState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while state.geo_job.is_some() && Instant::now() < deadline {
            state.poll_geo_update();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(state.geo_job.is_none(), "geo job did not finish");
    }

    #[test]
    fn load_failure_halts_rendering() {
        let mut state = state_with_fake();
        state.load(Path::new("/definitely/not/here.csv"));
        assert!(state.table.is_none());
        assert!(state.rendered.markers.is_empty());
        assert_eq!(state.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
    }

    #[test]
    fn load_from_disk_renders_filtered_view() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "번호,주소,주택유형,m2,deposit,deposit_m2,expected_time,신청자수,x,y\n\
             2,b,t,20,20000,1000,60,5,37.52,127.02\n\
             1,a,t,20,10000,500,30,3,37.51,127.01\n\
             3,c,t,20,40000,2000,120,9,37.53,127.03"
        )
        .unwrap();
        let mut state = AppState::with_updater(AppConfig::default(), None);
        state.criteria = FilterCriteria::new(25000.0, 90.0);
        state.load(file.path());
        let ids: Vec<ListingId> = state.rendered.markers.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![ListingId(1), ListingId(2)]);
        assert_eq!(state.filter_outcome(), FilterOutcome::Matches(2));
        assert!(state.status.is_none());
    }

    #[test]
    fn empty_filter_is_not_an_error() {
        let mut state = state_with_fake();
        state.set_criteria(FilterCriteria::new(1.0, 1.0));
        assert_eq!(state.filter_outcome(), FilterOutcome::NoMatches);
        assert!(state.table.is_some());
        assert!(state.status.is_none());
    }

    #[test]
    fn selection_cleared_when_row_filtered_out() {
        let mut state = state_with_fake();
        state.click_marker(1);
        assert_eq!(state.selected_marker().map(|m| m.id), Some(ListingId(2)));
        state.set_criteria(FilterCriteria::new(15000.0, 90.0));
        assert!(state.selected_marker().is_none());
        state.click_marker(7);
        assert_eq!(state.selection, Selection::Idle);
    }

    #[test]
    fn color_column_change_rebuilds_markers() {
        let mut state = state_with_fake();
        let before: Vec<_> = state.rendered.markers.iter().map(|m| m.fill).collect();
        state.set_color_column(ColorColumn::CommuteTime);
        assert_eq!(state.color_scale.column, ColorColumn::CommuteTime);
        assert_eq!(state.color_scale.bounds(), Some((30.0, 60.0)));
        assert_eq!(state.rendered.markers.len(), before.len());
    }

    #[test]
    fn unresolvable_office_keeps_commute_times() {
        let mut state = state_with_fake();
        state.office_address = "어딘가".into();
        state.start_geo_update(|| {});
        wait_for_job(&mut state);
        let table = state.table.as_ref().unwrap();
        assert_eq!(table.listings[0].commute, CommuteTime::Known(30.0));
        assert_eq!(state.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
    }

    #[test]
    fn office_update_replaces_commute_column() {
        let mut state = state_with_fake();
        state.office_address = " 판교역 ".into();
        state.start_geo_update(|| {});
        wait_for_job(&mut state);

        let table = state.table.as_ref().unwrap();
        // listing(1) sits at 37.51, listing(2) at 37.52, listing(3) at 37.53
        assert_eq!(table.listings[0].commute, CommuteTime::Known(20.0));
        assert_eq!(table.listings[1].commute, CommuteTime::Known(20.0));
        assert_eq!(table.listings[2].commute, CommuteTime::Unknown);
        let status = state.status.as_ref().unwrap();
        assert_eq!(status.kind, StatusKind::Warning);
        assert_eq!(status.message, "3개 중 1개 건물의 통근시간을 갱신하지 못했습니다");
        // Refiltered against the new column.
        assert_eq!(state.visible, vec![0, 1]);
    }

    #[test]
    fn failure_message_depends_on_error_kind() {
        assert_eq!(
            geo_failure_message(&GeoError::UnresolvableAddress("어딘가".into())),
            "주소를 찾을 수 없습니다: 어딘가"
        );
        let missing_key = geo_failure_message(&GeoError::MissingApiKey);
        assert!(missing_key.contains("API 키"));
        assert!(!missing_key.contains("주소를 찾을 수 없습니다"));
        assert!(geo_failure_message(&GeoError::Status(401)).contains("인증"));
        assert!(geo_failure_message(&GeoError::Timeout).contains("연결할 수 없습니다"));
    }

    #[test]
    fn missing_api_key_is_not_reported_as_bad_address() {
        let mut config = AppConfig::default();
        config.kakao.api_key = None;
        let mut state = AppState::new(config);
        state.set_table(ListingTable::from_listings(vec![listing(1, 1.0, Some(1.0))]));
        state.office_address = "판교역".into();
        state.start_geo_update(|| {});
        wait_for_job(&mut state);
        let status = state.status.as_ref().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert!(status.message.contains("API 키"), "{}", status.message);
    }

    #[test]
    fn blank_address_is_rejected_without_a_job() {
        let mut state = state_with_fake();
        state.office_address = "   ".into();
        state.start_geo_update(|| {});
        assert!(state.geo_job.is_none());
        assert_eq!(state.status.as_ref().map(|s| s.kind), Some(StatusKind::Warning));
    }

    #[test]
    fn reload_discards_running_job_result() {
        let mut state = state_with_fake();
        let update = CommuteUpdate {
            office: GeoPoint::new(0.0, 0.0),
            commutes: Default::default(),
            failed: 3,
            total: 3,
        };
        let stale_generation = state.generation;
        state.set_table(ListingTable::from_listings(vec![listing(9, 1.0, Some(1.0))]));
        state.finish_geo_update(stale_generation, Ok(update));
        assert_eq!(
            state.table.as_ref().unwrap().listings[0].commute,
            CommuteTime::Known(1.0)
        );
    }
}
