//! Selection state and the fetch-or-cache cycle.
//!
//! [`Dashboard`] owns the selected location and publishes a
//! [`DashboardState`] through a `tokio::sync::watch` channel. Every selection
//! change bumps an epoch; a load only commits if the epoch it started under is
//! still current, so a slow answer for a previous selection can never replace
//! the data of the current one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    Config,
    cache::{CachedReadings, ExpiringCache, FRESHNESS_WINDOW, FileStore},
    clock::{Clock, SystemClock},
    fetcher::{AirQualityFetcher, fetcher_from_config},
    model::{AirQualityRecord, RawCityReading},
    normalize::normalize,
    registry::{Location, LocationRegistry},
    theme::{Theme, theme_for},
};

/// Interval between background loads.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    /// The source answered but has no valid reading for the selection.
    NoData,
    Failed,
}

/// How the last load for the current selection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ready,
    NoData,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Cache,
    Network,
}

/// Snapshot published to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardState {
    pub selected: Location,
    pub data: Option<AirQualityRecord>,
    pub theme: Option<Theme>,
    pub loading: bool,
    pub error: Option<String>,
    /// `None` until a load for the current selection has settled.
    pub outcome: Option<Outcome>,
    pub source: Option<DataSource>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    epoch: u64,
    #[serde(skip)]
    pending: u32,
}

impl DashboardState {
    fn new(selected: Location) -> Self {
        Self {
            selected,
            data: None,
            theme: None,
            loading: false,
            error: None,
            outcome: None,
            source: None,
            updated_at: None,
            epoch: 0,
            pending: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.loading {
            return Phase::Loading;
        }
        match self.outcome {
            None => Phase::Idle,
            Some(Outcome::Ready) => Phase::Ready,
            Some(Outcome::NoData) => Phase::NoData,
            Some(Outcome::Failed) => Phase::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CachePolicy {
    /// Serve a fresh cache entry without touching the network.
    PreferFresh,
    /// Always hit the network.
    Bypass,
}

enum Settled {
    Loaded {
        record: Option<AirQualityRecord>,
        source: DataSource,
        at: DateTime<Utc>,
    },
    Failed(String),
}

#[derive(Debug)]
struct Shared {
    registry: LocationRegistry,
    initial: Location,
    fetcher: Arc<dyn AirQualityFetcher>,
    cache: ExpiringCache,
    clock: Arc<dyn Clock>,
    freshness: Duration,
    state: watch::Sender<DashboardState>,
}

/// The stateful coordinator consumers talk to.
///
/// All operations settle into state; none of them return errors. Dropping the
/// dashboard stops the background refresh task.
#[derive(Debug)]
pub struct Dashboard {
    shared: Arc<Shared>,
    auto_refresh: Option<JoinHandle<()>>,
}

/// Configures a [`Dashboard`] before it starts sharing state.
#[derive(Debug)]
pub struct DashboardBuilder {
    registry: LocationRegistry,
    fetcher: Arc<dyn AirQualityFetcher>,
    cache: ExpiringCache,
    clock: Arc<dyn Clock>,
    freshness: Duration,
    initial: Option<u32>,
}

impl DashboardBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn freshness_window(mut self, window: Duration) -> Self {
        self.freshness = window;
        self
    }

    /// Start on `id` instead of the registry's first location.
    pub fn initial_location(mut self, id: u32) -> Self {
        self.initial = Some(id);
        self
    }

    pub fn build(self) -> anyhow::Result<Dashboard> {
        let initial = match self.initial {
            Some(id) => self.registry.get(id).cloned().ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown location id {id}.\n\
                     Hint: run `respira locations` to list valid ids."
                )
            })?,
            None => self.registry.default_location().clone(),
        };

        Ok(self.finish(initial))
    }

    fn finish(self, initial: Location) -> Dashboard {
        let (state, _) = watch::channel(DashboardState::new(initial.clone()));

        Dashboard {
            shared: Arc::new(Shared {
                registry: self.registry,
                initial,
                fetcher: self.fetcher,
                cache: self.cache,
                clock: self.clock,
                freshness: self.freshness,
                state,
            }),
            auto_refresh: None,
        }
    }
}

impl Dashboard {
    pub fn builder(
        registry: LocationRegistry,
        fetcher: Arc<dyn AirQualityFetcher>,
        cache: ExpiringCache,
    ) -> DashboardBuilder {
        DashboardBuilder {
            registry,
            fetcher,
            cache,
            clock: Arc::new(SystemClock),
            freshness: FRESHNESS_WINDOW,
            initial: None,
        }
    }

    /// Dashboard with the reference freshness window, starting on the first
    /// registry location.
    pub fn new(
        registry: LocationRegistry,
        fetcher: Arc<dyn AirQualityFetcher>,
        cache: ExpiringCache,
    ) -> Self {
        let initial = registry.default_location().clone();
        Self::builder(registry, fetcher, cache).finish(initial)
    }

    /// Build a dashboard from user configuration, caching under the platform
    /// cache directory.
    pub fn from_config(config: &Config, registry: LocationRegistry) -> anyhow::Result<Self> {
        let fetcher: Arc<dyn AirQualityFetcher> = fetcher_from_config(config, &registry)?.into();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = ExpiringCache::new(Arc::new(FileStore::in_cache_dir()?), clock.clone());

        let mut builder = Self::builder(registry, fetcher, cache)
            .clock(clock)
            .freshness_window(config.cache_ttl());

        if let Some(id) = config.default_location {
            builder = builder.initial_location(id);
        }

        builder.build()
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.shared.registry
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.shared.state.subscribe()
    }

    pub fn state(&self) -> DashboardState {
        self.shared.state.borrow().clone()
    }

    pub fn selected(&self) -> Location {
        self.shared.state.borrow().selected.clone()
    }

    /// Select the initial location and load it.
    pub async fn initialize(&self) {
        self.select_location(self.shared.initial.clone()).await;
    }

    /// Switch to `location` and load it, from cache when fresh.
    pub async fn select_location(&self, location: Location) {
        let slot = self.shared.begin_selection(location.clone());
        self.shared.load(slot, &location, CachePolicy::PreferFresh).await;
    }

    /// Reload the current selection from the network, ignoring the cache.
    pub async fn refresh(&self) {
        let (slot, location) = self.shared.begin_reload();
        self.shared.load(slot, &location, CachePolicy::Bypass).await;
    }

    /// Run the fetch-or-cache cycle every `period` until stopped or dropped.
    ///
    /// Must be called from within a tokio runtime. A zero period disables
    /// auto refresh.
    pub fn start_auto_refresh(&mut self, period: Duration) {
        self.stop_auto_refresh();

        if period.is_zero() {
            warn!("auto refresh period is zero; not starting");
            return;
        }

        let shared = Arc::clone(&self.shared);
        info!(period_secs = period.as_secs(), "starting auto refresh");

        self.auto_refresh = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                debug!("auto refresh tick");
                let (slot, location) = shared.begin_reload();
                shared.load(slot, &location, CachePolicy::PreferFresh).await;
            }
        }));
    }

    pub fn stop_auto_refresh(&mut self) {
        if let Some(handle) = self.auto_refresh.take() {
            handle.abort();
            debug!("auto refresh stopped");
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.auto_refresh.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.stop_auto_refresh();
    }
}

/// One outstanding load in an epoch.
///
/// Dropping a slot that never settled gives its `pending` count back, so a
/// cancelled load cannot leave `loading` set.
struct LoadSlot<'a> {
    state: &'a watch::Sender<DashboardState>,
    epoch: u64,
    settled: bool,
}

impl Drop for LoadSlot<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let epoch = self.epoch;
        self.state.send_if_modified(|s| {
            if s.epoch != epoch || s.pending == 0 {
                return false;
            }
            s.pending -= 1;
            s.loading = s.pending > 0;
            debug!(epoch, pending = s.pending, "released slot of a cancelled load");
            true
        });
    }
}

impl Shared {
    fn begin_selection(&self, location: Location) -> LoadSlot<'_> {
        let mut epoch = 0;
        self.state.send_modify(|s| {
            s.epoch += 1;
            s.pending = 1;
            s.loading = true;
            s.outcome = None;
            s.selected = location;
            epoch = s.epoch;
        });
        self.slot(epoch)
    }

    fn begin_reload(&self) -> (LoadSlot<'_>, Location) {
        let mut started = (0, self.initial.clone());
        self.state.send_modify(|s| {
            s.pending += 1;
            s.loading = true;
            started = (s.epoch, s.selected.clone());
        });
        let (epoch, location) = started;
        (self.slot(epoch), location)
    }

    fn slot(&self, epoch: u64) -> LoadSlot<'_> {
        LoadSlot {
            state: &self.state,
            epoch,
            settled: false,
        }
    }

    async fn load(&self, mut slot: LoadSlot<'_>, location: &Location, policy: CachePolicy) {
        if policy == CachePolicy::PreferFresh {
            if let Some(hit) = self.fresh_cache_entry() {
                debug!(location = %location.name, "serving readings from cache");
                let record = normalize(&hit.payload, location);
                self.commit(
                    &mut slot,
                    Settled::Loaded {
                        record,
                        source: DataSource::Cache,
                        at: hit.stored_at,
                    },
                );
                return;
            }
        }

        match self.fetcher.fetch_all().await {
            Ok(readings) => {
                self.store(&readings);
                let record = normalize(&readings, location);
                let at = self.clock.now();
                self.commit(
                    &mut slot,
                    Settled::Loaded {
                        record,
                        source: DataSource::Network,
                        at,
                    },
                );
            }
            Err(e) => {
                warn!(location = %location.name, error = %e, "fetch failed");
                self.commit(&mut slot, Settled::Failed(e.to_string()));
            }
        }
    }

    fn fresh_cache_entry(&self) -> Option<CachedReadings> {
        match self.cache.read() {
            Ok(Some(hit)) if hit.is_fresh(self.freshness) => Some(hit),
            Ok(Some(hit)) => {
                debug!(age_secs = hit.age.as_secs(), "cache entry is stale");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    fn store(&self, readings: &[RawCityReading]) {
        if let Err(e) = self.cache.write(readings) {
            warn!(error = %e, "failed to write cache entry");
        }
    }

    /// Apply a settled load if it still belongs to the current selection.
    fn commit(&self, slot: &mut LoadSlot<'_>, settled: Settled) -> bool {
        slot.settled = true;
        let epoch = slot.epoch;

        self.state.send_if_modified(|s| {
            if s.epoch != epoch {
                debug!(
                    stale = epoch,
                    current = s.epoch,
                    "discarding result for previous selection"
                );
                return false;
            }

            s.pending = s.pending.saturating_sub(1);
            s.loading = s.pending > 0;

            match settled {
                Settled::Loaded {
                    record: Some(record),
                    source,
                    at,
                } => {
                    s.theme = Some(theme_for(record.status));
                    s.data = Some(record);
                    s.error = None;
                    s.outcome = Some(Outcome::Ready);
                    s.source = Some(source);
                    s.updated_at = Some(at);
                }
                Settled::Loaded {
                    record: None,
                    source,
                    at,
                } => {
                    info!(location = %s.selected.name, "no valid reading for location");
                    s.data = None;
                    s.theme = None;
                    s.error = None;
                    s.outcome = Some(Outcome::NoData);
                    s.source = Some(source);
                    s.updated_at = Some(at);
                }
                Settled::Failed(message) => {
                    s.error = Some(message);
                    s.outcome = Some(Outcome::Failed);
                }
            }
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::{CACHE_KEY, CACHE_TIMESTAMP_KEY, KeyValueStore, MemoryStore},
        clock::ManualClock,
        fetcher::FetchError,
        severity::Severity,
    };
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };
    use tokio::sync::oneshot;

    type FetchResult = Result<Vec<RawCityReading>, FetchError>;

    /// Answers from a script, then repeats `fallback` if set.
    #[derive(Debug, Default)]
    struct ScriptedFetcher {
        script: Mutex<VecDeque<FetchResult>>,
        fallback: Option<Vec<RawCityReading>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<FetchResult>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                ..Default::default()
            }
        }

        fn repeating(readings: Vec<RawCityReading>) -> Self {
            Self {
                fallback: Some(readings),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AirQualityFetcher for ScriptedFetcher {
        async fn fetch_all(&self) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match (next, &self.fallback) {
                (Some(result), _) => result,
                (None, Some(readings)) => Ok(readings.clone()),
                (None, None) => Err(FetchError::Transport("script exhausted".into())),
            }
        }
    }

    /// Each call waits for the next gate, in call order.
    #[derive(Debug, Default)]
    struct GatedFetcher {
        gates: Mutex<VecDeque<oneshot::Receiver<FetchResult>>>,
        calls: AtomicUsize,
    }

    impl GatedFetcher {
        fn gate(&self) -> oneshot::Sender<FetchResult> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AirQualityFetcher for GatedFetcher {
        async fn fetch_all(&self) -> FetchResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self
                .gates
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected fetch");
            gate.await.expect("gate dropped")
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        cache: ExpiringCache,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let clock =
                Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()));
            let cache = ExpiringCache::new(store.clone(), clock.clone());
            Self {
                store,
                clock,
                cache,
            }
        }

        fn builder(
            &self,
            registry: LocationRegistry,
            fetcher: Arc<dyn AirQualityFetcher>,
        ) -> DashboardBuilder {
            Dashboard::builder(registry, fetcher, self.cache.clone()).clock(self.clock.clone())
        }

        fn dashboard(
            &self,
            registry: LocationRegistry,
            fetcher: Arc<dyn AirQualityFetcher>,
        ) -> Dashboard {
            self.builder(registry, fetcher).build().unwrap()
        }
    }

    fn city_a() -> Location {
        Location::new(1, "CityA", 25.0, -100.0)
    }

    fn city_b() -> Location {
        Location::new(2, "CityB", 25.5, -100.5)
    }

    fn registry() -> LocationRegistry {
        LocationRegistry::new(vec![city_a(), city_b()]).unwrap()
    }

    fn reading(id: u32, aqi: i32) -> RawCityReading {
        let name = if id == 1 { "CityA" } else { "CityB" };
        RawCityReading::new(Some(id), name).with_aqi(aqi)
    }

    #[tokio::test]
    async fn starts_idle_on_first_location() {
        let h = Harness::new();
        let dash = h.dashboard(registry(), Arc::new(ScriptedFetcher::default()));

        let state = dash.state();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.selected, city_a());
        assert!(state.data.is_none());
    }

    #[tokio::test]
    async fn initialize_with_empty_cache_fetches_and_caches() {
        let h = Harness::new();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![reading(1, 75)])]));
        let dash = h.dashboard(registry(), fetcher.clone());

        dash.initialize().await;

        let state = dash.state();
        assert_eq!(state.phase(), Phase::Ready);
        let data = state.data.unwrap();
        assert_eq!(data.aqi, 75);
        assert_eq!(data.status, Severity::Moderate);
        assert_eq!(state.theme, Some(theme_for(Severity::Moderate)));
        assert_eq!(state.source, Some(DataSource::Network));
        assert!(state.error.is_none());
        assert_eq!(fetcher.calls(), 1);

        let cached = h.cache.read().unwrap().unwrap();
        assert_eq!(cached.payload, vec![reading(1, 75)]);
        assert_eq!(cached.age, Duration::ZERO);
    }

    #[tokio::test]
    async fn initialize_serves_fresh_cache_without_fetching() {
        let h = Harness::new();
        h.cache.write(&[reading(1, 30)]).unwrap();
        h.clock.advance(chrono::Duration::minutes(10));

        let fetcher = Arc::new(ScriptedFetcher::default());
        let dash = h.dashboard(registry(), fetcher.clone());
        dash.initialize().await;

        let state = dash.state();
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(state.data.unwrap().status, Severity::Good);
        assert_eq!(state.source, Some(DataSource::Cache));
    }

    #[tokio::test]
    async fn stale_cache_triggers_fetch() {
        let h = Harness::new();
        h.cache.write(&[reading(1, 30)]).unwrap();
        h.clock.advance(chrono::Duration::minutes(61));

        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![reading(1, 130)])]));
        let dash = h.dashboard(registry(), fetcher.clone());
        dash.initialize().await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(dash.state().data.unwrap().status, Severity::UnhealthySensitive);
    }

    #[tokio::test]
    async fn refresh_bypasses_fresh_cache() {
        let h = Harness::new();
        h.cache.write(&[reading(1, 30)]).unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![reading(1, 210)])]));
        let dash = h.dashboard(registry(), fetcher.clone());

        dash.initialize().await;
        assert_eq!(fetcher.calls(), 0);

        dash.refresh().await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(dash.state().data.unwrap().status, Severity::VeryUnhealthy);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_data() {
        let h = Harness::new();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![reading(1, 75)]),
            Err(FetchError::Transport("connection reset".into())),
        ]));
        let dash = h.dashboard(registry(), fetcher);

        dash.initialize().await;
        let before = dash.state().data;

        dash.refresh().await;
        let state = dash.state();
        assert_eq!(state.phase(), Phase::Failed);
        assert_eq!(state.data, before);
        assert!(state.theme.is_some());
        assert!(state.error.unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn first_load_failure_shows_error_without_data() {
        let h = Harness::new();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(FetchError::Empty)]));
        let dash = h.dashboard(registry(), fetcher);

        dash.initialize().await;

        let state = dash.state();
        assert_eq!(state.phase(), Phase::Failed);
        assert!(state.data.is_none());
        assert_eq!(state.error.as_deref(), Some("the source returned no readings"));
    }

    #[tokio::test]
    async fn success_after_failure_clears_error() {
        let h = Harness::new();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err(FetchError::Status {
                status: 502,
                body: "bad gateway".into(),
            }),
            Ok(vec![reading(1, 20)]),
        ]));
        let dash = h.dashboard(registry(), fetcher);

        dash.initialize().await;
        dash.refresh().await;

        let state = dash.state();
        assert_eq!(state.phase(), Phase::Ready);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn missing_reading_is_no_data_not_error() {
        let h = Harness::new();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(vec![reading(1, 75), reading(2, 40)]),
            Ok(vec![reading(1, 80)]),
        ]));
        let dash = h.dashboard(registry(), fetcher);

        dash.initialize().await;
        dash.refresh().await;
        assert_eq!(dash.state().phase(), Phase::Ready);

        // Fresh cache now lacks CityB.
        dash.select_location(city_b()).await;
        let state = dash.state();
        assert_eq!(state.phase(), Phase::NoData);
        assert!(state.data.is_none());
        assert!(state.theme.is_none());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn corrupt_cache_falls_through_to_network() {
        let h = Harness::new();
        h.store.set(CACHE_KEY, "<<garbage>>").unwrap();
        let stamp = h.clock.now().timestamp_millis().to_string();
        h.store.set(CACHE_TIMESTAMP_KEY, &stamp).unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![reading(1, 60)])]));
        let dash = h.dashboard(registry(), fetcher.clone());
        dash.initialize().await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(dash.state().phase(), Phase::Ready);
        let cached = h.cache.read().unwrap().unwrap();
        assert_eq!(cached.payload, vec![reading(1, 60)]);
    }

    async fn wait_for_calls(fetcher: &GatedFetcher, n: usize) {
        while fetcher.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    async fn race(b_answers_first: bool) -> DashboardState {
        let h = Harness::new();
        let fetcher = Arc::new(GatedFetcher::default());
        let gate_a = fetcher.gate();
        let gate_b = fetcher.gate();
        let dash = Arc::new(h.dashboard(registry(), fetcher.clone()));

        let first = tokio::spawn({
            let dash = dash.clone();
            async move { dash.select_location(city_a()).await }
        });
        wait_for_calls(&fetcher, 1).await;

        let second = tokio::spawn({
            let dash = dash.clone();
            async move { dash.select_location(city_b()).await }
        });
        wait_for_calls(&fetcher, 2).await;

        let answer_a = Ok(vec![reading(1, 30), reading(2, 45)]);
        let answer_b = Ok(vec![reading(1, 35), reading(2, 180)]);

        if b_answers_first {
            gate_b.send(answer_b).unwrap();
            second.await.unwrap();
            gate_a.send(answer_a).unwrap();
            first.await.unwrap();
        } else {
            gate_a.send(answer_a).unwrap();
            first.await.unwrap();
            gate_b.send(answer_b).unwrap();
            second.await.unwrap();
        }

        dash.state()
    }

    #[tokio::test]
    async fn late_answer_for_previous_selection_is_discarded() {
        let state = race(true).await;

        assert_eq!(state.selected, city_b());
        assert_eq!(state.phase(), Phase::Ready);
        let data = state.data.unwrap();
        assert_eq!(data.location.name, "CityB");
        assert_eq!(data.aqi, 180);
    }

    #[tokio::test]
    async fn early_answer_for_previous_selection_is_discarded() {
        let state = race(false).await;

        assert_eq!(state.selected, city_b());
        assert_eq!(state.data.unwrap().aqi, 180);
    }

    #[tokio::test]
    async fn loading_stays_set_while_a_selection_is_in_flight() {
        let h = Harness::new();
        let fetcher = Arc::new(GatedFetcher::default());
        let gate = fetcher.gate();
        let dash = Arc::new(h.dashboard(registry(), fetcher.clone()));

        let task = tokio::spawn({
            let dash = dash.clone();
            async move { dash.initialize().await }
        });
        wait_for_calls(&fetcher, 1).await;
        assert_eq!(dash.state().phase(), Phase::Loading);

        gate.send(Ok(vec![reading(1, 10)])).unwrap();
        task.await.unwrap();
        assert_eq!(dash.state().phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn cancelled_refresh_does_not_pin_loading() {
        let h = Harness::new();
        let fetcher = Arc::new(GatedFetcher::default());
        let first = fetcher.gate();
        let _abandoned = fetcher.gate();
        let last = fetcher.gate();
        first.send(Ok(vec![reading(1, 75)])).unwrap();

        let dash = Arc::new(h.dashboard(registry(), fetcher.clone()));
        dash.initialize().await;
        assert_eq!(dash.state().phase(), Phase::Ready);

        let task = tokio::spawn({
            let dash = dash.clone();
            async move { dash.refresh().await }
        });
        wait_for_calls(&fetcher, 2).await;
        assert!(dash.state().loading);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!dash.state().loading);

        last.send(Ok(vec![reading(1, 90)])).unwrap();
        dash.refresh().await;

        let state = dash.state();
        assert!(!state.loading);
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(state.data.unwrap().aqi, 90);
    }

    #[tokio::test]
    async fn dropped_selection_leaves_later_loads_settling() {
        let h = Harness::new();
        let fetcher = Arc::new(GatedFetcher::default());
        let _abandoned = fetcher.gate();
        let answer = fetcher.gate();
        let dash = h.dashboard(registry(), fetcher.clone());

        let select = dash.select_location(city_b());
        let timed_out = tokio::time::timeout(Duration::from_millis(10), select).await;
        assert!(timed_out.is_err());
        assert!(!dash.state().loading);
        assert_eq!(dash.state().phase(), Phase::Idle);

        answer.send(Ok(vec![reading(2, 45)])).unwrap();
        dash.refresh().await;

        let state = dash.state();
        assert_eq!(state.selected, city_b());
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(state.data.unwrap().aqi, 45);
    }

    #[tokio::test]
    async fn dashboard_honours_freshness_boundary() {
        let h = Harness::new();
        h.cache.write(&[reading(1, 30), reading(2, 40)]).unwrap();

        let upstream = vec![reading(1, 120), reading(2, 130)];
        let fetcher = Arc::new(ScriptedFetcher::repeating(upstream));
        let dash = h.dashboard(registry(), fetcher.clone());
        let window = chrono::Duration::from_std(FRESHNESS_WINDOW).unwrap();
        let one_ms = chrono::Duration::milliseconds(1);

        h.clock.advance(window - one_ms);
        dash.initialize().await;
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(dash.state().source, Some(DataSource::Cache));
        assert_eq!(dash.state().data.unwrap().aqi, 30);

        h.clock.advance(one_ms + one_ms);
        dash.select_location(city_b()).await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(dash.state().source, Some(DataSource::Network));
        assert_eq!(dash.state().data.unwrap().aqi, 130);
    }

    #[tokio::test]
    async fn refresh_before_initialize_fetches_once_for_initial_location() {
        let h = Harness::new();
        h.cache.write(&[reading(2, 30)]).unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![reading(2, 160)])]));
        let dash = h
            .builder(registry(), fetcher.clone())
            .initial_location(2)
            .build()
            .unwrap();

        dash.refresh().await;

        let state = dash.state();
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(state.selected, city_b());
        assert_eq!(state.source, Some(DataSource::Network));
        assert_eq!(state.data.unwrap().aqi, 160);
    }

    #[tokio::test]
    async fn subscribers_observe_updates() {
        let h = Harness::new();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![reading(1, 99)])]));
        let dash = h.dashboard(registry(), fetcher);
        let mut rx = dash.subscribe();

        dash.initialize().await;

        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.data.unwrap().aqi, 99);
    }

    #[tokio::test]
    async fn initial_location_can_be_overridden() {
        let h = Harness::new();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![reading(2, 55)])]));
        let dash = h
            .builder(registry(), fetcher)
            .initial_location(2)
            .build()
            .unwrap();

        dash.initialize().await;
        assert_eq!(dash.selected(), city_b());
        assert_eq!(dash.state().data.unwrap().aqi, 55);

        let err = h
            .builder(registry(), Arc::new(ScriptedFetcher::default()))
            .initial_location(42)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Unknown location id 42"));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_refresh_ticks_until_dropped() {
        let h = Harness::new();
        let fetcher = Arc::new(ScriptedFetcher::repeating(vec![reading(1, 70)]));
        let mut dash = h
            .builder(registry(), fetcher.clone())
            .freshness_window(Duration::ZERO)
            .build()
            .unwrap();

        dash.start_auto_refresh(REFRESH_INTERVAL);
        assert!(dash.is_auto_refreshing());

        tokio::time::sleep(REFRESH_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(dash.state().phase(), Phase::Ready);

        tokio::time::sleep(REFRESH_INTERVAL).await;
        assert_eq!(fetcher.calls(), 2);

        drop(dash);
        tokio::time::sleep(REFRESH_INTERVAL * 3).await;
        assert_eq!(fetcher.calls(), 2);
    }
}
