//! Definitions lifecycle manager.
//!
//! Owns the current [`Definitions`] snapshot of one client. Calls are readers
//! of a fair [`RwLock`]; a refresh or re-point is the single writer. A writer
//! waits for in-flight calls to drain, and calls that arrive while a writer is
//! active or queued wait until it is done. Snapshots are immutable and
//! replaced wholesale.
//!
//! ```text
//! Uninitialized ──first use──▶ Ready ◀──▶ Refreshing
//!        │                       │
//!        └──fetch fails──▶ Error ◀┘ (re-point fails)
//! ```
//!
//! The first fetch happens lazily, exactly once, and the phase stays
//! `Uninitialized` until it completes. A failure is sticky until a
//! re-point or a refresh succeeds. A failed background refresh keeps serving
//! the previous snapshot and records the error.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use protocol::{parse_definitions, DescriptionError, DescriptionFetcher, Definitions, SoapError};
use serde::Serialize;
use tokio::sync::{OnceCell, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Shortest period accepted for the background refresh.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Externally visible lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionsPhase {
    Uninitialized,
    Ready,
    /// A fetch holds the gate.
    Refreshing,
    Error,
}

/// Diagnostic view of a manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionsStatus {
    pub phase: DefinitionsPhase,
    pub location: String,
    /// When the current snapshot was published.
    pub loaded_at: Option<DateTime<Utc>>,
    /// Error of the most recent failed fetch, cleared by a successful one.
    pub last_refresh_error: Option<String>,
}

enum Snapshot {
    Uninitialized,
    Ready(Arc<Definitions>),
    Failed(Arc<DescriptionError>),
}

struct State {
    location: String,
    snapshot: Snapshot,
    loaded_at: Option<DateTime<Utc>>,
    last_refresh_error: Option<Arc<DescriptionError>>,
}

impl State {
    fn phase(&self) -> DefinitionsPhase {
        match self.snapshot {
            Snapshot::Uninitialized => DefinitionsPhase::Uninitialized,
            Snapshot::Ready(_) => DefinitionsPhase::Ready,
            Snapshot::Failed(_) => DefinitionsPhase::Error,
        }
    }

    fn publish(&mut self, definitions: Definitions) {
        self.snapshot = Snapshot::Ready(Arc::new(definitions));
        self.loaded_at = Some(Utc::now());
        self.last_refresh_error = None;
    }

    fn fail(&mut self, err: Arc<DescriptionError>) {
        self.snapshot = Snapshot::Failed(Arc::clone(&err));
        self.loaded_at = None;
        self.last_refresh_error = Some(err);
    }
}

/// Read access to the current snapshot for the duration of one call.
///
/// While a lease is alive, refreshes and re-points wait.
pub struct DefinitionsLease<'a> {
    _guard: RwLockReadGuard<'a, State>,
    definitions: Arc<Definitions>,
}

impl DefinitionsLease<'_> {
    pub fn snapshot(&self) -> Arc<Definitions> {
        Arc::clone(&self.definitions)
    }
}

impl Deref for DefinitionsLease<'_> {
    type Target = Definitions;

    fn deref(&self) -> &Definitions {
        &self.definitions
    }
}

/// Fetches, caches and refreshes the service description of one client.
pub struct DefinitionsManager {
    fetcher: Arc<dyn DescriptionFetcher>,
    gate: RwLock<State>,
    initialized: OnceCell<()>,
    /// Set while the lazy first fetch holds the gate.
    initial_fetch: AtomicBool,
    refresh_interval: Option<Duration>,
    refresh_task: OnceLock<JoinHandle<()>>,
}

impl DefinitionsManager {
    /// Creates a manager for `location`. Nothing is fetched until first use.
    ///
    /// A `refresh_interval` below [`MIN_REFRESH_INTERVAL`] is ignored.
    pub fn new(
        fetcher: Arc<dyn DescriptionFetcher>,
        location: impl Into<String>,
        refresh_interval: Option<Duration>,
    ) -> Arc<Self> {
        let refresh_interval = refresh_interval.filter(|interval| {
            let accepted = *interval >= MIN_REFRESH_INTERVAL;
            if !accepted {
                tracing::warn!(
                    requested_secs = interval.as_secs(),
                    minimum_secs = MIN_REFRESH_INTERVAL.as_secs(),
                    "refresh interval below minimum; background refresh disabled"
                );
            }
            accepted
        });

        Arc::new(Self {
            fetcher,
            gate: RwLock::new(State {
                location: location.into(),
                snapshot: Snapshot::Uninitialized,
                loaded_at: None,
                last_refresh_error: None,
            }),
            initialized: OnceCell::new(),
            initial_fetch: AtomicBool::new(false),
            refresh_interval,
            refresh_task: OnceLock::new(),
        })
    }

    /// Performs the first fetch and starts the refresh loop. Runs once per
    /// manager; later calls return immediately.
    pub async fn ensure_initialized(self: &Arc<Self>) {
        self.initialized
            .get_or_init(|| async {
                self.initial_fetch.store(true, Ordering::Release);
                {
                    let mut state = self.gate.write().await;
                    if matches!(state.snapshot, Snapshot::Uninitialized) {
                        let location = state.location.clone();
                        match self.load(&location).await {
                            Ok(definitions) => state.publish(definitions),
                            Err(err) => {
                                tracing::error!(%location, error = %err, "initial description fetch failed");
                                state.fail(Arc::new(err));
                            }
                        }
                    }
                }
                self.initial_fetch.store(false, Ordering::Release);
                self.spawn_refresh_loop();
            })
            .await;
    }

    /// Registers a call as an in-flight reader.
    ///
    /// # Errors
    ///
    /// [`SoapError::DescriptionUnavailable`] while the description is in the
    /// error state.
    pub async fn acquire(self: &Arc<Self>) -> Result<DefinitionsLease<'_>, SoapError> {
        self.ensure_initialized().await;

        let guard = self.gate.read().await;
        let definitions = match &guard.snapshot {
            Snapshot::Ready(definitions) => Arc::clone(definitions),
            Snapshot::Failed(err) => {
                return Err(SoapError::DescriptionUnavailable(Arc::clone(err)));
            }
            Snapshot::Uninitialized => {
                return Err(SoapError::DescriptionUnavailable(Arc::new(
                    DescriptionError::NotLoaded,
                )));
            }
        };
        Ok(DefinitionsLease {
            _guard: guard,
            definitions,
        })
    }

    /// Re-fetches the description from its current location.
    ///
    /// On failure a previously loaded snapshot stays in service; the error is
    /// recorded and returned.
    pub async fn refresh(&self) -> Result<(), SoapError> {
        let mut state = self.gate.write().await;
        let location = state.location.clone();

        match self.load(&location).await {
            Ok(definitions) => {
                state.publish(definitions);
                Ok(())
            }
            Err(err) => {
                let err = Arc::new(err);
                if matches!(state.snapshot, Snapshot::Ready(_)) {
                    tracing::warn!(%location, error = %err, "refresh failed; keeping previous description");
                    state.last_refresh_error = Some(Arc::clone(&err));
                } else {
                    tracing::warn!(%location, error = %err, "refresh failed");
                    state.fail(Arc::clone(&err));
                }
                Err(SoapError::DescriptionUnavailable(err))
            }
        }
    }

    /// Points the manager at a new location and fetches it.
    ///
    /// The outcome always replaces the current state, so a failed re-point
    /// leaves the manager in the error state.
    pub async fn set_description_url(&self, location: impl Into<String>) -> Result<(), SoapError> {
        let location = location.into();
        let mut state = self.gate.write().await;
        state.location = location.clone();

        match self.load(&location).await {
            Ok(definitions) => {
                state.publish(definitions);
                Ok(())
            }
            Err(err) => {
                let err = Arc::new(err);
                state.fail(Arc::clone(&err));
                Err(SoapError::DescriptionUnavailable(err))
            }
        }
    }

    /// Current phase without waiting. Reports `Uninitialized` during the
    /// lazy first fetch and `Refreshing` while any other writer holds or
    /// requests the gate.
    pub fn phase(&self) -> DefinitionsPhase {
        match self.gate.try_read() {
            Ok(state) => state.phase(),
            Err(_) if self.initial_fetch.load(Ordering::Acquire) => {
                DefinitionsPhase::Uninitialized
            }
            Err(_) => DefinitionsPhase::Refreshing,
        }
    }

    pub async fn status(&self) -> DefinitionsStatus {
        let state = self.gate.read().await;
        DefinitionsStatus {
            phase: state.phase(),
            location: state.location.clone(),
            loaded_at: state.loaded_at,
            last_refresh_error: state.last_refresh_error.as_ref().map(|err| err.to_string()),
        }
    }

    async fn load(&self, location: &str) -> Result<Definitions, DescriptionError> {
        tracing::info!(%location, "fetching service description");
        let bytes = self.fetcher.fetch(location).await?;
        let definitions = parse_definitions(&bytes)?;
        tracing::info!(
            %location,
            operations = definitions.operation_names().len(),
            "service description loaded"
        );
        Ok(definitions)
    }

    fn spawn_refresh_loop(self: &Arc<Self>) {
        let Some(period) = self.refresh_interval else {
            return;
        };
        let manager = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if manager.refresh().await.is_ok() {
                    tracing::debug!("background refresh completed");
                }
            }
        });
        if self.refresh_task.set(task).is_err() {
            tracing::error!("refresh loop started twice");
        }
    }
}

impl Drop for DefinitionsManager {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.get() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const DESCRIPTION: &[u8] = include_bytes!("../../protocol/testdata/check_vat.wsdl");

    #[derive(Default)]
    struct FlakyFetcher {
        fetches: AtomicUsize,
        failing: AtomicBool,
    }

    impl FlakyFetcher {
        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DescriptionFetcher for FlakyFetcher {
        async fn fetch(&self, location: &str) -> Result<Vec<u8>, DescriptionError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) || location.starts_with("bad") {
                return Err(DescriptionError::Fetch {
                    location: location.to_owned(),
                    reason: "connection refused".into(),
                });
            }
            Ok(DESCRIPTION.to_vec())
        }
    }

    /// Blocks every fetch until `release` is notified.
    #[derive(Default)]
    struct StallingFetcher {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl DescriptionFetcher for StallingFetcher {
        async fn fetch(&self, _location: &str) -> Result<Vec<u8>, DescriptionError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(DESCRIPTION.to_vec())
        }
    }

    fn manager(fetcher: &Arc<FlakyFetcher>, location: &str) -> Arc<DefinitionsManager> {
        DefinitionsManager::new(fetcher.clone(), location, None)
    }

    #[tokio::test]
    async fn first_use_fetches_exactly_once() {
        let fetcher = Arc::new(FlakyFetcher::default());
        let manager = manager(&fetcher, "good.wsdl");
        assert_eq!(manager.phase(), DefinitionsPhase::Uninitialized);
        assert_eq!(fetcher.fetches(), 0);

        let (first, second) = tokio::join!(manager.acquire(), manager.acquire());
        assert!(first.is_ok());
        assert!(second.is_ok());
        drop((first, second));

        assert_eq!(fetcher.fetches(), 1);
        assert_eq!(manager.phase(), DefinitionsPhase::Ready);
    }

    #[tokio::test]
    async fn initial_failure_is_sticky_until_repointed() {
        let fetcher = Arc::new(FlakyFetcher::default());
        let manager = manager(&fetcher, "bad.wsdl");

        for _ in 0..2 {
            let err = manager.acquire().await.err().expect("description unavailable");
            assert!(matches!(err, SoapError::DescriptionUnavailable(_)));
        }
        assert_eq!(fetcher.fetches(), 1);
        assert_eq!(manager.phase(), DefinitionsPhase::Error);

        manager
            .set_description_url("good.wsdl")
            .await
            .expect("re-point succeeds");
        assert!(manager.acquire().await.is_ok());

        let status = manager.status().await;
        assert_eq!(status.location, "good.wsdl");
        assert!(status.loaded_at.is_some());
        assert_eq!(status.last_refresh_error, None);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_previous_snapshot() {
        let fetcher = Arc::new(FlakyFetcher::default());
        let manager = manager(&fetcher, "good.wsdl");
        let before = manager.acquire().await.expect("loads").snapshot();

        fetcher.failing.store(true, Ordering::SeqCst);
        assert!(manager.refresh().await.is_err());

        let lease = manager.acquire().await.expect("stale snapshot still served");
        assert!(Arc::ptr_eq(&lease.snapshot(), &before));
        drop(lease);

        let status = manager.status().await;
        assert_eq!(status.phase, DefinitionsPhase::Ready);
        assert!(status
            .last_refresh_error
            .as_deref()
            .is_some_and(|err| err.contains("connection refused")));
    }

    #[tokio::test]
    async fn failed_repoint_replaces_a_good_snapshot() {
        let fetcher = Arc::new(FlakyFetcher::default());
        let manager = manager(&fetcher, "good.wsdl");
        drop(manager.acquire().await.expect("loads"));

        assert!(manager.set_description_url("bad.wsdl").await.is_err());
        assert!(manager.acquire().await.is_err());
        assert_eq!(manager.status().await.loaded_at, None);
    }

    #[tokio::test]
    async fn repoint_before_first_use_skips_the_lazy_fetch() {
        let fetcher = Arc::new(FlakyFetcher::default());
        let manager = manager(&fetcher, "bad.wsdl");

        manager
            .set_description_url("good.wsdl")
            .await
            .expect("re-point succeeds");
        assert!(manager.acquire().await.is_ok());
        assert_eq!(fetcher.fetches(), 1);
    }

    #[tokio::test]
    async fn phase_reports_a_held_gate_as_refreshing() {
        let fetcher = Arc::new(FlakyFetcher::default());
        let manager = manager(&fetcher, "good.wsdl");
        drop(manager.acquire().await.expect("loads"));

        let writer = manager.gate.write().await;
        assert_eq!(manager.phase(), DefinitionsPhase::Refreshing);
        drop(writer);
        assert_eq!(manager.phase(), DefinitionsPhase::Ready);
    }

    #[tokio::test]
    async fn phase_stays_uninitialized_during_the_first_fetch() {
        let fetcher = Arc::new(StallingFetcher::default());
        let manager = DefinitionsManager::new(fetcher.clone(), "good.wsdl", None);

        let first = tokio::spawn({
            let manager = manager.clone();
            async move {
                let lease = manager.acquire().await?;
                drop(lease);
                Ok::<_, SoapError>(())
            }
        });
        fetcher.entered.notified().await;
        assert_eq!(manager.phase(), DefinitionsPhase::Uninitialized);

        fetcher.release.notify_one();
        first.await.expect("task joins").expect("loads");
        assert_eq!(manager.phase(), DefinitionsPhase::Ready);

        let refresh = tokio::spawn({
            let manager = manager.clone();
            async move { manager.refresh().await }
        });
        fetcher.entered.notified().await;
        assert_eq!(manager.phase(), DefinitionsPhase::Refreshing);
        fetcher.release.notify_one();
        refresh.await.expect("task joins").expect("refresh succeeds");
    }

    #[tokio::test(start_paused = true)]
    async fn short_intervals_never_schedule_a_refresh() {
        let fetcher = Arc::new(FlakyFetcher::default());
        let manager =
            DefinitionsManager::new(fetcher.clone(), "good.wsdl", Some(Duration::from_secs(60)));
        drop(manager.acquire().await.expect("loads"));

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(fetcher.fetches(), 1);
        assert!(manager.refresh_task.get().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_loop_fires_after_the_interval() {
        let fetcher = Arc::new(FlakyFetcher::default());
        let manager =
            DefinitionsManager::new(fetcher.clone(), "good.wsdl", Some(MIN_REFRESH_INTERVAL));
        drop(manager.acquire().await.expect("loads"));

        tokio::time::sleep(MIN_REFRESH_INTERVAL - Duration::from_secs(1)).await;
        assert_eq!(fetcher.fetches(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fetcher.fetches(), 2);

        tokio::time::sleep(MIN_REFRESH_INTERVAL).await;
        assert_eq!(fetcher.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_loop_stops_when_the_manager_is_dropped() {
        let fetcher = Arc::new(FlakyFetcher::default());
        let manager =
            DefinitionsManager::new(fetcher.clone(), "good.wsdl", Some(MIN_REFRESH_INTERVAL));
        drop(manager.acquire().await.expect("loads"));
        drop(manager);

        tokio::time::sleep(MIN_REFRESH_INTERVAL * 3).await;
        assert_eq!(fetcher.fetches(), 1);
    }
}
