//! Status synchronization engine: periodic multi-park polling, change
//! detection, and favorite-aware notification gating.
//!
//! One repeating timer drives poll cycles. Within a cycle every tracked park
//! runs its own fetch -> parse -> diff -> store-replace -> notify pipeline as
//! a spawned task, so a slow or failing park never stalls the others. A
//! per-park in-flight guard keeps at most one pipeline per park running.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;

use crate::config::{ParkConfig, SyncConfig};
use crate::favorites::FavoritesStore;
use crate::models::{RideStatusKind, StatusTransition};
use crate::providers::LiveStatusFetch;
use crate::services::notify::Notifier;
use crate::services::{diff, notify, parser};
use crate::store::ParkRideStore;

/// Published after a park's store replace completes, so presentation can
/// re-read the snapshot it cares about.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotUpdate {
    pub park_id: String,
    /// Timestamp of the replace that produced this update
    pub timestamp: String,
}

/// Sender for snapshot update notifications
pub type SnapshotUpdateSender = broadcast::Sender<SnapshotUpdate>;

/// A detected transition kept in the debug ring, whether or not it produced
/// a user-facing notification.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransitionRecord {
    pub park_id: String,
    pub park_name: String,
    pub ride_id: String,
    pub ride_name: String,
    pub old_status: Option<RideStatusKind>,
    pub new_status: RideStatusKind,
    /// Whether a notification was delivered for this transition
    pub notified: bool,
    pub detected_at: String,
}

/// Owns the poll timer and fans status refreshes out across all tracked
/// parks. Constructed once at startup and shared behind an `Arc`.
pub struct SyncManager<C: LiveStatusFetch> {
    client: C,
    parks: Vec<ParkConfig>,
    config: SyncConfig,
    store: ParkRideStore,
    favorites: Arc<FavoritesStore>,
    notifier: Arc<dyn Notifier>,
    updates_tx: SnapshotUpdateSender,
    last_updated: RwLock<Option<DateTime<Utc>>>,
    transitions: RwLock<VecDeque<TransitionRecord>>,
    /// Parks with a pipeline currently running
    in_flight: Mutex<HashSet<String>>,
    /// Handle of the repeating poll task while polling is active
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: LiveStatusFetch> SyncManager<C> {
    pub fn new(
        client: C,
        parks: Vec<ParkConfig>,
        favorites: Arc<FavoritesStore>,
        notifier: Arc<dyn Notifier>,
        config: SyncConfig,
    ) -> Self {
        // Capacity 16: subscribers re-read the store anyway, missed updates
        // are only missed wakeups
        let (updates_tx, _) = broadcast::channel(16);

        Self {
            client,
            parks,
            config,
            store: ParkRideStore::new(),
            favorites,
            notifier,
            updates_tx,
            last_updated: RwLock::new(None),
            transitions: RwLock::new(VecDeque::new()),
            in_flight: Mutex::new(HashSet::new()),
            poll_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &ParkRideStore {
        &self.store
    }

    /// Get the snapshot update sender for passing to API handlers
    pub fn updates_sender(&self) -> SnapshotUpdateSender {
        self.updates_tx.clone()
    }

    /// Timestamp of the most recent successful park replace.
    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        *self.last_updated.read().await
    }

    /// Recent transitions, oldest first.
    pub async fn recent_transitions(&self) -> Vec<TransitionRecord> {
        self.transitions.read().await.iter().cloned().collect()
    }

    pub async fn is_polling(&self) -> bool {
        let task = self.poll_task.lock().await;
        task.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Arm the repeating poll timer. Replaces any previous timer task.
    /// Does not trigger an immediate cycle; the lifecycle hooks do that.
    pub async fn start(self: &Arc<Self>) {
        let mut task = self.poll_task.lock().await;
        if let Some(handle) = task.take() {
            handle.abort();
        }

        let this = self.clone();
        let interval = self.config.interval();
        let fetch_timeout = self.config.fetch_timeout();
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // Skip the first tick which fires immediately; foreground entry
            // already runs a cycle of its own
            ticker.tick().await;

            loop {
                ticker.tick().await;
                this.spawn_cycle(fetch_timeout);
            }
        }));

        info!(
            interval_secs = self.config.interval_secs,
            parks = self.parks.len(),
            "started status polling"
        );
    }

    /// Cancel the poll timer. Pipelines already in flight run to completion
    /// and apply their results to the store as normal.
    pub async fn stop(&self) {
        let mut task = self.poll_task.lock().await;
        if let Some(handle) = task.take() {
            handle.abort();
            info!("stopped status polling");
        }
    }

    /// Fan out one poll cycle and wait for it, up to `deadline`. Returns
    /// whether every park's pipeline completed in time. Pipelines that miss
    /// the deadline keep running and apply their results whenever they
    /// finish; until then their parks simply stay stale.
    pub async fn run_once(self: &Arc<Self>, deadline: Duration) -> bool {
        let fetch_timeout = self.config.fetch_timeout().min(deadline);
        let handles = self.spawn_cycle(fetch_timeout);

        let all_completed = tokio::time::timeout(deadline, futures::future::join_all(handles))
            .await
            .is_ok();

        if !all_completed {
            warn!(
                deadline_secs = deadline.as_secs_f64(),
                "refresh did not finish for every park within the deadline"
            );
        }
        all_completed
    }

    /// Spawn one pipeline task per tracked park.
    fn spawn_cycle(self: &Arc<Self>, fetch_timeout: Duration) -> Vec<JoinHandle<()>> {
        self.parks
            .iter()
            .cloned()
            .map(|park| {
                let this = self.clone();
                tokio::spawn(async move { this.sync_park(&park, fetch_timeout).await })
            })
            .collect()
    }

    async fn sync_park(&self, park: &ParkConfig, fetch_timeout: Duration) {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(park.id.clone()) {
                debug!(park = %park.name, "previous poll still in flight, skipping");
                return;
            }
        }

        self.poll_park(park, fetch_timeout).await;

        self.in_flight.lock().await.remove(&park.id);
    }

    /// One park's pipeline: fetch -> parse -> diff -> replace -> notify.
    /// Failures are contained here; the park keeps its stale data and the
    /// rest of the cycle is unaffected.
    async fn poll_park(&self, park: &ParkConfig, fetch_timeout: Duration) {
        let payload = match self.client.fetch_live(&park.id, fetch_timeout).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(park = %park.name, error = %e, "fetch failed, keeping existing data");
                self.store.mark_fetch_failed(&park.id).await;
                return;
            }
        };

        let current = match parser::parse_live(&payload, &park.id) {
            Ok(rides) => rides,
            Err(e) => {
                warn!(park = %park.name, error = %e, "parse failed, keeping existing data");
                self.store.mark_fetch_failed(&park.id).await;
                return;
            }
        };

        // Favorites are read fresh here so a toggle mid-cycle affects the
        // very next gating decision
        let favorite_rides = self.favorites.ride_ids().await;
        let previous = self.store.previous(&park.id).await;
        let (annotated, transitions) = diff::diff(&previous, current, &favorite_rides);

        let synced_at = self.store.replace(&park.id, annotated).await;
        {
            let mut last = self.last_updated.write().await;
            *last = Some(synced_at);
        }
        // Ignore send errors - they just mean no one is listening
        let _ = self.updates_tx.send(SnapshotUpdate {
            park_id: park.id.clone(),
            timestamp: synced_at.to_rfc3339(),
        });

        if transitions.is_empty() {
            return;
        }

        let park_favorited = self.favorites.is_park_favorited(&park.id).await;
        let chatty = self.favorites.chatty();

        for transition in transitions {
            let ride_favorited = favorite_rides.contains(&transition.ride_id);
            let wants_notification = notify::should_notify(ride_favorited, park_favorited, chatty);

            info!(
                park = %park.name,
                ride = %transition.ride_name,
                old = ?transition.old_status,
                new = %transition.new_status,
                notify = wants_notification,
                "ride status changed"
            );

            let mut notified = false;
            if wants_notification {
                match self.notifier.notify(
                    &transition.ride_name,
                    transition.new_status,
                    &transition.ride_id,
                    &park.name,
                ) {
                    Ok(()) => notified = true,
                    // Never retried: a retry risks a duplicate or stale alert
                    // on the next successful cycle
                    Err(e) => {
                        error!(ride = %transition.ride_name, error = %e, "failed to deliver notification");
                    }
                }
            }

            self.record_transition(&park.name, transition, notified).await;
        }
    }

    async fn record_transition(
        &self,
        park_name: &str,
        transition: StatusTransition,
        notified: bool,
    ) {
        let mut ring = self.transitions.write().await;
        if ring.len() >= self.config.transition_log_size {
            ring.pop_front();
        }
        ring.push_back(TransitionRecord {
            park_id: transition.park_id,
            park_name: park_name.to_string(),
            ride_id: transition.ride_id,
            ride_name: transition.ride_name,
            old_status: transition.old_status,
            new_status: transition.new_status,
            notified,
            detected_at: Utc::now().to_rfc3339(),
        });
    }
}

/// Execution phase as reported by the embedding environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Foreground,
    Background,
}

/// Starts and stops polling in response to foreground/background changes and
/// handles the opportunistic background refresh window. The hooks are called
/// by an external scheduler (an OS task system, or our HTTP endpoints).
pub struct Lifecycle<C: LiveStatusFetch> {
    engine: Arc<SyncManager<C>>,
    phase: Mutex<Phase>,
}

impl<C: LiveStatusFetch> Lifecycle<C> {
    pub fn new(engine: Arc<SyncManager<C>>) -> Self {
        Self {
            engine,
            phase: Mutex::new(Phase::Foreground),
        }
    }

    pub async fn phase(&self) -> Phase {
        *self.phase.lock().await
    }

    /// Resume polling and refresh immediately so the UI is never stale on
    /// return to foreground.
    pub async fn on_enter_foreground(&self) {
        {
            let mut phase = self.phase.lock().await;
            *phase = Phase::Foreground;
        }
        self.engine.start().await;
        // Do not wait for the first timer tick
        self.engine.spawn_cycle(self.engine.config.fetch_timeout());
    }

    pub async fn on_enter_background(&self) {
        {
            let mut phase = self.phase.lock().await;
            *phase = Phase::Background;
        }
        self.engine.stop().await;
    }

    /// One bounded refresh inside an OS-granted background window. Always
    /// returns within the deadline; parks that miss it stay stale.
    pub async fn on_background_tick(&self, deadline: Duration) -> bool {
        self.engine.run_once(deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::tests::test_pool;
    use crate::providers::themeparks::FetchError;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    /// Scripted fetcher: each park id has a queue of responses, one per
    /// call. A response with a delay sleeps for the full delay regardless of
    /// the requested timeout, which models a hung fetch.
    struct MockClient {
        scripts: StdMutex<HashMap<String, VecDeque<MockResponse>>>,
    }

    struct MockResponse {
        delay: Duration,
        body: Result<String, String>,
    }

    impl MockClient {
        fn new() -> Self {
            Self {
                scripts: StdMutex::new(HashMap::new()),
            }
        }

        fn script(self, park_id: &str, responses: Vec<MockResponse>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(park_id.to_string(), responses.into());
            self
        }
    }

    impl LiveStatusFetch for MockClient {
        async fn fetch_live(
            &self,
            entity_id: &str,
            _timeout: Duration,
        ) -> Result<String, FetchError> {
            let next = {
                let mut scripts = self.scripts.lock().unwrap();
                scripts.get_mut(entity_id).and_then(|q| q.pop_front())
            };
            match next {
                Some(response) => {
                    if !response.delay.is_zero() {
                        tokio::time::sleep(response.delay).await;
                    }
                    response.body.map_err(FetchError::Network)
                }
                None => Err(FetchError::Network("no scripted response".to_string())),
            }
        }
    }

    fn ok(body: &str) -> MockResponse {
        MockResponse {
            delay: Duration::ZERO,
            body: Ok(body.to_string()),
        }
    }

    fn ok_after(delay: Duration, body: &str) -> MockResponse {
        MockResponse {
            delay,
            body: Ok(body.to_string()),
        }
    }

    fn failed() -> MockResponse {
        MockResponse {
            delay: Duration::ZERO,
            body: Err("connection refused".to_string()),
        }
    }

    fn live_payload(ride_id: &str, status: &str) -> String {
        format!(
            r#"{{"liveData":[{{"id":"{ride_id}","name":"Ride {ride_id}","entityType":"ATTRACTION","status":"{status}","lastUpdated":"2025-06-01T17:04:00Z"}}]}}"#
        )
    }

    fn park(id: &str, name: &str) -> ParkConfig {
        ParkConfig {
            id: id.to_string(),
            name: name.to_string(),
            timezone: None,
            visible: true,
        }
    }

    /// Notifier that records every delivered notification.
    struct RecordingNotifier {
        delivered: StdMutex<Vec<(String, RideStatusKind)>>,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: StdMutex::new(Vec::new()),
            })
        }

        fn delivered(&self) -> Vec<(String, RideStatusKind)> {
            self.delivered.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(
            &self,
            ride_name: &str,
            new_status: RideStatusKind,
            _ride_id: &str,
            _park_name: &str,
        ) -> Result<(), notify::NotifyError> {
            self.delivered
                .lock()
                .unwrap()
                .push((ride_name.to_string(), new_status));
            Ok(())
        }
    }

    /// Notifier whose delivery always fails, counting the attempts.
    struct FailingNotifier {
        attempts: StdMutex<u32>,
    }

    impl FailingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                attempts: StdMutex::new(0),
            })
        }

        fn attempts(&self) -> u32 {
            *self.attempts.lock().unwrap()
        }
    }

    impl Notifier for FailingNotifier {
        fn notify(
            &self,
            _ride_name: &str,
            _new_status: RideStatusKind,
            _ride_id: &str,
            _park_name: &str,
        ) -> Result<(), notify::NotifyError> {
            *self.attempts.lock().unwrap() += 1;
            Err(notify::NotifyError::DeliveryFailed(
                "banner service unavailable".to_string(),
            ))
        }
    }

    async fn engine_with(
        client: MockClient,
        parks: Vec<ParkConfig>,
        notifier: Arc<dyn Notifier>,
    ) -> (Arc<SyncManager<MockClient>>, Arc<FavoritesStore>) {
        let favorites = Arc::new(FavoritesStore::load(test_pool().await).await.unwrap());
        let engine = Arc::new(SyncManager::new(
            client,
            parks,
            favorites.clone(),
            notifier,
            SyncConfig::default(),
        ));
        (engine, favorites)
    }

    const CYCLE_DEADLINE: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn first_poll_bootstraps_without_notifications() {
        let client = MockClient::new().script("p1", vec![ok(&live_payload("a", "OPERATING"))]);
        let notifier = RecordingNotifier::new();
        let (engine, favorites) = engine_with(client, vec![park("p1", "Park One")], notifier.clone()).await;
        favorites.toggle_park("p1").await.unwrap();
        favorites.set_chatty(true).await.unwrap();

        assert!(engine.run_once(CYCLE_DEADLINE).await);

        let entry = engine.store().snapshot("p1").await.unwrap();
        assert_eq!(entry.rides.len(), 1);
        assert!(engine.recent_transitions().await.is_empty());
        assert!(notifier.delivered().is_empty());
        assert!(engine.last_updated().await.is_some());
    }

    #[tokio::test]
    async fn transition_is_recorded_but_gated_without_favorite_or_chatty() {
        let client = MockClient::new().script(
            "p1",
            vec![
                ok(&live_payload("a", "OPERATING")),
                ok(&live_payload("a", "DOWN")),
            ],
        );
        let notifier = RecordingNotifier::new();
        let (engine, favorites) = engine_with(client, vec![park("p1", "Park One")], notifier.clone()).await;
        favorites.toggle_park("p1").await.unwrap();

        assert!(engine.run_once(CYCLE_DEADLINE).await);
        assert!(engine.run_once(CYCLE_DEADLINE).await);

        let transitions = engine.recent_transitions().await;
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].ride_id, "a");
        assert_eq!(transitions[0].old_status, Some(RideStatusKind::Operating));
        assert_eq!(transitions[0].new_status, RideStatusKind::Down);
        assert!(!transitions[0].notified);
        assert!(notifier.delivered().is_empty());
    }

    #[tokio::test]
    async fn chatty_widens_gating_to_unfavorited_rides() {
        let client = MockClient::new().script(
            "p1",
            vec![
                ok(&live_payload("a", "OPERATING")),
                ok(&live_payload("a", "DOWN")),
            ],
        );
        let notifier = RecordingNotifier::new();
        let (engine, favorites) = engine_with(client, vec![park("p1", "Park One")], notifier.clone()).await;
        favorites.toggle_park("p1").await.unwrap();
        favorites.set_chatty(true).await.unwrap();

        assert!(engine.run_once(CYCLE_DEADLINE).await);
        assert!(engine.run_once(CYCLE_DEADLINE).await);

        assert_eq!(
            notifier.delivered(),
            vec![("Ride a".to_string(), RideStatusKind::Down)]
        );
        let transitions = engine.recent_transitions().await;
        assert_eq!(transitions.len(), 1);
        assert!(transitions[0].notified);
    }

    #[tokio::test]
    async fn unfavorited_park_never_notifies_even_when_chatty() {
        let client = MockClient::new().script(
            "p1",
            vec![
                ok(&live_payload("a", "OPERATING")),
                ok(&live_payload("a", "DOWN")),
            ],
        );
        let notifier = RecordingNotifier::new();
        let (engine, favorites) = engine_with(client, vec![park("p1", "Park One")], notifier.clone()).await;
        favorites.set_chatty(true).await.unwrap();

        assert!(engine.run_once(CYCLE_DEADLINE).await);
        assert!(engine.run_once(CYCLE_DEADLINE).await);

        assert!(notifier.delivered().is_empty());
        assert_eq!(engine.recent_transitions().await.len(), 1);
    }

    #[tokio::test]
    async fn favorite_toggle_applies_to_the_next_cycle() {
        let client = MockClient::new().script(
            "p1",
            vec![
                ok(&live_payload("a", "OPERATING")),
                ok(&live_payload("a", "DOWN")),
                ok(&live_payload("a", "OPERATING")),
            ],
        );
        let notifier = RecordingNotifier::new();
        let (engine, favorites) = engine_with(client, vec![park("p1", "Park One")], notifier.clone()).await;
        favorites.toggle_park("p1").await.unwrap();

        assert!(engine.run_once(CYCLE_DEADLINE).await);
        assert!(engine.run_once(CYCLE_DEADLINE).await);
        // The OPERATING -> DOWN transition happened before the favorite
        assert!(notifier.delivered().is_empty());

        favorites.toggle_ride("a").await.unwrap();
        assert!(engine.run_once(CYCLE_DEADLINE).await);

        assert_eq!(
            notifier.delivered(),
            vec![("Ride a".to_string(), RideStatusKind::Operating)]
        );
        // The earlier transition record is untouched by the toggle
        let transitions = engine.recent_transitions().await;
        assert_eq!(transitions.len(), 2);
        assert!(!transitions[0].notified);
        assert!(transitions[1].notified);

        // The stored snapshot now reflects the favorite
        let entry = engine.store().snapshot("p1").await.unwrap();
        assert!(entry.rides[0].is_favorited);
    }

    #[tokio::test]
    async fn failed_delivery_is_swallowed_and_never_retried() {
        let client = MockClient::new().script(
            "p1",
            vec![
                ok(&live_payload("a", "OPERATING")),
                ok(&live_payload("a", "DOWN")),
                ok(&live_payload("a", "DOWN")),
            ],
        );
        let notifier = FailingNotifier::new();
        let (engine, favorites) = engine_with(client, vec![park("p1", "Park One")], notifier.clone()).await;
        favorites.toggle_park("p1").await.unwrap();
        favorites.set_chatty(true).await.unwrap();

        assert!(engine.run_once(CYCLE_DEADLINE).await);
        assert!(engine.run_once(CYCLE_DEADLINE).await);

        // The cycle completed despite the delivery failure and the
        // transition was still recorded, marked undelivered
        assert_eq!(notifier.attempts(), 1);
        let transitions = engine.recent_transitions().await;
        assert_eq!(transitions.len(), 1);
        assert!(!transitions[0].notified);
        assert_eq!(
            engine.store().snapshot("p1").await.unwrap().rides[0].status,
            RideStatusKind::Down
        );

        // The status is unchanged next cycle: no transition, no redelivery
        assert!(engine.run_once(CYCLE_DEADLINE).await);
        assert_eq!(notifier.attempts(), 1);
        assert_eq!(engine.recent_transitions().await.len(), 1);
    }

    #[tokio::test]
    async fn slow_park_does_not_block_the_fast_one() {
        let client = MockClient::new()
            .script(
                "slow",
                vec![ok_after(
                    Duration::from_secs(2),
                    &live_payload("s", "OPERATING"),
                )],
            )
            .script("fast", vec![ok(&live_payload("f", "OPERATING"))]);
        let notifier = RecordingNotifier::new();
        let (engine, _) = engine_with(
            client,
            vec![park("slow", "Slow Park"), park("fast", "Fast Park")],
            notifier,
        )
        .await;

        let all_completed = engine.run_once(Duration::from_millis(300)).await;

        assert!(!all_completed);
        assert!(engine.store().snapshot("fast").await.is_some());
        assert!(engine.store().snapshot("slow").await.is_none());
    }

    #[tokio::test]
    async fn failures_are_contained_per_park() {
        let client = MockClient::new()
            .script("bad", vec![ok("this is not json")])
            .script("good", vec![ok(&live_payload("g", "OPERATING"))]);
        let notifier = RecordingNotifier::new();
        let (engine, _) = engine_with(
            client,
            vec![park("bad", "Bad Park"), park("good", "Good Park")],
            notifier,
        )
        .await;

        assert!(engine.run_once(CYCLE_DEADLINE).await);

        let bad = engine.store().snapshot("bad").await.unwrap();
        assert!(bad.fetch_failed);
        assert!(bad.rides.is_empty());

        let good = engine.store().snapshot("good").await.unwrap();
        assert!(!good.fetch_failed);
        assert_eq!(good.rides.len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_stale_data_visible() {
        let client = MockClient::new().script(
            "p1",
            vec![ok(&live_payload("a", "OPERATING")), failed()],
        );
        let notifier = RecordingNotifier::new();
        let (engine, _) = engine_with(client, vec![park("p1", "Park One")], notifier).await;

        assert!(engine.run_once(CYCLE_DEADLINE).await);
        assert!(engine.run_once(CYCLE_DEADLINE).await);

        let entry = engine.store().snapshot("p1").await.unwrap();
        assert!(entry.fetch_failed);
        // The previous cycle's data is still there
        assert_eq!(entry.rides.len(), 1);
        assert!(engine.recent_transitions().await.is_empty());
    }

    #[tokio::test]
    async fn overlapping_cycles_skip_parks_still_in_flight() {
        let client = MockClient::new().script(
            "p1",
            vec![
                ok_after(Duration::from_millis(300), &live_payload("a", "OPERATING")),
                ok(&live_payload("a", "DOWN")),
            ],
        );
        let notifier = RecordingNotifier::new();
        let (engine, _) = engine_with(client, vec![park("p1", "Park One")], notifier).await;

        // Two cycles at once: the second must skip the park rather than run
        // a concurrent pipeline for it
        let (first, second) = tokio::join!(
            engine.run_once(CYCLE_DEADLINE),
            engine.run_once(CYCLE_DEADLINE)
        );
        assert!(first && second);

        // Only the bootstrap poll ran, so no transition was detected
        assert!(engine.recent_transitions().await.is_empty());
        let entry = engine.store().snapshot("p1").await.unwrap();
        assert_eq!(entry.rides[0].status, RideStatusKind::Operating);
    }

    #[tokio::test]
    async fn snapshot_updates_are_broadcast_after_replace() {
        let client = MockClient::new().script("p1", vec![ok(&live_payload("a", "OPERATING"))]);
        let notifier = RecordingNotifier::new();
        let (engine, _) = engine_with(client, vec![park("p1", "Park One")], notifier).await;

        let mut rx = engine.updates_sender().subscribe();
        assert!(engine.run_once(CYCLE_DEADLINE).await);

        let update = rx.recv().await.unwrap();
        assert_eq!(update.park_id, "p1");
    }

    #[tokio::test]
    async fn start_and_stop_flip_the_polling_state() {
        let client = MockClient::new();
        let notifier = RecordingNotifier::new();
        let (engine, _) = engine_with(client, vec![park("p1", "Park One")], notifier).await;

        assert!(!engine.is_polling().await);
        engine.start().await;
        assert!(engine.is_polling().await);
        engine.stop().await;
        assert!(!engine.is_polling().await);
        // Stopping twice is harmless
        engine.stop().await;
    }

    #[tokio::test]
    async fn lifecycle_foreground_polls_immediately_and_background_stops() {
        let client = MockClient::new().script("p1", vec![ok(&live_payload("a", "OPERATING"))]);
        let notifier = RecordingNotifier::new();
        let (engine, _) = engine_with(client, vec![park("p1", "Park One")], notifier).await;
        let lifecycle = Lifecycle::new(engine.clone());

        assert_eq!(lifecycle.phase().await, Phase::Foreground);
        lifecycle.on_enter_foreground().await;
        assert!(engine.is_polling().await);

        // The immediate refresh runs without waiting for a timer tick
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(engine.store().snapshot("p1").await.is_some());

        lifecycle.on_enter_background().await;
        assert_eq!(lifecycle.phase().await, Phase::Background);
        assert!(!engine.is_polling().await);
    }

    #[tokio::test]
    async fn background_tick_reports_incomplete_parks() {
        let client = MockClient::new().script(
            "p1",
            vec![ok_after(
                Duration::from_secs(2),
                &live_payload("a", "OPERATING"),
            )],
        );
        let notifier = RecordingNotifier::new();
        let (engine, _) = engine_with(client, vec![park("p1", "Park One")], notifier).await;
        let lifecycle = Lifecycle::new(engine.clone());

        let started = std::time::Instant::now();
        let completed = lifecycle
            .on_background_tick(Duration::from_millis(200))
            .await;

        assert!(!completed);
        // Control comes back at the deadline, not after the slow fetch
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
