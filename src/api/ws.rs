use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};

use crate::api::Engine;
use crate::models::RideStatus;
use crate::providers::themeparks::{FetchLog, FetchLogSender};

#[derive(Clone)]
pub struct WsState {
    pub engine: Arc<Engine>,
}

/// Client subscription message
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ClientMessage {
    /// Subscribe to specific parks
    Subscribe { park_ids: Vec<String> },
}

/// Server message sent to clients
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum ServerMessage {
    /// Initial connection acknowledgment
    Connected { message: String },
    /// Full snapshots (sent on subscribe)
    Parks { parks: Vec<ParkSnapshot> },
    /// One park's snapshot after a completed poll
    ParkUpdate { park: ParkSnapshot },
}

#[derive(Debug, Clone, Serialize)]
struct ParkSnapshot {
    park_id: String,
    last_synced: Option<String>,
    fetch_failed: bool,
    rides: Vec<RideStatus>,
}

async fn build_park_snapshot(engine: &Engine, park_id: &str) -> Option<ParkSnapshot> {
    let entry = engine.store().snapshot(park_id).await?;
    Some(ParkSnapshot {
        park_id: park_id.to_string(),
        last_synced: entry.last_synced.map(|t| t.to_rfc3339()),
        fetch_failed: entry.fetch_failed,
        rides: entry.rides,
    })
}

/// WebSocket endpoint for ride status updates
pub async fn ws_updates(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates_rx = state.engine.updates_sender().subscribe();
    let mut subscribed_parks: HashSet<String> = HashSet::new();

    // Send connected message
    let connected_msg = ServerMessage::Connected {
        message: "Connected to ride status updates. Send subscribe message with park_ids."
            .to_string(),
    };
    if let Ok(json) = serde_json::to_string(&connected_msg) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // Channel to communicate subscriptions from receiver task to sender task
    let (sub_tx, mut sub_rx) = tokio::sync::mpsc::channel::<Vec<String>>(16);

    let engine = state.engine.clone();

    // Spawn task to forward broadcast updates to WebSocket
    let forward_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                // Handle subscription updates
                Some(park_ids) = sub_rx.recv() => {
                    subscribed_parks = park_ids.into_iter().collect();

                    // Send full snapshots for the newly subscribed parks
                    let mut parks = Vec::new();
                    for park_id in &subscribed_parks {
                        if let Some(snapshot) = build_park_snapshot(&engine, park_id).await {
                            parks.push(snapshot);
                        }
                    }
                    let msg = ServerMessage::Parks { parks };
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
                // Handle broadcast updates
                result = updates_rx.recv() => {
                    match result {
                        Ok(update) => {
                            if !subscribed_parks.contains(&update.park_id) {
                                continue;
                            }
                            if let Some(snapshot) = build_park_snapshot(&engine, &update.park_id).await {
                                let msg = ServerMessage::ParkUpdate { park: snapshot };
                                if let Ok(json) = serde_json::to_string(&msg) {
                                    if sender.send(Message::Text(json.into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }
    });

    // Handle incoming messages from client
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) {
                    match client_msg {
                        ClientMessage::Subscribe { park_ids } => {
                            let _ = sub_tx.send(park_ids).await;
                        }
                    }
                }
            }
            Ok(Message::Ping(_)) => {
                // Axum handles pong automatically
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    // Cleanup
    forward_task.abort();
}

// ============================================================================
// Fetch diagnostics WebSocket
// ============================================================================

/// How far back the diagnostics summary looks. Long enough to cover several
/// poll cycles at the default 60s interval.
const DIAGNOSTICS_WINDOW: Duration = Duration::from_secs(300);
const DIAGNOSTICS_PUSH_INTERVAL: Duration = Duration::from_secs(2);

/// One observed status API request, kept for the retention window
struct FetchSample {
    at: Instant,
    park_id: String,
    duration_ms: u64,
    failed: bool,
}

/// Retained fetch history; samples older than the window are pruned on
/// every access.
#[derive(Default)]
struct FetchHistory {
    samples: VecDeque<FetchSample>,
}

/// Per-park counters within the window
#[derive(Debug, Serialize)]
struct ParkFetchStats {
    polls: u32,
    failures: u32,
    avg_duration_ms: f64,
}

/// Server message for fetch diagnostics
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum DiagnosticsServerMessage {
    /// Periodic fetch summary, grouped by park
    Summary {
        window_secs: u64,
        polls: u32,
        failures: u32,
        parks: BTreeMap<String, ParkFetchStats>,
    },
}

impl FetchHistory {
    fn observe(&mut self, log: &FetchLog) {
        self.samples.push_back(FetchSample {
            at: Instant::now(),
            park_id: log.entity_id.clone(),
            duration_ms: log.duration_ms,
            failed: log.error.is_some(),
        });
        self.prune();
    }

    fn prune(&mut self) {
        while let Some(sample) = self.samples.front() {
            if sample.at.elapsed() > DIAGNOSTICS_WINDOW {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn summarize(&mut self) -> DiagnosticsServerMessage {
        self.prune();

        // (polls, failures, duration sum) per park
        let mut totals: BTreeMap<String, (u32, u32, u64)> = BTreeMap::new();
        for sample in &self.samples {
            let entry = totals.entry(sample.park_id.clone()).or_default();
            entry.0 += 1;
            if sample.failed {
                entry.1 += 1;
            }
            entry.2 += sample.duration_ms;
        }

        let polls = self.samples.len() as u32;
        let failures = self.samples.iter().filter(|s| s.failed).count() as u32;
        let parks = totals
            .into_iter()
            .map(|(park_id, (polls, failures, duration_sum))| {
                let stats = ParkFetchStats {
                    polls,
                    failures,
                    avg_duration_ms: duration_sum as f64 / polls as f64,
                };
                (park_id, stats)
            })
            .collect();

        DiagnosticsServerMessage::Summary {
            window_secs: DIAGNOSTICS_WINDOW.as_secs(),
            polls,
            failures,
            parks,
        }
    }
}

/// Shared fetch history behind the diagnostics WebSocket, fed from the
/// client's request log broadcast.
#[derive(Clone)]
pub struct DiagnosticsState {
    history: Arc<RwLock<FetchHistory>>,
}

impl DiagnosticsState {
    pub fn new(fetch_logs_tx: FetchLogSender) -> Self {
        let history = Arc::new(RwLock::new(FetchHistory::default()));

        let collector = history.clone();
        let mut rx = fetch_logs_tx.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(log) => collector.write().await.observe(&log),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        });

        Self { history }
    }
}

/// WebSocket endpoint for fetch diagnostics
pub async fn ws_diagnostics(
    ws: WebSocketUpgrade,
    State(state): State<DiagnosticsState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_diagnostics_socket(socket, state))
}

async fn handle_diagnostics_socket(socket: WebSocket, state: DiagnosticsState) {
    let (mut sender, mut receiver) = socket.split();

    let history = state.history.clone();
    let push_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(DIAGNOSTICS_PUSH_INTERVAL);
        loop {
            ticker.tick().await;
            let summary = history.write().await.summarize();
            match serde_json::to_string(&summary) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    // The diagnostics socket takes no client messages; wait for the close
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    push_task.abort();
}
