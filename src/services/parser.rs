//! Conversion of raw live-status payloads into canonical [`RideStatus`]
//! records.
//!
//! Parsing is deliberately lenient at the entry level: an entry missing a
//! required field is dropped with a debug log, never failing the batch. Only
//! a payload whose top-level shape is wrong surfaces an error, and the caller
//! treats that as "this park does not update this cycle".

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::models::{RideStatus, RideStatusKind};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

// Wire format of GET /entity/{id}/live. Every entry field is optional here;
// validation happens in parse_live so one bad entry cannot sink the batch.

#[derive(Debug, Deserialize)]
struct LiveResponse {
    #[serde(rename = "liveData")]
    live_data: Option<Vec<LiveEntity>>,
}

#[derive(Debug, Deserialize)]
struct LiveEntity {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "entityType")]
    entity_type: Option<String>,
    status: Option<String>,
    #[serde(rename = "lastUpdated")]
    last_updated: Option<String>,
    queue: Option<LiveQueue>,
}

#[derive(Debug, Deserialize)]
struct LiveQueue {
    #[serde(rename = "STANDBY")]
    standby: Option<StandbyQueue>,
}

#[derive(Debug, Deserialize)]
struct StandbyQueue {
    #[serde(rename = "waitTime")]
    wait_time: Option<i64>,
}

/// Parse a raw live-status payload into ride records for one park.
///
/// Keeps attraction-type entries only. Duplicate ids are last-write-wins,
/// preserving the position of the first occurrence. Wait time is taken from
/// `queue.STANDBY.waitTime` and only while the ride is operating.
pub fn parse_live(payload: &str, park_id: &str) -> Result<Vec<RideStatus>, ParseError> {
    let response: LiveResponse =
        serde_json::from_str(payload).map_err(|e| ParseError::MalformedPayload(e.to_string()))?;

    let entities = response
        .live_data
        .ok_or(ParseError::MissingField("liveData"))?;

    let mut rides: Vec<RideStatus> = Vec::new();
    let mut index_by_id: std::collections::HashMap<String, usize> =
        std::collections::HashMap::new();

    for entity in entities {
        if entity.entity_type.as_deref() != Some("ATTRACTION") {
            continue;
        }

        let (Some(id), Some(name), Some(status_str), Some(last_updated_str)) = (
            entity.id,
            entity.name,
            entity.status,
            entity.last_updated,
        ) else {
            tracing::debug!(park = park_id, "dropping live entry with missing fields");
            continue;
        };

        let last_updated: DateTime<Utc> = match DateTime::parse_from_rfc3339(&last_updated_str) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                tracing::debug!(
                    park = park_id,
                    ride = %id,
                    error = %e,
                    "dropping live entry with unparseable lastUpdated"
                );
                continue;
            }
        };

        let status = RideStatusKind::from_api(&status_str);

        // Wait minutes are never populated for non-operating statuses.
        let wait_minutes = if status == RideStatusKind::Operating {
            entity
                .queue
                .and_then(|q| q.standby)
                .and_then(|s| s.wait_time)
                .filter(|w| *w >= 0)
                .map(|w| w as u32)
        } else {
            None
        };

        let ride = RideStatus {
            id: id.clone(),
            park_id: park_id.to_string(),
            name,
            status,
            wait_minutes,
            last_updated,
            is_favorited: false,
        };

        match index_by_id.get(&id) {
            Some(&i) => rides[i] = ride,
            None => {
                index_by_id.insert(id, rides.len());
                rides.push(ride);
            }
        }
    }

    Ok(rides)
}
