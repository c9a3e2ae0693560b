//! User preference state: favorited rides/parks, the chatty-notifications
//! flag, and the selected park.
//!
//! Everything is held in memory and written through to SQLite, so the engine
//! reads favorites without touching the database on the hot path. The sets
//! are re-read fresh for every diff/gate decision; a toggle mid-cycle takes
//! effect on the very next notification decision.

use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

const SETTING_CHATTY: &str = "chatty_notifications";
const SETTING_SELECTED_PARK: &str = "selected_park";

pub struct FavoritesStore {
    pool: SqlitePool,
    rides: RwLock<HashSet<String>>,
    parks: RwLock<HashSet<String>>,
    chatty: AtomicBool,
    selected_park: RwLock<Option<String>>,
}

impl FavoritesStore {
    /// Load persisted preference state into memory.
    pub async fn load(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        let rides: HashSet<String> = sqlx::query("SELECT ride_id FROM favorite_rides")
            .fetch_all(&pool)
            .await?
            .into_iter()
            .map(|row| row.get::<String, _>("ride_id"))
            .collect();

        let parks: HashSet<String> = sqlx::query("SELECT park_id FROM favorite_parks")
            .fetch_all(&pool)
            .await?
            .into_iter()
            .map(|row| row.get::<String, _>("park_id"))
            .collect();

        let chatty = Self::read_setting(&pool, SETTING_CHATTY)
            .await?
            .map(|v| v == "true")
            .unwrap_or(false);

        let selected_park = Self::read_setting(&pool, SETTING_SELECTED_PARK).await?;

        Ok(Self {
            pool,
            rides: RwLock::new(rides),
            parks: RwLock::new(parks),
            chatty: AtomicBool::new(chatty),
            selected_park: RwLock::new(selected_park),
        })
    }

    async fn read_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn write_setting(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Toggle a ride's favorite state; returns the new state.
    pub async fn toggle_ride(&self, ride_id: &str) -> Result<bool, sqlx::Error> {
        let mut rides = self.rides.write().await;
        let now_favorited = if rides.remove(ride_id) {
            sqlx::query("DELETE FROM favorite_rides WHERE ride_id = ?")
                .bind(ride_id)
                .execute(&self.pool)
                .await?;
            false
        } else {
            rides.insert(ride_id.to_string());
            sqlx::query("INSERT OR IGNORE INTO favorite_rides (ride_id) VALUES (?)")
                .bind(ride_id)
                .execute(&self.pool)
                .await?;
            true
        };
        Ok(now_favorited)
    }

    /// Toggle a park's favorite state; returns the new state.
    pub async fn toggle_park(&self, park_id: &str) -> Result<bool, sqlx::Error> {
        let mut parks = self.parks.write().await;
        let now_favorited = if parks.remove(park_id) {
            sqlx::query("DELETE FROM favorite_parks WHERE park_id = ?")
                .bind(park_id)
                .execute(&self.pool)
                .await?;
            false
        } else {
            parks.insert(park_id.to_string());
            sqlx::query("INSERT OR IGNORE INTO favorite_parks (park_id) VALUES (?)")
                .bind(park_id)
                .execute(&self.pool)
                .await?;
            true
        };
        Ok(now_favorited)
    }

    pub async fn is_ride_favorited(&self, ride_id: &str) -> bool {
        self.rides.read().await.contains(ride_id)
    }

    pub async fn is_park_favorited(&self, park_id: &str) -> bool {
        self.parks.read().await.contains(park_id)
    }

    /// Fresh copy of the favorited ride id set, taken at diff time.
    pub async fn ride_ids(&self) -> HashSet<String> {
        self.rides.read().await.clone()
    }

    pub fn chatty(&self) -> bool {
        self.chatty.load(Ordering::Relaxed)
    }

    pub async fn set_chatty(&self, enabled: bool) -> Result<(), sqlx::Error> {
        self.chatty.store(enabled, Ordering::Relaxed);
        self.write_setting(SETTING_CHATTY, if enabled { "true" } else { "false" })
            .await
    }

    pub async fn selected_park(&self) -> Option<String> {
        self.selected_park.read().await.clone()
    }

    pub async fn select_park(&self, park_id: &str) -> Result<(), sqlx::Error> {
        {
            let mut selected = self.selected_park.write().await;
            *selected = Some(park_id.to_string());
        }
        self.write_setting(SETTING_SELECTED_PARK, park_id).await
    }
}
