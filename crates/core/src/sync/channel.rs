//! Transports for change notifications between catalog contexts.
//!
//! A channel retains only the most recent notification. Subscribers see every
//! notification published after they subscribed, including their own; origin
//! filtering is left to the caller. A transport that cannot tell which
//! notifications it missed delivers [`ChannelEvent::Resync`] instead.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_rusqlite::{params, rusqlite};

use crate::Error;
use crate::cache::CacheDb;
use crate::model::ChangeNotification;

/// Buffered notifications per subscriber before it lags.
pub const CHANNEL_CAPACITY: usize = 64;

/// What a channel subscriber receives.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Change(ChangeNotification),
    /// One or more notifications were lost; every entity type is stale.
    Resync,
}

impl ChannelEvent {
    pub fn notification(&self) -> Option<&ChangeNotification> {
        match self {
            Self::Change(notification) => Some(notification),
            Self::Resync => None,
        }
    }
}

/// Shared pub/sub medium for [`ChangeNotification`]s.
#[async_trait]
pub trait ChangeChannel: Send + Sync {
    /// Publish a notification to every subscriber, replacing the retained one.
    async fn publish(&self, notification: &ChangeNotification) -> Result<(), Error>;

    /// The most recently published notification, if any.
    async fn latest(&self) -> Result<Option<ChangeNotification>, Error>;

    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent>;
}

/// In-process channel backed by a tokio broadcast.
#[derive(Debug)]
pub struct MemoryChannel {
    sender: broadcast::Sender<ChannelEvent>,
    latest: RwLock<Option<ChangeNotification>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, latest: RwLock::new(None) }
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangeChannel for MemoryChannel {
    async fn publish(&self, notification: &ChangeNotification) -> Result<(), Error> {
        *self.latest.write().await = Some(notification.clone());
        // No receivers is not a failure.
        let _ = self.sender.send(ChannelEvent::Change(notification.clone()));
        Ok(())
    }

    async fn latest(&self) -> Result<Option<ChangeNotification>, Error> {
        Ok(self.latest.read().await.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.sender.subscribe()
    }
}

/// Cross-process channel over the `change_channel` table.
///
/// Every process opening the same database file shares one slot. Publishing
/// bumps the slot's sequence number; a background poller forwards each new
/// sequence to local subscribers. When the sequence moved by more than one
/// between polls, or went backwards, the overwritten notifications are gone
/// and subscribers get [`ChannelEvent::Resync`].
#[derive(Debug)]
pub struct SqliteChannel {
    db: CacheDb,
    sender: broadcast::Sender<ChannelEvent>,
    poller: JoinHandle<()>,
}

impl SqliteChannel {
    /// Start polling `db` every `poll_interval`.
    ///
    /// The notification already in the slot when polling starts is not
    /// replayed.
    pub async fn start(db: CacheDb, poll_interval: Duration) -> Result<Self, Error> {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let initial = read_slot(&db).await?.map(|(seq, _)| seq).unwrap_or(0);

        let poller = tokio::spawn(poll_slot(db.clone(), sender.clone(), poll_interval, initial));
        tracing::debug!("change channel polling every {:?} from seq {}", poll_interval, initial);

        Ok(Self { db, sender, poller })
    }
}

impl Drop for SqliteChannel {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

#[async_trait]
impl ChangeChannel for SqliteChannel {
    async fn publish(&self, notification: &ChangeNotification) -> Result<(), Error> {
        let body = serde_json::to_string(notification)?;
        let published_at = notification.timestamp.to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO change_channel (slot, seq, body, published_at)
                    VALUES (1, 1, ?1, ?2)
                    ON CONFLICT(slot) DO UPDATE SET
                        seq = change_channel.seq + 1,
                        body = excluded.body,
                        published_at = excluded.published_at",
                    params![body, published_at],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| Error::Channel(Error::from(e).to_string()))
    }

    async fn latest(&self) -> Result<Option<ChangeNotification>, Error> {
        match read_slot(&self.db).await? {
            Some((_, body)) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.sender.subscribe()
    }
}

async fn read_slot(db: &CacheDb) -> Result<Option<(i64, String)>, Error> {
    db.conn
        .call(|conn| -> Result<Option<(i64, String)>, Error> {
            let result = conn.query_row("SELECT seq, body FROM change_channel WHERE slot = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            });

            match result {
                Ok(slot) => Ok(Some(slot)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(Error::from)
}

async fn poll_slot(
    db: CacheDb, sender: broadcast::Sender<ChannelEvent>, poll_interval: Duration, mut last_seq: i64,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let (seq, body) = match read_slot(&db).await {
            Ok(Some(slot)) => slot,
            Ok(None) => continue,
            Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed)) => {
                tracing::debug!("change channel database closed, stopping poller");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read change channel");
                continue;
            }
        };

        if seq == last_seq {
            continue;
        }
        let contiguous = seq == last_seq + 1;
        let previous = last_seq;
        last_seq = seq;

        if !contiguous {
            tracing::warn!(previous, seq, "change channel skipped notifications, requesting resync");
            let _ = sender.send(ChannelEvent::Resync);
            continue;
        }

        match serde_json::from_str::<ChangeNotification>(&body) {
            Ok(notification) => {
                let _ = sender.send(ChannelEvent::Change(notification));
            }
            Err(e) => tracing::warn!(seq, error = %e, "skipping malformed change notification"),
        }
    }
}
