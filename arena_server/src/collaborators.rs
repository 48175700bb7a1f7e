//! Capability sets for the collaborators this crate consumes but does not
//! implement (spec.md §6): persistent user/match storage, the snapshot
//! cache, and the outbound duplex channel. Production implementations
//! (HTTP/DB-backed) live outside this crate's scope; the in-memory fakes
//! here are what the test suite drives `Match`/`SessionRouter` with.

use crate::snapshot::MatchStorage;
use arena_protocol::ids::{MatchId, UserId};
use arena_protocol::messages::OutboundMessage;
use arena_protocol::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct UserRecord {
    pub color: String,
    pub name: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: UserId) -> Option<UserRecord>;
    async fn update(&self, id: UserId, record: UserRecord) -> Result<(), Error>;
    async fn extend_session(&self, id: UserId, minutes: u64) -> Result<(), Error>;
    async fn exists(&self, id: UserId) -> bool;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_by_id(&self, id: MatchId) -> Option<()>;
    async fn create(&self, id: MatchId) -> Result<(), Error>;
    async fn remove(&self, id: MatchId) -> Result<(), Error>;
    async fn extend_session(&self, id: MatchId, minutes: u64) -> Result<(), Error>;
    async fn exists(&self, id: MatchId) -> bool;
}

#[async_trait]
pub trait MatchSnapshotCache: Send + Sync {
    async fn save(&self, id: MatchId, storage: MatchStorage) -> Result<(), Error>;
    async fn get(&self, id: MatchId) -> Option<MatchStorage>;
    async fn remove(&self, id: MatchId) -> Result<(), Error>;
}

/// The "duplex message channel" a connected user is reached through.
/// Production backs this with a `tokio::sync::mpsc::UnboundedSender` the
/// transport layer (out of scope) drains into the real socket.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    fn send(&self, message: OutboundMessage) -> Result<(), Error>;
    async fn send_async(&self, message: OutboundMessage) -> Result<(), Error> {
        self.send(message)
    }
}

// ---------------------------------------------------------------------
// In-memory fakes, used by tests
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct FakeUserStore {
    records: Mutex<HashMap<UserId, UserRecord>>,
}

#[async_trait]
impl UserStore for FakeUserStore {
    async fn get_by_id(&self, id: UserId) -> Option<UserRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    async fn update(&self, id: UserId, record: UserRecord) -> Result<(), Error> {
        self.records.lock().unwrap().insert(id, record);
        Ok(())
    }

    async fn extend_session(&self, _id: UserId, _minutes: u64) -> Result<(), Error> {
        Ok(())
    }

    async fn exists(&self, id: UserId) -> bool {
        self.records.lock().unwrap().contains_key(&id)
    }
}

#[derive(Default)]
pub struct FakeMatchStore {
    ids: Mutex<Vec<MatchId>>,
}

#[async_trait]
impl MatchStore for FakeMatchStore {
    async fn get_by_id(&self, id: MatchId) -> Option<()> {
        self.ids.lock().unwrap().contains(&id).then_some(())
    }

    async fn create(&self, id: MatchId) -> Result<(), Error> {
        self.ids.lock().unwrap().push(id);
        Ok(())
    }

    async fn remove(&self, id: MatchId) -> Result<(), Error> {
        self.ids.lock().unwrap().retain(|existing| *existing != id);
        Ok(())
    }

    async fn extend_session(&self, _id: MatchId, _minutes: u64) -> Result<(), Error> {
        Ok(())
    }

    async fn exists(&self, id: MatchId) -> bool {
        self.ids.lock().unwrap().contains(&id)
    }
}

#[derive(Default)]
pub struct FakeSnapshotCache {
    saved: Mutex<HashMap<MatchId, MatchStorage>>,
}

#[async_trait]
impl MatchSnapshotCache for FakeSnapshotCache {
    async fn save(&self, id: MatchId, storage: MatchStorage) -> Result<(), Error> {
        self.saved.lock().unwrap().insert(id, storage);
        Ok(())
    }

    async fn get(&self, id: MatchId) -> Option<MatchStorage> {
        self.saved.lock().unwrap().get(&id).cloned()
    }

    async fn remove(&self, id: MatchId) -> Result<(), Error> {
        self.saved.lock().unwrap().remove(&id);
        Ok(())
    }
}

/// Records every envelope sent to it instead of touching a real socket.
#[derive(Default)]
pub struct FakeOutboundChannel {
    pub sent: Mutex<Vec<OutboundMessage>>,
    pub closed: Mutex<bool>,
}

impl OutboundChannel for FakeOutboundChannel {
    fn send(&self, message: OutboundMessage) -> Result<(), Error> {
        if *self.closed.lock().unwrap() {
            return Err(Error::ChannelClosed);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_user_store_round_trips() {
        let store = FakeUserStore::default();
        let id = UserId(uuid::Uuid::new_v4());
        assert!(!store.exists(id).await);
        store
            .update(
                id,
                UserRecord {
                    color: "red".into(),
                    name: "alice".into(),
                },
            )
            .await
            .unwrap();
        assert!(store.exists(id).await);
        assert_eq!(store.get_by_id(id).await.unwrap().color, "red");
    }

    #[test]
    fn fake_outbound_channel_rejects_after_close() {
        let channel = FakeOutboundChannel::default();
        *channel.closed.lock().unwrap() = true;
        let msg = OutboundMessage::Paused(arena_protocol::messages::PausedPayload { paused: true });
        assert!(matches!(channel.send(msg), Err(Error::ChannelClosed)));
    }
}
