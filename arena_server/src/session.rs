//! Routes inbound wire messages to the match a user is currently seated in,
//! and fans a match's events out to its two connected sockets (spec.md §6,
//! "Session routing"). Connection/reconnection and match lifetime are kept
//! here rather than on `Match` itself, so `Match` never needs to know
//! whether a socket reconnected or simply stayed open the whole time.

use crate::board::Level;
use crate::collaborators::{MatchSnapshotCache, MatchStore, OutboundChannel, UserStore};
use crate::config::Config;
use crate::match_engine::{self, empty_channel_slot, ChannelSlot, MatchHandle, PlayerMessage, PlayerOp};
use arena_protocol::ids::{MatchId, UserId};
use arena_protocol::messages::InboundMessage;
use arena_protocol::Error;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// How long an activity-extending message pushes a user's/match's
/// persisted session out by. Spec.md leaves the exact figure to the
/// collaborator's own policy; this is this crate's request.
const SESSION_EXTENSION_MINUTES: u64 = 5;

fn to_player_message(inbound: InboundMessage) -> PlayerMessage {
    match inbound {
        InboundMessage::Movement(dir) => PlayerMessage::Op(PlayerOp::Move(dir)),
        InboundMessage::Rotate(dir) => PlayerMessage::Op(PlayerOp::Rotate(dir)),
        InboundMessage::ExecPower => PlayerMessage::Op(PlayerOp::ExecPower),
        InboundMessage::SetColor(color) => PlayerMessage::SetColor(color),
        InboundMessage::Pause => PlayerMessage::Op(PlayerOp::Pause),
        InboundMessage::Resume => PlayerMessage::Op(PlayerOp::Resume),
        InboundMessage::UpdateAll => PlayerMessage::Op(PlayerOp::UpdateAll),
    }
}

pub struct SessionRouter {
    channels: RwLock<HashMap<UserId, ChannelSlot>>,
    assignments: RwLock<HashMap<UserId, MatchId>>,
    matches: RwLock<HashMap<MatchId, MatchHandle>>,
    /// Host/guest pairing per match, kept around after the loop task itself
    /// is gone so a snapshot can be rebuilt into the right two seats
    /// (`register_connection`'s restore-on-miss path).
    rosters: RwLock<HashMap<MatchId, (UserId, UserId)>>,
    user_store: Arc<dyn UserStore>,
    match_store: Arc<dyn MatchStore>,
    snapshot_cache: Arc<dyn MatchSnapshotCache>,
    config: Config,
}

impl SessionRouter {
    pub fn new(
        user_store: Arc<dyn UserStore>,
        match_store: Arc<dyn MatchStore>,
        snapshot_cache: Arc<dyn MatchSnapshotCache>,
        config: Config,
    ) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            assignments: RwLock::new(HashMap::new()),
            matches: RwLock::new(HashMap::new()),
            rosters: RwLock::new(HashMap::new()),
            user_store,
            match_store,
            snapshot_cache,
            config,
        }
    }

    async fn channel_slot_for(&self, user_id: UserId) -> ChannelSlot {
        let mut channels = self.channels.write().await;
        channels.entry(user_id).or_insert_with(empty_channel_slot).clone()
    }

    /// `startMatch` — spawns the match task and seats both users in it.
    /// Sockets may connect to either user before or after this call.
    pub async fn start_match(
        &self,
        match_id: MatchId,
        level: &'static Level,
        host: UserId,
        guest: UserId,
    ) -> Result<(), Error> {
        self.match_store.create(match_id).await?;
        let host_channel = self.channel_slot_for(host).await;
        let guest_channel = self.channel_slot_for(guest).await;
        let handle = match_engine::spawn(
            match_id,
            level,
            host,
            guest,
            host_channel,
            guest_channel,
            self.config,
            self.user_store.clone(),
        );

        self.matches.write().await.insert(match_id, handle);
        self.rosters.write().await.insert(match_id, (host, guest));
        let mut assignments = self.assignments.write().await;
        assignments.insert(host, match_id);
        assignments.insert(guest, match_id);
        Ok(())
    }

    /// `registerConnection` — wires (or rewires, on reconnect) a user's
    /// outbound channel and immediately replays the current full state so a
    /// reconnecting client never has to guess what it missed. The `bool` it
    /// returns is `true` when this user already had a channel registered
    /// (a reconnect), `false` on a first connect (spec.md §4.6).
    pub async fn register_connection(
        &self,
        user_id: UserId,
        match_id: MatchId,
        channel: Arc<dyn OutboundChannel>,
    ) -> Result<bool, Error> {
        if !self.match_store.exists(match_id).await {
            return Err(Error::MatchNotFound(match_id));
        }
        let slot = self.channel_slot_for(user_id).await;
        let previously_connected = slot.read().await.is_some();
        *slot.write().await = Some(channel);
        self.assignments.write().await.insert(user_id, match_id);

        let handle = self.matches.read().await.get(&match_id).cloned();
        let handle = match handle {
            Some(handle) => Some(handle),
            None => self.restore_match(match_id).await?,
        };

        match handle {
            Some(handle) => handle.dispatch(user_id, PlayerMessage::Op(PlayerOp::UpdateAll))?,
            // Nothing in the snapshot cache either; the match already ended
            // and was reaped. The caller (the transport layer) is
            // responsible for surfacing end/timeout to a socket that
            // connects this late.
            None => {}
        }
        Ok(previously_connected)
    }

    /// Rebuilds a match's event loop from `snapshot_cache` and re-inserts it
    /// into `matches`, for a connection that lands after the loop task
    /// exited (crash, or the win grace period finally lapsing) but before
    /// the snapshot was evicted. Returns `None` when there is nothing to
    /// restore from.
    async fn restore_match(&self, match_id: MatchId) -> Result<Option<MatchHandle>, Error> {
        let Some(storage) = self.snapshot_cache.get(match_id).await else {
            return Ok(None);
        };
        let Some(&(host, guest)) = self.rosters.read().await.get(&match_id) else {
            return Ok(None);
        };
        let host_channel = self.channel_slot_for(host).await;
        let guest_channel = self.channel_slot_for(guest).await;
        let handle = match_engine::resume(
            match_id,
            host,
            guest,
            host_channel,
            guest_channel,
            self.config,
            storage,
            self.user_store.clone(),
        );
        self.matches.write().await.insert(match_id, handle.clone());
        Ok(Some(handle))
    }

    /// Marks a user's channel closed without tearing down its match —
    /// the other player keeps playing, and a future `register_connection`
    /// for the same user resumes them into the same seat.
    pub async fn disconnect(&self, user_id: UserId) {
        if let Some(slot) = self.channels.read().await.get(&user_id) {
            *slot.write().await = None;
        }
    }

    /// `handleInboundMessage` — validates shape, resolves the user's
    /// current match, and forwards the translated op.
    pub async fn dispatch_inbound(&self, user_id: UserId, raw: &str) -> Result<(), Error> {
        let inbound = InboundMessage::from_json_str(raw)?;
        let match_id = self
            .assignments
            .read()
            .await
            .get(&user_id)
            .copied()
            .ok_or(Error::PlayerNotFound(user_id))?;
        let handle = self
            .matches
            .read()
            .await
            .get(&match_id)
            .cloned()
            .ok_or(Error::MatchNotFound(match_id))?;

        handle.dispatch(user_id, to_player_message(inbound))?;

        self.user_store.extend_session(user_id, SESSION_EXTENSION_MINUTES).await?;
        self.match_store.extend_session(match_id, SESSION_EXTENSION_MINUTES).await?;
        Ok(())
    }

    /// `stopMatch` — persists a final snapshot, tells the loop task to stop,
    /// and forgets the match so a later connection attempt fails cleanly.
    pub async fn stop_match(&self, match_id: MatchId) -> Result<(), Error> {
        let handle = self.matches.write().await.remove(&match_id);
        let Some(handle) = handle else {
            return Ok(());
        };
        let storage = handle.get_match_storage().await?;
        self.snapshot_cache.save(match_id, storage).await?;
        handle.stop_game()?;
        self.match_store.remove(match_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::level::LEVEL_1;
    use crate::collaborators::{FakeMatchStore, FakeOutboundChannel, FakeSnapshotCache, FakeUserStore};
    use std::time::Duration;
    use uuid::Uuid;

    fn router() -> SessionRouter {
        SessionRouter::new(
            Arc::new(FakeUserStore::default()),
            Arc::new(FakeMatchStore::default()),
            Arc::new(FakeSnapshotCache::default()),
            Config::default(),
        )
    }

    #[tokio::test]
    async fn reconnect_replays_update_all() {
        let router = router();
        let match_id = MatchId(Uuid::new_v4());
        let host = UserId(Uuid::new_v4());
        let guest = UserId(Uuid::new_v4());
        router.start_match(match_id, &LEVEL_1, host, guest).await.unwrap();

        let channel = Arc::new(FakeOutboundChannel::default());
        router.register_connection(host, match_id, channel.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let sent = channel.sent.lock().unwrap();
        assert!(sent
            .iter()
            .any(|m| matches!(m, arena_protocol::messages::OutboundMessage::UpdateAll(_))));
    }

    #[tokio::test]
    async fn dispatch_inbound_to_unknown_user_is_player_not_found() {
        let router = router();
        let err = router
            .dispatch_inbound(UserId(Uuid::new_v4()), r#"{"type":"pause"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PlayerNotFound(_)));
    }

    #[tokio::test]
    async fn register_connection_to_unknown_match_errors() {
        let router = router();
        let channel = Arc::new(FakeOutboundChannel::default());
        let err = router
            .register_connection(UserId(Uuid::new_v4()), MatchId(Uuid::new_v4()), channel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MatchNotFound(_)));
    }

    #[tokio::test]
    async fn register_connection_reports_first_connect_then_reconnect() {
        let router = router();
        let match_id = MatchId(Uuid::new_v4());
        let host = UserId(Uuid::new_v4());
        let guest = UserId(Uuid::new_v4());
        router.start_match(match_id, &LEVEL_1, host, guest).await.unwrap();

        let first = Arc::new(FakeOutboundChannel::default());
        let previously_connected = router.register_connection(host, match_id, first).await.unwrap();
        assert!(!previously_connected);

        let second = Arc::new(FakeOutboundChannel::default());
        let previously_connected = router.register_connection(host, match_id, second).await.unwrap();
        assert!(previously_connected);
    }

    /// Simulates the loop task having gone away (crash, or the win grace
    /// period lapsing) while the snapshot cache and match roster survive —
    /// `register_connection` should rebuild the match rather than treat the
    /// registry miss as "match is gone" (spec.md §6 restore-on-miss).
    #[tokio::test]
    async fn register_connection_restores_from_snapshot_on_registry_miss() {
        let router = router();
        let match_id = MatchId(Uuid::new_v4());
        let host = UserId(Uuid::new_v4());
        let guest = UserId(Uuid::new_v4());
        router.start_match(match_id, &LEVEL_1, host, guest).await.unwrap();

        let handle = router.matches.read().await.get(&match_id).cloned().unwrap();
        let storage = handle.get_match_storage().await.unwrap();
        router.snapshot_cache.save(match_id, storage).await.unwrap();
        router.matches.write().await.remove(&match_id);

        let channel = Arc::new(FakeOutboundChannel::default());
        let previously_connected = router.register_connection(host, match_id, channel.clone()).await.unwrap();
        assert!(!previously_connected);
        assert!(router.matches.read().await.contains_key(&match_id));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let sent = channel.sent.lock().unwrap();
        assert!(sent
            .iter()
            .any(|m| matches!(m, arena_protocol::messages::OutboundMessage::UpdateAll(_))));
    }
}
