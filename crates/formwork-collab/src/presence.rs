//! Presence tracking
//!
//! The tracker keeps the local user apart from remote peers. Incoming
//! [`RealtimeMessage`]s upsert or remove peers; [`PresenceTracker::prune`]
//! drops peers that have been silent for longer than the configured timeout.

use chrono::{DateTime, Utc};
use formwork_config::PresenceConfig;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::message::{CursorPosition, PresenceStatus, RealtimeMessage};

/// Colors handed out to users, indexed by a hash of the user id
pub const PALETTE: [&str; 10] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#469990",
    "#9a6324", "#800000",
];

/// Stable color for `user_id`
pub fn color_for(user_id: &str) -> &'static str {
    // FNV-1a; must not change between releases or peers disagree on colors
    let hash = user_id
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        });
    PALETTE[(hash % PALETTE.len() as u64) as usize]
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresenceUser {
    pub user_id: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub color: &'static str,
    pub status: PresenceStatus,
    pub cursor: Option<CursorPosition>,
    pub last_activity: DateTime<Utc>,
}

impl PresenceUser {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        let user_id = user_id.into();
        Self {
            color: color_for(&user_id),
            user_id,
            name: None,
            avatar: None,
            status: PresenceStatus::Active,
            cursor: None,
            last_activity: now,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Name to show in overlays
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.user_id)
    }
}

/// What an incoming message did to the peer set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    Joined(String),
    Updated(String),
    Left(String),
    /// Custom events and echoes of the local user
    Ignored,
}

#[derive(Debug, Clone)]
pub struct PresenceTracker {
    local: PresenceUser,
    peers: BTreeMap<String, PresenceUser>,
    timeout: Duration,
}

impl PresenceTracker {
    pub fn new(local: PresenceUser, timeout: Duration) -> Self {
        Self {
            local,
            peers: BTreeMap::new(),
            timeout,
        }
    }

    pub fn from_config(local: PresenceUser, config: &PresenceConfig) -> Self {
        Self::new(local, config.timeout())
    }

    pub fn local(&self) -> &PresenceUser {
        &self.local
    }

    /// Peers ordered by user id
    pub fn peers(&self) -> impl Iterator<Item = &PresenceUser> {
        self.peers.values()
    }

    pub fn peer(&self, user_id: &str) -> Option<&PresenceUser> {
        self.peers.get(user_id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Peers plus the local user
    pub fn user_count(&self) -> usize {
        self.peers.len() + 1
    }

    /// Fold one incoming message into the peer set
    ///
    /// `received_at` is the local receipt time. Peer activity is stamped with
    /// it rather than with the sender's timestamp, so pruning never depends
    /// on the peer's clock.
    pub fn apply(
        &mut self,
        message: &RealtimeMessage,
        received_at: DateTime<Utc>,
    ) -> PresenceChange {
        if message.user_id() == Some(self.local.user_id.as_str()) {
            return PresenceChange::Ignored;
        }

        match message {
            RealtimeMessage::Presence {
                user_id,
                user_name,
                avatar,
                status,
                ..
            } => {
                let change = self.touch(user_id);
                let peer = self.peer_mut(user_id, received_at);
                if user_name.is_some() {
                    peer.name = user_name.clone();
                }
                if avatar.is_some() {
                    peer.avatar = avatar.clone();
                }
                peer.status = *status;
                change
            }
            RealtimeMessage::Cursor { user_id, cursor, .. } => {
                let change = self.touch(user_id);
                self.peer_mut(user_id, received_at).cursor = Some(cursor.clone());
                change
            }
            RealtimeMessage::Leave { user_id, .. } => match self.peers.remove(user_id) {
                Some(_) => {
                    tracing::debug!(user_id = %user_id, "peer left");
                    PresenceChange::Left(user_id.clone())
                }
                None => PresenceChange::Ignored,
            },
            RealtimeMessage::Custom { .. } => PresenceChange::Ignored,
        }
    }

    fn touch(&self, user_id: &str) -> PresenceChange {
        if self.peers.contains_key(user_id) {
            PresenceChange::Updated(user_id.to_string())
        } else {
            tracing::debug!(user_id = %user_id, "peer joined");
            PresenceChange::Joined(user_id.to_string())
        }
    }

    fn peer_mut(&mut self, user_id: &str, at: DateTime<Utc>) -> &mut PresenceUser {
        let peer = self
            .peers
            .entry(user_id.to_string())
            .or_insert_with(|| PresenceUser::new(user_id, at));
        // A local clock step backwards must not shorten the idle window
        if at > peer.last_activity {
            peer.last_activity = at;
        }
        peer
    }

    /// Remove peers idle for longer than the timeout; returns their ids
    pub fn prune(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let expired: Vec<String> = self
            .peers
            .values()
            .filter(|peer| {
                now.signed_duration_since(peer.last_activity)
                    .to_std()
                    .is_ok_and(|idle| idle > self.timeout)
            })
            .map(|peer| peer.user_id.clone())
            .collect();
        for user_id in &expired {
            self.peers.remove(user_id);
            tracing::debug!(user_id = %user_id, "pruned idle peer");
        }
        expired
    }

    /// Change the local status and build the message announcing it
    pub fn update_local_status(
        &mut self,
        status: PresenceStatus,
        now: DateTime<Utc>,
    ) -> RealtimeMessage {
        self.local.status = status;
        self.local.last_activity = now;
        self.presence_message(now)
    }

    pub fn update_local_cursor(
        &mut self,
        cursor: CursorPosition,
        now: DateTime<Utc>,
    ) -> RealtimeMessage {
        self.local.cursor = Some(cursor.clone());
        self.local.last_activity = now;
        RealtimeMessage::Cursor {
            user_id: self.local.user_id.clone(),
            cursor,
            timestamp: now,
        }
    }

    /// Periodic keep-alive announcing the current local status
    pub fn heartbeat(&self, now: DateTime<Utc>) -> RealtimeMessage {
        self.presence_message(now)
    }

    pub fn leave_message(&self, now: DateTime<Utc>) -> RealtimeMessage {
        RealtimeMessage::Leave {
            user_id: self.local.user_id.clone(),
            timestamp: now,
        }
    }

    fn presence_message(&self, now: DateTime<Utc>) -> RealtimeMessage {
        RealtimeMessage::Presence {
            user_id: self.local.user_id.clone(),
            user_name: self.local.name.clone(),
            avatar: self.local.avatar.clone(),
            status: self.local.status,
            timestamp: now,
        }
    }

    /// Forget every peer, e.g. after the connection dropped
    pub fn clear_peers(&mut self) {
        self.peers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
    }

    fn tracker() -> PresenceTracker {
        PresenceTracker::new(
            PresenceUser::new("me", at(0)).with_name("Me"),
            Duration::from_secs(30),
        )
    }

    fn presence(user: &str, seconds: i64) -> RealtimeMessage {
        RealtimeMessage::Presence {
            user_id: user.into(),
            user_name: Some(user.to_uppercase()),
            avatar: None,
            status: PresenceStatus::Active,
            timestamp: at(seconds),
        }
    }

    #[test]
    fn test_join_update_leave() {
        let mut t = tracker();
        assert_eq!(t.user_count(), 1);

        assert_eq!(
            t.apply(&presence("ada", 1), at(1)),
            PresenceChange::Joined("ada".into())
        );
        assert_eq!(
            t.apply(&presence("ada", 2), at(2)),
            PresenceChange::Updated("ada".into())
        );
        assert_eq!(t.user_count(), 2);
        assert_eq!(t.peer("ada").unwrap().display_name(), "ADA");

        let cursor = RealtimeMessage::Cursor {
            user_id: "bob".into(),
            cursor: CursorPosition::new(3.0, 4.0),
            timestamp: at(3),
        };
        assert_eq!(t.apply(&cursor, at(3)), PresenceChange::Joined("bob".into()));
        assert_eq!(t.peer("bob").unwrap().cursor, Some(CursorPosition::new(3.0, 4.0)));

        let leave = RealtimeMessage::Leave {
            user_id: "ada".into(),
            timestamp: at(4),
        };
        assert_eq!(t.apply(&leave, at(4)), PresenceChange::Left("ada".into()));
        assert_eq!(t.apply(&leave, at(4)), PresenceChange::Ignored);
        assert_eq!(t.user_count(), 2);
    }

    #[test]
    fn test_local_echo_is_ignored() {
        let mut t = tracker();
        assert_eq!(t.apply(&presence("me", 1), at(1)), PresenceChange::Ignored);
        assert_eq!(t.peer_count(), 0);
    }

    #[test]
    fn test_prune_uses_receipt_time() {
        let mut t = tracker();
        t.apply(&presence("ada", 0), at(0));
        t.apply(&presence("bob", 20), at(20));

        assert_eq!(t.prune(at(31)), vec!["ada".to_string()]);
        assert_eq!(t.peers().map(|p| p.user_id.as_str()).collect::<Vec<_>>(), vec!["bob"]);
        assert!(t.prune(at(50)).is_empty());
        assert_eq!(t.prune(at(51)), vec!["bob".to_string()]);
    }

    #[test]
    fn test_peer_clock_skew_does_not_affect_pruning() {
        let mut t = tracker();
        // Sender clock ten minutes ahead; it goes silent after one message
        t.apply(&presence("fast", 600), at(0));
        // Sender clock a minute behind; it keeps sending heartbeats
        t.apply(&presence("slow", -60), at(0));

        assert!(t.prune(at(1)).is_empty());
        t.apply(&presence("slow", -30), at(30));

        assert_eq!(t.prune(at(31)), vec!["fast".to_string()]);
        assert_eq!(t.peers().map(|p| p.user_id.as_str()).collect::<Vec<_>>(), vec!["slow"]);
    }

    #[test]
    fn test_outgoing_messages() {
        let mut t = tracker();
        let msg = t.update_local_status(PresenceStatus::Away, at(5));
        assert_eq!(
            msg,
            RealtimeMessage::Presence {
                user_id: "me".into(),
                user_name: Some("Me".into()),
                avatar: None,
                status: PresenceStatus::Away,
                timestamp: at(5),
            }
        );
        assert_eq!(t.local().status, PresenceStatus::Away);
        assert_eq!(t.heartbeat(at(6)).user_id(), Some("me"));
        assert!(matches!(t.leave_message(at(7)), RealtimeMessage::Leave { .. }));
    }

    proptest! {
        #[test]
        fn prop_color_is_deterministic(id in "[a-z0-9-]{1,24}") {
            let color = color_for(&id);
            prop_assert_eq!(color, color_for(&id));
            prop_assert!(PALETTE.contains(&color));
            prop_assert_eq!(PresenceUser::new(id.clone(), at(0)).color, color);
        }
    }
}
