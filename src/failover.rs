//! Listener orchestration: live feed selection with offline fallback
//!
//! The externally observable contract of the listener side is the state
//! machine below, not any single function:
//!
//! ```text
//! Idle ──▶ Selecting ──▶ Connecting ──▶ Listening
//!              │              │
//!              │ no candidate │ connect failure
//!              ▼              ▼
//!            OfflineFallback ◀── direct request (remote command)
//! ```
//!
//! OfflineFallback is reached when selection finds no live candidate, when
//! the chosen feed fails to connect, or directly on demand — never skipped.

use std::collections::HashSet;

use crate::error::{Error, MediaError, Result};
use crate::priority::{GroupPriority, PriorityRegistry};

/// A startable live feed (seam over [`crate::net::StreamReceiver`])
pub trait LiveFeed {
    /// Attempt to connect and begin playback; a connection-establishment
    /// failure must be returned synchronously.
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
}

/// A player for locally stored recordings (seam over
/// [`crate::offline::OfflineAzaanPlayer`])
pub trait OfflineSink {
    fn play(&mut self, prayer: &str) -> std::result::Result<(), MediaError>;
    fn stop(&mut self);
}

/// Builds a live feed for a chosen masjid's endpoint
pub type FeedFactory<F> = Box<dyn Fn(&str) -> std::result::Result<F, Error> + Send>;

/// Listener state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenState {
    Idle,
    Selecting,
    Connecting { group_id: String },
    Listening { group_id: String },
    OfflineFallback { prayer: String },
}

/// Orchestrates the listener: pick a live masjid, connect, fall back
pub struct FailoverCoordinator<F: LiveFeed, S: OfflineSink> {
    registry: PriorityRegistry,
    feed_factory: FeedFactory<F>,
    offline: S,
    default_prayer: String,
    state: ListenState,
    active: Option<F>,
}

impl<F: LiveFeed, S: OfflineSink> FailoverCoordinator<F, S> {
    pub fn new(
        registry: PriorityRegistry,
        feed_factory: FeedFactory<F>,
        offline: S,
        default_prayer: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            feed_factory,
            offline,
            default_prayer: default_prayer.into(),
            state: ListenState::Idle,
            active: None,
        }
    }

    /// Current state of the machine
    pub fn state(&self) -> &ListenState {
        &self.state
    }

    /// Select the highest-priority live masjid and listen to it, falling
    /// back to the stored default-prayer recording when no candidate exists
    /// or the connection cannot be established.
    pub fn listen(&mut self, live_group_ids: &HashSet<String>) -> Result<&ListenState> {
        self.teardown();
        self.state = ListenState::Selecting;

        let chosen = match self.registry.highest_priority_live(live_group_ids) {
            Some(id) => id.to_string(),
            None => {
                tracing::info!("No live masjid among subscriptions, playing offline azaan");
                return self.fall_back();
            }
        };

        self.state = ListenState::Connecting {
            group_id: chosen.clone(),
        };

        let mut feed = match (self.feed_factory)(&chosen) {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!("Could not build feed for {}: {}", chosen, e);
                return self.fall_back();
            }
        };

        match feed.start() {
            Ok(()) => {
                tracing::info!("Listening to {}", chosen);
                self.active = Some(feed);
                self.state = ListenState::Listening { group_id: chosen };
                Ok(&self.state)
            }
            Err(e) => {
                tracing::warn!("Connection to {} failed: {}", chosen, e);
                self.fall_back()
            }
        }
    }

    /// Play the stored recording for a prayer, independent of connection
    /// state (e.g. on a remote command)
    pub fn play_offline(&mut self, prayer: &str) -> Result<&ListenState> {
        self.teardown();
        if let Err(e) = self.offline.play(prayer) {
            // Nothing is playing; do not keep reporting a transient state
            self.state = ListenState::Idle;
            return Err(e.into());
        }
        self.state = ListenState::OfflineFallback {
            prayer: prayer.to_string(),
        };
        Ok(&self.state)
    }

    /// Dispatch a remote command payload
    ///
    /// `{"action": "play_offline", "prayer": "..."}` triggers offline
    /// playback; anything else is ignored.
    pub fn handle_remote(&mut self, payload: &serde_json::Value) -> Result<&ListenState> {
        let data = payload.get("data").unwrap_or(payload);
        if data.get("action").and_then(|v| v.as_str()) == Some("play_offline") {
            let prayer = data
                .get("prayer")
                .and_then(|v| v.as_str())
                .unwrap_or(&self.default_prayer)
                .to_string();
            return self.play_offline(&prayer);
        }
        Ok(&self.state)
    }

    /// Tear everything down and return to Idle
    pub fn stop(&mut self) {
        self.teardown();
        self.state = ListenState::Idle;
    }

    /// Mutable access to the subscription registry
    pub fn registry_mut(&mut self) -> &mut PriorityRegistry {
        &mut self.registry
    }

    /// Subscriptions in sort order, for persistence
    pub fn export_priorities(&self) -> Vec<GroupPriority> {
        self.registry.export()
    }

    fn fall_back(&mut self) -> Result<&ListenState> {
        let prayer = self.default_prayer.clone();
        if let Err(e) = self.offline.play(&prayer) {
            // Nothing is playing; do not keep reporting a transient state
            self.state = ListenState::Idle;
            return Err(e.into());
        }
        self.state = ListenState::OfflineFallback { prayer };
        Ok(&self.state)
    }

    fn teardown(&mut self) {
        if let Some(mut feed) = self.active.take() {
            feed.stop();
        }
        self.offline.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockFeed {
        fail: bool,
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
    }

    impl LiveFeed for MockFeed {
        fn start(&mut self) -> Result<()> {
            if self.fail {
                Err(crate::error::TransportError::ConnectFailed("refused".to_string()).into())
            } else {
                self.started.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        fn stop(&mut self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockOffline {
        playing: Option<String>,
        missing: bool,
    }

    impl OfflineSink for MockOffline {
        fn play(&mut self, prayer: &str) -> std::result::Result<(), MediaError> {
            if self.missing {
                return Err(MediaError::NotFound(prayer.to_string()));
            }
            self.playing = Some(prayer.to_string());
            Ok(())
        }

        fn stop(&mut self) {
            self.playing = None;
        }
    }

    fn registry_ab() -> PriorityRegistry {
        let mut registry = PriorityRegistry::new();
        registry.set_priority("masjidA", 1, true);
        registry.set_priority("masjidB", 2, true);
        registry
    }

    fn live(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn factory(fail: bool, started: Arc<AtomicUsize>, stopped: Arc<AtomicUsize>) -> FeedFactory<MockFeed> {
        Box::new(move |_group_id| {
            Ok(MockFeed {
                fail,
                started: started.clone(),
                stopped: stopped.clone(),
            })
        })
    }

    #[test]
    fn listens_to_highest_priority_live_masjid() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let mut coordinator = FailoverCoordinator::new(
            registry_ab(),
            factory(false, started.clone(), stopped.clone()),
            MockOffline::default(),
            "fajr",
        );

        let state = coordinator.listen(&live(&["masjidB"])).unwrap().clone();
        assert_eq!(
            state,
            ListenState::Listening {
                group_id: "masjidB".to_string()
            }
        );

        // masjidA comes live too; lower priority number wins
        let state = coordinator
            .listen(&live(&["masjidA", "masjidB"]))
            .unwrap()
            .clone();
        assert_eq!(
            state,
            ListenState::Listening {
                group_id: "masjidA".to_string()
            }
        );
        assert_eq!(started.load(Ordering::SeqCst), 2);
        // The first feed was torn down when re-selecting
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_live_candidate_falls_back_to_offline() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let mut coordinator = FailoverCoordinator::new(
            registry_ab(),
            factory(false, started, stopped),
            MockOffline::default(),
            "fajr",
        );

        let state = coordinator.listen(&live(&[])).unwrap().clone();
        assert_eq!(
            state,
            ListenState::OfflineFallback {
                prayer: "fajr".to_string()
            }
        );
    }

    #[test]
    fn connect_failure_falls_back_to_offline() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let mut coordinator = FailoverCoordinator::new(
            registry_ab(),
            factory(true, started.clone(), stopped),
            MockOffline::default(),
            "maghrib",
        );

        let state = coordinator.listen(&live(&["masjidA"])).unwrap().clone();
        assert_eq!(
            state,
            ListenState::OfflineFallback {
                prayer: "maghrib".to_string()
            }
        );
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_offline_asset_surfaces_to_caller() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let mut coordinator = FailoverCoordinator::new(
            registry_ab(),
            factory(false, started, stopped),
            MockOffline {
                playing: None,
                missing: true,
            },
            "fajr",
        );

        assert!(coordinator.listen(&live(&[])).is_err());
        // No transient Selecting/Connecting state survives the failure
        assert_eq!(coordinator.state(), &ListenState::Idle);

        assert!(coordinator.play_offline("isha").is_err());
        assert_eq!(coordinator.state(), &ListenState::Idle);
    }

    #[test]
    fn stop_returns_to_idle_and_tears_down() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let mut coordinator = FailoverCoordinator::new(
            registry_ab(),
            factory(false, started, stopped.clone()),
            MockOffline::default(),
            "fajr",
        );

        coordinator.listen(&live(&["masjidA"])).unwrap();
        coordinator.stop();
        assert_eq!(coordinator.state(), &ListenState::Idle);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remote_play_offline_command_is_dispatched() {
        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let mut coordinator = FailoverCoordinator::new(
            registry_ab(),
            factory(false, started, stopped),
            MockOffline::default(),
            "fajr",
        );

        let payload = serde_json::json!({
            "data": { "action": "play_offline", "prayer": "isha" }
        });
        let state = coordinator.handle_remote(&payload).unwrap().clone();
        assert_eq!(
            state,
            ListenState::OfflineFallback {
                prayer: "isha".to_string()
            }
        );

        // Unrelated payloads leave the state alone
        let other = serde_json::json!({ "data": { "action": "noop" } });
        let state = coordinator.handle_remote(&other).unwrap().clone();
        assert_eq!(
            state,
            ListenState::OfflineFallback {
                prayer: "isha".to_string()
            }
        );
    }
}
