use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{RwLock, broadcast};
use tracing::info;
use uuid::Uuid;

use querydeck_types::events::SessionEvent;

/// A signed-in session. Tokens stay valid only while their session is live.
#[derive(Debug, Clone)]
pub struct LiveSession {
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Process-wide session holder. Created once at startup and handed to
/// handlers through the router state.
#[derive(Clone)]
pub struct SessionProvider {
    inner: Arc<SessionProviderInner>,
}

struct SessionProviderInner {
    /// Every subscriber receives every session event
    events_tx: broadcast::Sender<SessionEvent>,

    /// Live sessions: session_id -> session
    sessions: RwLock<HashMap<Uuid, LiveSession>>,

    ttl: Duration,
}

impl SessionProvider {
    pub fn new(ttl: Duration) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(SessionProviderInner {
                events_tx,
                sessions: RwLock::new(HashMap::new()),
                ttl,
            }),
        }
    }

    /// Subscribe to session events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events_tx.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events_tx.send(event);
    }

    /// Open a session for a freshly authenticated user.
    pub async fn open(&self, user_id: Uuid, email: String) -> (Uuid, LiveSession) {
        let session_id = Uuid::new_v4();
        let session = LiveSession {
            user_id,
            email: email.clone(),
            expires_at: Utc::now() + self.inner.ttl,
        };

        {
            let mut sessions = self.inner.sessions.write().await;
            prune(&mut sessions);
            sessions.insert(session_id, session.clone());
        }

        self.publish(SessionEvent::SignedIn {
            user_id,
            session_id,
            email,
        });

        (session_id, session)
    }

    /// Look up a live session. Expired sessions are dropped on access.
    pub async fn get(&self, session_id: Uuid) -> Option<LiveSession> {
        let session = self.inner.sessions.read().await.get(&session_id).cloned()?;
        if session.expires_at <= Utc::now() {
            self.inner.sessions.write().await.remove(&session_id);
            return None;
        }
        Some(session)
    }

    /// Extend a live session by the configured lifetime.
    pub async fn refresh(&self, session_id: Uuid) -> Option<LiveSession> {
        let refreshed = {
            let mut sessions = self.inner.sessions.write().await;
            let session = sessions.get_mut(&session_id)?;
            if session.expires_at <= Utc::now() {
                sessions.remove(&session_id);
                return None;
            }
            session.expires_at = Utc::now() + self.inner.ttl;
            session.clone()
        };

        self.publish(SessionEvent::TokenRefreshed {
            user_id: refreshed.user_id,
            session_id,
        });

        Some(refreshed)
    }

    /// Tear a session down. Returns false if it was not live.
    pub async fn close(&self, session_id: Uuid) -> bool {
        let removed = self.inner.sessions.write().await.remove(&session_id);
        match removed {
            Some(session) => {
                self.publish(SessionEvent::SignedOut {
                    user_id: session.user_id,
                    session_id,
                });
                true
            }
            None => false,
        }
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn prune_expired(&self) -> usize {
        prune(&mut *self.inner.sessions.write().await)
    }

    #[cfg(test)]
    pub(crate) async fn live_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }
}

fn prune(sessions: &mut HashMap<Uuid, LiveSession>) -> usize {
    let now = Utc::now();
    let before = sessions.len();
    sessions.retain(|_, s| s.expires_at > now);
    before - sessions.len()
}

/// Background task that sweeps sessions which expired without a sign-out.
pub async fn run_sweep_loop(provider: SessionProvider, interval_secs: u64) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let count = provider.prune_expired().await;
        if count > 0 {
            info!("Session sweep: pruned {} expired sessions", count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lifecycle_publishes_events() {
        let provider = SessionProvider::new(Duration::hours(1));
        let mut events = provider.subscribe();
        let user_id = Uuid::new_v4();

        let (sid, _) = provider.open(user_id, "ada@example.com".into()).await;
        assert!(provider.get(sid).await.is_some());
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::SignedIn {
                user_id,
                session_id: sid,
                email: "ada@example.com".into()
            }
        );

        assert!(provider.refresh(sid).await.is_some());
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::TokenRefreshed { user_id, session_id: sid }
        );

        assert!(provider.close(sid).await);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::SignedOut { user_id, session_id: sid }
        );
        assert!(provider.get(sid).await.is_none());
        assert!(!provider.close(sid).await);
    }

    #[tokio::test]
    async fn expired_sessions_are_not_live() {
        let provider = SessionProvider::new(Duration::seconds(-1));
        let (sid, _) = provider.open(Uuid::new_v4(), "ada@example.com".into()).await;

        assert!(provider.get(sid).await.is_none());
        assert!(provider.refresh(sid).await.is_none());
        assert_eq!(provider.live_count().await, 0);
    }

    #[tokio::test]
    async fn expired_sessions_are_pruned_without_lookup() {
        let expired = SessionProvider::new(Duration::seconds(-1));
        for _ in 0..100 {
            expired.open(Uuid::new_v4(), "ada@example.com".into()).await;
        }
        // each open sweeps the ones before it; only the newest remains
        assert_eq!(expired.live_count().await, 1);
        assert_eq!(expired.prune_expired().await, 1);
        assert_eq!(expired.live_count().await, 0);

        let live = SessionProvider::new(Duration::hours(1));
        for _ in 0..3 {
            live.open(Uuid::new_v4(), "ada@example.com".into()).await;
        }
        assert_eq!(live.prune_expired().await, 0);
        assert_eq!(live.live_count().await, 3);
    }

    #[tokio::test]
    async fn dropped_subscriber_does_not_block() {
        let provider = SessionProvider::new(Duration::hours(1));
        drop(provider.subscribe());

        let (sid, _) = provider.open(Uuid::new_v4(), "ada@example.com".into()).await;
        assert!(provider.close(sid).await);
    }
}
