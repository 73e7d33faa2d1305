use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::info;

use civic_sync::cache::{QueryCache, QueryKey};
use civic_sync::conversation::ConversationView;
use civic_sync::error::Result;
use civic_sync::hub::PushHub;
use civic_sync::notifications::NotificationStream;
use civic_sync::reports::ReportDesk;
use civic_types::models::{ConversationKey, Session};

use crate::config::ClientConfig;
use crate::http::HttpApi;
use crate::push::PushSocket;

/// One signed-in session: REST client, push channel, and the shared cache.
/// Dropping it stops the push channel and clears every cached query.
pub struct Portal {
    api: Arc<HttpApi>,
    hub: PushHub,
    cache: Arc<QueryCache>,
    notifications: Mutex<NotificationStream<HttpApi>>,
    push_task: Option<JoinHandle<()>>,
}

impl Portal {
    /// Must be called inside a tokio runtime.
    pub fn start(config: &ClientConfig, session: Session) -> Self {
        let hub = PushHub::new();
        let cache = Arc::new(QueryCache::new());
        info!("Starting portal session for {} ({})", session.display_name, session.role);
        cache.put(QueryKey::session(), session);

        let api = Arc::new(HttpApi::new(config));
        // The hub holds a single notification listener, so the session owns
        // the only stream.
        let notifications = NotificationStream::new(api.clone(), cache.clone(), &hub);
        let push_task = PushSocket::new(config, hub.clone()).spawn();
        Self {
            api,
            hub,
            cache,
            notifications: Mutex::new(notifications),
            push_task: Some(push_task),
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.cache.get(&QueryKey::session())
    }

    pub fn hub(&self) -> &PushHub {
        &self.hub
    }

    pub fn reports(&self) -> ReportDesk<HttpApi> {
        ReportDesk::new(self.api.clone(), self.cache.clone())
    }

    /// The session's notification stream. Every caller gets the same one.
    pub async fn notifications(&self) -> MutexGuard<'_, NotificationStream<HttpApi>> {
        self.notifications.lock().await
    }

    /// Open a conversation as the session's actor.
    pub async fn open_conversation(&self, key: ConversationKey) -> Result<ConversationView<HttpApi>> {
        let session = self.session();
        ConversationView::open(
            self.api.clone(),
            &self.hub,
            key,
            session.as_ref().map(|s| s.role),
            session.as_ref().map(|s| s.display_name.as_str()),
        )
        .await
    }

    pub fn end(self) {
        drop(self);
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        if let Some(task) = self.push_task.take() {
            task.abort();
            self.cache.clear();
            info!("Portal session ended");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use civic_sync::hub::Delivery;
    use civic_types::events::PushEvent;
    use civic_types::models::Role;
    use uuid::Uuid;

    fn config() -> ClientConfig {
        ClientConfig::from_lookup(|key: &str| match key {
            // nothing listens here; the push task just keeps retrying
            "CIVIC_API_URL" => Some("http://127.0.0.1:9".into()),
            "CIVIC_PUSH_RECONNECT_MS" => Some("50".into()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn session_lives_in_cache_until_end() {
        let session = Session {
            actor_id: Uuid::new_v4(),
            role: Role::Lead,
            display_name: "Sam".into(),
        };
        let portal = Portal::start(&config(), session.clone());
        assert_eq!(portal.session(), Some(session));

        let cache = portal.cache.clone();
        portal.end();
        assert!(cache.get::<Session>(&QueryKey::session()).is_none());
    }

    #[tokio::test]
    async fn notification_stream_is_shared_for_the_session() {
        let session = Session {
            actor_id: Uuid::new_v4(),
            role: Role::User,
            display_name: "Ana".into(),
        };
        let portal = Portal::start(&config(), session);
        assert!(portal.hub().has_notification_listener());

        let event = PushEvent::NewNotification {
            id: 4,
            content: "report resolved".into(),
            created_at: Utc::now(),
        };
        assert_eq!(portal.hub().dispatch(event), Delivery::Delivered);

        // a second borrow must not displace the listener the first one saw
        drop(portal.notifications().await);
        assert_eq!(portal.notifications().await.pump(), 1);
        assert_eq!(portal.notifications().await.list().len(), 1);
        assert!(portal.hub().has_notification_listener());

        let hub = portal.hub().clone();
        portal.end();
        assert!(!hub.has_notification_listener());
    }
}
