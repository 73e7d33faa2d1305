use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use civic_types::events::PushEvent;
use civic_types::models::{ConversationKey, Message, Notification};

/// What happened to a dispatched push event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Nobody is listening for this scope; the event was dropped, not queued.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Conversation(ConversationKey),
    Notifications,
}

/// Routes push events to the views currently interested in them.
#[derive(Clone, Default)]
pub struct PushHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    /// conversation -> (subscription id, sender)
    conversations: Mutex<HashMap<ConversationKey, (Uuid, mpsc::UnboundedSender<Message>)>>,

    /// Single actor-wide notification listener
    notifications: Mutex<Option<(Uuid, mpsc::UnboundedSender<Notification>)>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start listening for one conversation. A newer subscription for the same
    /// conversation replaces the older one.
    pub fn subscribe_conversation(&self, key: ConversationKey) -> Subscription<Message> {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.inner.conversations).insert(key, (id, tx));
        debug!("Subscribed to conversation {}", key);
        Subscription {
            id,
            scope: Scope::Conversation(key),
            rx,
            hub: self.inner.clone(),
        }
    }

    pub fn subscribe_notifications(&self) -> Subscription<Notification> {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.inner.notifications) = Some((id, tx));
        debug!("Subscribed to notifications");
        Subscription {
            id,
            scope: Scope::Notifications,
            rx,
            hub: self.inner.clone(),
        }
    }

    /// Route one push event to its subscriber, if any.
    pub fn dispatch(&self, event: PushEvent) -> Delivery {
        match event.conversation() {
            Some(key) => {
                let Some(message) = event.into_message() else {
                    return Delivery::Ignored;
                };
                let conversations = lock(&self.inner.conversations);
                let delivered = conversations
                    .get(&key)
                    .is_some_and(|(_, tx)| tx.send(message).is_ok());
                if !delivered {
                    debug!("Ignoring message for inactive conversation {}", key);
                    return Delivery::Ignored;
                }
                Delivery::Delivered
            }
            None => {
                let Some(notification) = event.into_notification() else {
                    return Delivery::Ignored;
                };
                let listener = lock(&self.inner.notifications);
                let delivered = listener
                    .as_ref()
                    .is_some_and(|(_, tx)| tx.send(notification).is_ok());
                if !delivered {
                    debug!("Ignoring notification with no active listener");
                    return Delivery::Ignored;
                }
                Delivery::Delivered
            }
        }
    }

    pub fn is_subscribed(&self, key: ConversationKey) -> bool {
        lock(&self.inner.conversations).contains_key(&key)
    }

    pub fn has_notification_listener(&self) -> bool {
        lock(&self.inner.notifications).is_some()
    }
}

impl HubInner {
    /// Remove a registration, but only if it still belongs to `id`.
    fn release(&self, scope: Scope, id: Uuid) {
        match scope {
            Scope::Conversation(key) => {
                let mut conversations = lock(&self.conversations);
                if conversations.get(&key).is_some_and(|(stored, _)| *stored == id) {
                    conversations.remove(&key);
                    debug!("Unsubscribed from conversation {}", key);
                }
            }
            Scope::Notifications => {
                let mut listener = lock(&self.notifications);
                if listener.as_ref().is_some_and(|(stored, _)| *stored == id) {
                    *listener = None;
                    debug!("Unsubscribed from notifications");
                }
            }
        }
    }
}

/// Scoped push subscription. Dropping it unregisters from the hub before the
/// drop returns, and discards anything still buffered.
pub struct Subscription<T> {
    id: Uuid,
    scope: Scope,
    rx: mpsc::UnboundedReceiver<T>,
    hub: Arc<HubInner>,
}

impl<T> Subscription<T> {
    /// Next buffered event, without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event. `None` once the subscription was replaced.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        trace!("Releasing subscription {}", self.id);
        self.hub.release(self.scope, self.id);
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use civic_types::models::{ConversationMode, SenderTag};

    fn message_event(key: ConversationKey, content: &str) -> PushEvent {
        PushEvent::NewMessage {
            report_id: key.report_id,
            mode: key.mode,
            content: content.into(),
            sender_role: SenderTag::User,
            sender_display_name: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn routes_to_matching_conversation_only() {
        let hub = PushHub::new();
        let key = ConversationKey::new(Uuid::new_v4(), ConversationMode::OfficerUser);
        let other = ConversationKey::new(key.report_id, ConversationMode::LeadExternal);
        let mut sub = hub.subscribe_conversation(key);

        assert_eq!(hub.dispatch(message_event(key, "hello")), Delivery::Delivered);
        assert_eq!(hub.dispatch(message_event(other, "elsewhere")), Delivery::Ignored);

        assert_eq!(sub.try_next().unwrap().content, "hello");
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn drop_unregisters_synchronously() {
        let hub = PushHub::new();
        let key = ConversationKey::new(Uuid::new_v4(), ConversationMode::OfficerUser);
        let sub = hub.subscribe_conversation(key);
        assert!(hub.is_subscribed(key));

        drop(sub);
        assert!(!hub.is_subscribed(key));
        assert_eq!(hub.dispatch(message_event(key, "late")), Delivery::Ignored);
    }

    #[test]
    fn stale_handle_does_not_remove_newer_subscription() {
        let hub = PushHub::new();
        let key = ConversationKey::new(Uuid::new_v4(), ConversationMode::LeadExternal);
        let old = hub.subscribe_conversation(key);
        let mut new = hub.subscribe_conversation(key);

        drop(old);
        assert!(hub.is_subscribed(key));
        assert_eq!(hub.dispatch(message_event(key, "still here")), Delivery::Delivered);
        assert!(new.try_next().is_some());
    }

    #[test]
    fn notifications_without_listener_are_dropped() {
        let hub = PushHub::new();
        let event = PushEvent::NewNotification {
            id: 1,
            content: "x".into(),
            created_at: Utc::now(),
        };
        assert_eq!(hub.dispatch(event.clone()), Delivery::Ignored);

        let mut sub = hub.subscribe_notifications();
        assert_eq!(hub.dispatch(event), Delivery::Delivered);
        assert_eq!(sub.try_next().map(|n| n.id), Some(1));

        drop(sub);
        assert!(!hub.has_notification_listener());
    }
}
