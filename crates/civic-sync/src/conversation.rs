use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use civic_types::models::{ConversationKey, Message, Role};

use crate::api::PortalApi;
use crate::error::Result;
use crate::hub::{PushHub, Subscription};
use crate::identity::{self, SenderIdentity};
use crate::messages::{Accept, MessageStream};

/// Shared read handle on a conversation's message stream.
#[derive(Clone)]
pub struct StreamHandle {
    inner: Arc<Mutex<MessageStream>>,
}

impl StreamHandle {
    fn lock(&self) -> MutexGuard<'_, MessageStream> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().messages().to_vec()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_closed()
    }

    pub fn identity(&self) -> SenderIdentity {
        self.lock().identity()
    }

    /// Fold a message in. Returns `Ignored` once the view is torn down.
    pub fn accept(&self, message: Message) -> Accept {
        self.lock().accept(message)
    }
}

/// Fetches history for a stream and applies it unless the owning view was
/// closed while the request was in flight.
pub struct HistoryLoader<A> {
    api: Arc<A>,
    key: ConversationKey,
    stream: StreamHandle,
}

impl<A: PortalApi> HistoryLoader<A> {
    /// Returns false when the response arrived after teardown and was discarded.
    pub async fn load(&self) -> Result<bool> {
        let history = self.api.fetch_history(self.key).await?;
        let applied = self.stream.lock().apply_history(history);
        if !applied {
            debug!("Discarding history for closed conversation {}", self.key);
        }
        Ok(applied)
    }
}

/// Owns one open conversation: its message stream and its push subscription.
/// Dropping the view (or calling `close`) unsubscribes before returning.
pub struct ConversationView<A> {
    api: Arc<A>,
    key: ConversationKey,
    stream: StreamHandle,
    subscription: Option<Subscription<Message>>,
}

impl<A: PortalApi> ConversationView<A> {
    /// Subscribe first, then load history, so nothing posted in between is lost.
    pub async fn open(
        api: Arc<A>,
        hub: &PushHub,
        key: ConversationKey,
        role: Option<Role>,
        profile_name: Option<&str>,
    ) -> Result<Self> {
        let identity = identity::resolve(Some(key.mode), role);
        let display_name = identity
            .tag()
            .map(|tag| identity::display_name(tag, profile_name))
            .unwrap_or_default();
        if !identity.is_resolved() {
            warn!("No sender identity for {:?} in {}; opening read-only", role, key);
        }

        let subscription = hub.subscribe_conversation(key);
        let stream = StreamHandle {
            inner: Arc::new(Mutex::new(MessageStream::new(key, identity, display_name))),
        };
        let mut view = Self {
            api,
            key,
            stream,
            subscription: Some(subscription),
        };

        view.refresh().await?;
        view.pump();
        info!("Opened conversation {} ({} messages)", key, view.messages().len());
        Ok(view)
    }

    pub fn key(&self) -> ConversationKey {
        self.key
    }

    pub fn messages(&self) -> Vec<Message> {
        self.stream.snapshot()
    }

    pub fn is_read_only(&self) -> bool {
        !self.stream.identity().is_resolved()
    }

    pub fn stream(&self) -> StreamHandle {
        self.stream.clone()
    }

    pub fn history_loader(&self) -> HistoryLoader<A> {
        HistoryLoader {
            api: self.api.clone(),
            key: self.key,
            stream: self.stream.clone(),
        }
    }

    /// Re-fetch history and reconcile it with what the stream already holds.
    pub async fn refresh(&self) -> Result<bool> {
        self.history_loader().load().await
    }

    /// Fold every buffered push event into the stream. Returns how many were new.
    pub fn pump(&mut self) -> usize {
        let Some(subscription) = self.subscription.as_mut() else {
            return 0;
        };
        let mut appended = 0;
        while let Some(message) = subscription.try_next() {
            if self.stream.accept(message) == Accept::Appended {
                appended += 1;
            }
        }
        appended
    }

    /// Wait for one push event and fold it in. `None` when the subscription
    /// has ended.
    pub async fn next_event(&mut self) -> Option<Accept> {
        let message = self.subscription.as_mut()?.next().await?;
        Some(self.stream.accept(message))
    }

    /// Validate locally, post, then append the confirmed message. The push
    /// copy that follows deduplicates against it.
    pub async fn send(&self, draft: &str) -> Result<Message> {
        let req = self.stream.lock().prepare_send(draft)?;
        let message = self.api.send_message(self.key, req).await?;
        if self.stream.accept(message.clone()) == Accept::Ignored {
            debug!("Send to {} confirmed after teardown", self.key);
        }
        Ok(message)
    }

    pub fn close(self) {
        drop(self);
    }
}

impl<A> Drop for ConversationView<A> {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            drop(subscription);
            self.stream.lock().close();
            info!("Closed conversation {}", self.key);
        }
    }
}
