use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use civic_types::models::Notification;

use crate::api::PortalApi;
use crate::cache::{Mutation, QueryCache, QueryKey};
use crate::error::{ClientError, Result};
use crate::hub::{PushHub, Subscription};

/// Merge by server id. The first copy of an id wins, so a pushed
/// notification never overwrites the server's. Newest first.
pub fn merge(server: Vec<Notification>, pushed: Vec<Notification>) -> Vec<Notification> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Notification> = server
        .into_iter()
        .chain(pushed)
        .filter(|n| seen.insert(n.id))
        .collect();
    merged.sort_by_key(|n| Reverse(n.created_at));
    merged
}

/// Outcome of deleting every known notification one by one.
#[derive(Debug, Default)]
pub struct BulkDelete {
    pub deleted: Vec<u64>,
    pub failed: Vec<(u64, ClientError)>,
    /// False if the final refetch failed and the cached list is still stale.
    pub reconciled: bool,
}

/// The actor's notification list, kept in the shared cache. Mutations never
/// patch the list locally: they go to the server, then the list is refetched.
pub struct NotificationStream<A> {
    api: Arc<A>,
    cache: Arc<QueryCache>,
    subscription: Subscription<Notification>,
}

impl<A: PortalApi> NotificationStream<A> {
    pub fn new(api: Arc<A>, cache: Arc<QueryCache>, hub: &PushHub) -> Self {
        Self {
            api,
            cache,
            subscription: hub.subscribe_notifications(),
        }
    }

    pub fn list(&self) -> Vec<Notification> {
        self.cache.get(&QueryKey::notifications()).unwrap_or_default()
    }

    pub fn unread_count(&self) -> usize {
        self.list().iter().filter(|n| !n.is_read).count()
    }

    pub fn is_stale(&self) -> bool {
        self.cache.is_stale(&QueryKey::notifications())
    }

    /// Fold one pushed notification in. Returns false for an id already known.
    pub fn accept(&self, notification: Notification) -> bool {
        let key = QueryKey::notifications();
        let id = notification.id;
        let mut inserted = false;
        let present = self.cache.update(&key, |list: &mut Vec<Notification>| {
            if list.iter().all(|n| n.id != id) {
                *list = merge(std::mem::take(list), vec![notification.clone()]);
                inserted = true;
            }
        });
        if !present {
            // Push-only list: usable for display but not confirmed server state.
            self.cache.put(key.clone(), vec![notification]);
            self.cache.invalidate(&key);
            inserted = true;
        }
        if !inserted {
            debug!("Ignoring pushed notification {} already present", id);
        }
        inserted
    }

    /// Fold every buffered push into the list.
    pub fn pump(&mut self) -> usize {
        let mut inserted = 0;
        while let Some(notification) = self.subscription.try_next() {
            if self.accept(notification) {
                inserted += 1;
            }
        }
        inserted
    }

    /// Replace the list with the server's. Pushes buffered before the fetch
    /// are superseded by it; pushes that land while it is in flight are kept
    /// only when their id is newer than anything the server returned, so a
    /// redelivered push cannot resurrect a deleted notification.
    pub async fn refresh(&mut self) -> Result<()> {
        let superseded = self.drain();
        if superseded > 0 {
            debug!("Dropping {} buffered pushes ahead of refetch", superseded);
        }

        let server = self.api.fetch_notifications().await?;
        let newest = server.iter().map(|n| n.id).max();
        let mut pushed = Vec::new();
        while let Some(notification) = self.subscription.try_next() {
            if newest.is_none_or(|max| notification.id > max) {
                pushed.push(notification);
            }
        }
        self.cache.put(QueryKey::notifications(), merge(server, pushed));
        Ok(())
    }

    fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.subscription.try_next().is_some() {
            drained += 1;
        }
        drained
    }

    pub async fn delete(&mut self, id: u64) -> Result<()> {
        let outcome = self.api.delete_notification(id).await;
        self.reconcile(Mutation::DeleteNotification(id), outcome).await
    }

    pub async fn mark_read(&mut self, id: u64) -> Result<()> {
        let outcome = self.api.mark_notification_read(id).await;
        self.reconcile(Mutation::MarkNotificationRead(id), outcome).await
    }

    /// Delete every currently known id in turn, then reconcile once.
    pub async fn delete_all(&mut self) -> BulkDelete {
        let mut report = BulkDelete::default();
        for id in self.list().into_iter().map(|n| n.id) {
            match self.api.delete_notification(id).await {
                Ok(()) => report.deleted.push(id),
                Err(e) => {
                    warn!("Deleting notification {} failed: {}", id, e);
                    report.failed.push((id, e));
                }
            }
            self.cache.invalidate_for(&Mutation::DeleteNotification(id));
        }

        report.reconciled = match self.refresh().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Refetch after bulk delete failed: {}", e);
                false
            }
        };
        info!(
            "Bulk delete: {} deleted, {} failed",
            report.deleted.len(),
            report.failed.len()
        );
        report
    }

    /// Invalidate and refetch after a mutation, whatever its outcome.
    async fn reconcile(&mut self, mutation: Mutation, outcome: Result<()>) -> Result<()> {
        self.cache.invalidate_for(&mutation);
        let refetched = self.refresh().await;
        match (outcome, refetched) {
            (Err(e), refetched) => {
                if let Err(r) = refetched {
                    warn!("Refetch after failed {:?} also failed: {}", mutation, r);
                }
                Err(e)
            }
            (Ok(()), Err(r)) => {
                warn!("Refetch after {:?} failed; list left stale: {}", mutation, r);
                Ok(())
            }
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}
