use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use civic_types::api::ReportScope;
use civic_types::models::{ConversationKey, Notification, Report, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Session,
    Notifications,
    Reports,
    Report,
}

/// Stable identity of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub entity: EntityKind,
    pub scope: String,
}

impl QueryKey {
    pub fn session() -> Self {
        Self { entity: EntityKind::Session, scope: "me".into() }
    }

    pub fn notifications() -> Self {
        Self { entity: EntityKind::Notifications, scope: "me".into() }
    }

    pub fn reports(scope: &ReportScope) -> Self {
        Self { entity: EntityKind::Reports, scope: scope.as_query().into() }
    }

    pub fn report(id: Uuid) -> Self {
        Self { entity: EntityKind::Report, scope: id.to_string() }
    }
}

/// Every client-initiated mutation, with the queries it makes stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SendMessage(ConversationKey),
    Transition { report_id: Uuid },
    AssignAndAdvance { report_id: Uuid },
    DeleteNotification(u64),
    MarkNotificationRead(u64),
}

impl Mutation {
    pub fn invalidates(&self) -> Vec<QueryKey> {
        let all_lists = [
            ReportScope::Mine,
            ReportScope::Pending,
            ReportScope::Assigned,
            ReportScope::All,
        ];
        match self {
            // Conversations live in their own view, not in the cache.
            Self::SendMessage(_) => vec![],
            Self::Transition { report_id } | Self::AssignAndAdvance { report_id } => {
                let mut keys = vec![QueryKey::report(*report_id)];
                keys.extend(all_lists.iter().map(QueryKey::reports));
                keys
            }
            Self::DeleteNotification(_) | Self::MarkNotificationRead(_) => {
                vec![QueryKey::notifications()]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cached {
    Session(Session),
    Notifications(Vec<Notification>),
    Reports(Vec<Report>),
    Report(Report),
}

/// Values that can live in the cache.
pub trait CacheValue: Sized + Clone {
    fn wrap(self) -> Cached;
    fn peek(cached: &Cached) -> Option<&Self>;
}

macro_rules! cache_value {
    ($ty:ty, $variant:ident) => {
        impl CacheValue for $ty {
            fn wrap(self) -> Cached {
                Cached::$variant(self)
            }

            fn peek(cached: &Cached) -> Option<&Self> {
                match cached {
                    Cached::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

cache_value!(Session, Session);
cache_value!(Vec<Notification>, Notifications);
cache_value!(Vec<Report>, Reports);
cache_value!(Report, Report);

#[derive(Debug, Clone)]
struct Entry {
    value: Cached,
    stale: bool,
    fetched_at: DateTime<Utc>,
}

/// The process-wide shared state: session profile, notification list and
/// report snapshots. Written only by the mutation and fetch paths.
#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put<T: CacheValue>(&self, key: QueryKey, value: T) {
        self.entries().insert(
            key,
            Entry {
                value: value.wrap(),
                stale: false,
                fetched_at: Utc::now(),
            },
        );
    }

    /// Returns a copy of the cached value, fresh or stale.
    pub fn get<T: CacheValue>(&self, key: &QueryKey) -> Option<T> {
        self.entries()
            .get(key)
            .and_then(|entry| T::peek(&entry.value).cloned())
    }

    /// Update a cached value in place. No-op when the key is absent.
    pub fn update<T: CacheValue>(&self, key: &QueryKey, f: impl FnOnce(&mut T)) -> bool {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        let Some(mut value) = T::peek(&entry.value).cloned() else {
            return false;
        };
        f(&mut value);
        entry.value = value.wrap();
        true
    }

    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries().get(key).is_none_or(|entry| entry.stale)
    }

    pub fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries().get(key).map(|entry| entry.fetched_at)
    }

    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.entries().get_mut(key) {
            entry.stale = true;
        }
    }

    /// Mark every query the mutation affects as stale.
    pub fn invalidate_for(&self, mutation: &Mutation) {
        let keys = mutation.invalidates();
        let mut entries = self.entries();
        for key in &keys {
            if let Some(entry) = entries.get_mut(key) {
                entry.stale = true;
            }
        }
        debug!("{:?} invalidated {} queries", mutation, keys.len());
    }

    /// Session end.
    pub fn clear(&self) {
        self.entries().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_types::models::Role;

    fn notification(id: u64) -> Notification {
        Notification {
            id,
            content: format!("n{id}"),
            created_at: Utc::now(),
            is_read: false,
        }
    }

    #[test]
    fn typed_round_trip_and_kind_mismatch() {
        let cache = QueryCache::new();
        cache.put(QueryKey::notifications(), vec![notification(1)]);

        let list: Vec<Notification> = cache.get(&QueryKey::notifications()).unwrap();
        assert_eq!(list.len(), 1);
        assert!(cache.get::<Vec<Report>>(&QueryKey::notifications()).is_none());
    }

    #[test]
    fn notification_mutations_only_touch_notifications() {
        let cache = QueryCache::new();
        cache.put(QueryKey::notifications(), vec![notification(1)]);
        cache.put(
            QueryKey::session(),
            Session {
                actor_id: Uuid::new_v4(),
                role: Role::Officer,
                display_name: "Officer Reyes".into(),
            },
        );

        cache.invalidate_for(&Mutation::DeleteNotification(1));
        assert!(cache.is_stale(&QueryKey::notifications()));
        assert!(!cache.is_stale(&QueryKey::session()));
    }

    #[test]
    fn report_mutations_touch_report_and_lists() {
        let id = Uuid::new_v4();
        let keys = Mutation::AssignAndAdvance { report_id: id }.invalidates();
        assert!(keys.contains(&QueryKey::report(id)));
        assert!(keys.contains(&QueryKey::reports(&ReportScope::Pending)));
        assert!(!keys.contains(&QueryKey::notifications()));
    }

    #[test]
    fn missing_entries_count_as_stale() {
        let cache = QueryCache::new();
        assert!(cache.is_stale(&QueryKey::session()));
        cache.put(QueryKey::notifications(), Vec::<Notification>::new());
        cache.clear();
        assert!(cache.get::<Vec<Notification>>(&QueryKey::notifications()).is_none());
    }
}
