use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::StoreResult;
use crate::store::{SessionField, SessionKey, SessionMap, SessionStore};

/// In-process session store.
///
/// Sessions idle for longer than the TTL read as empty and are dropped on
/// access. When a capacity is set, the least recently touched session is
/// evicted first.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<MemState>,
    ttl: Option<Duration>,
    capacity: Option<usize>,
}

#[derive(Debug, Default)]
struct MemState {
    sessions: HashMap<SessionKey, Entry>,
    order: VecDeque<SessionKey>,
}

#[derive(Debug)]
struct Entry {
    data: SessionMap,
    touched: Instant,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let mut state = self.inner.lock().await;
        state.purge_expired(self.ttl);
        state.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl MemState {
    fn is_expired(entry: &Entry, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| entry.touched.elapsed() > ttl)
    }

    fn purge_expired(&mut self, ttl: Option<Duration>) {
        if ttl.is_none() {
            return;
        }
        let expired: Vec<SessionKey> = self
            .sessions
            .iter()
            .filter(|(_, entry)| Self::is_expired(entry, ttl))
            .map(|(key, _)| *key)
            .collect();
        for key in expired {
            log::debug!("Session {key} expired");
            self.remove(&key);
        }
    }

    fn remove(&mut self, key: &SessionKey) {
        self.sessions.remove(key);
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    fn touch(&mut self, key: &SessionKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_front(*key);
    }

    /// Live entry for reading; expired entries are dropped.
    fn live(&mut self, key: &SessionKey, ttl: Option<Duration>) -> Option<&mut Entry> {
        let expired = self
            .sessions
            .get(key)
            .is_some_and(|entry| Self::is_expired(entry, ttl));
        if expired {
            log::debug!("Session {key} expired");
            self.remove(key);
            return None;
        }
        self.touch_existing(key);
        let entry = self.sessions.get_mut(key)?;
        entry.touched = Instant::now();
        Some(entry)
    }

    fn touch_existing(&mut self, key: &SessionKey) {
        if self.sessions.contains_key(key) {
            self.touch(key);
        }
    }

    /// Entry for writing, created when missing.
    fn entry(
        &mut self,
        key: &SessionKey,
        ttl: Option<Duration>,
        capacity: Option<usize>,
    ) -> &mut Entry {
        if self.live(key, ttl).is_none() {
            self.sessions.insert(
                *key,
                Entry {
                    data: SessionMap::new(),
                    touched: Instant::now(),
                },
            );
            self.touch(key);
            if let Some(capacity) = capacity {
                while self.order.len() > capacity {
                    if let Some(old) = self.order.pop_back() {
                        log::debug!("Evicting session {old}");
                        self.sessions.remove(&old);
                    }
                }
            }
        }
        self.sessions
            .entry(*key)
            .or_insert_with(|| Entry {
                data: SessionMap::new(),
                touched: Instant::now(),
            })
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &SessionKey, field: &SessionField) -> StoreResult<Option<Vec<u8>>> {
        let mut state = self.inner.lock().await;
        Ok(state
            .live(key, self.ttl)
            .and_then(|entry| entry.data.get(field).cloned()))
    }

    async fn set(&self, key: &SessionKey, field: &SessionField, value: Vec<u8>) -> StoreResult<()> {
        let mut state = self.inner.lock().await;
        state
            .entry(key, self.ttl, self.capacity)
            .data
            .insert(field.clone(), value);
        Ok(())
    }

    async fn delete(&self, key: &SessionKey, field: &SessionField) -> StoreResult<()> {
        let mut state = self.inner.lock().await;
        if let Some(entry) = state.live(key, self.ttl) {
            entry.data.remove(field);
        }
        Ok(())
    }

    async fn get_all(&self, key: &SessionKey) -> StoreResult<SessionMap> {
        let mut state = self.inner.lock().await;
        Ok(state
            .live(key, self.ttl)
            .map(|entry| entry.data.clone())
            .unwrap_or_default())
    }

    async fn set_all(&self, key: &SessionKey, data: SessionMap) -> StoreResult<()> {
        let mut state = self.inner.lock().await;
        state.entry(key, self.ttl, self.capacity).data = data;
        Ok(())
    }

    async fn clear(&self, key: &SessionKey) -> StoreResult<()> {
        let mut state = self.inner.lock().await;
        state.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(user_id: i64) -> SessionKey {
        SessionKey::new(1, user_id)
    }

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let store = MemorySessionStore::new();
        let field = SessionField::scenario("title");

        assert_eq!(store.get(&key(1), &field).await.unwrap(), None);
        store.set(&key(1), &field, b"hello".to_vec()).await.unwrap();
        assert_eq!(
            store.get(&key(1), &field).await.unwrap(),
            Some(b"hello".to_vec())
        );

        store.delete(&key(1), &field).await.unwrap();
        assert_eq!(store.get(&key(1), &field).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sessions_are_isolated_per_user() {
        let store = MemorySessionStore::new();
        store
            .set(&key(1), &SessionField::Mode, b"a".to_vec())
            .await
            .unwrap();
        assert_eq!(store.get(&key(2), &SessionField::Mode).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_all_replaces_and_clear_removes() {
        let store = MemorySessionStore::new();
        store
            .set(&key(1), &SessionField::Mode, b"a".to_vec())
            .await
            .unwrap();

        let mut data = SessionMap::new();
        data.insert(SessionField::History, b"[]".to_vec());
        store.set_all(&key(1), data.clone()).await.unwrap();
        assert_eq!(store.get_all(&key(1)).await.unwrap(), data);

        store.clear(&key(1)).await.unwrap();
        assert!(store.get_all(&key(1)).await.unwrap().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_expire_after_ttl() {
        let store = MemorySessionStore::new().with_ttl(Duration::from_secs(60));
        store
            .set(&key(1), &SessionField::Mode, b"a".to_vec())
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(store.get(&key(1), &SessionField::Mode).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(store.get(&key(1), &SessionField::Mode).await.unwrap(), None);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_touched() {
        let store = MemorySessionStore::new().with_capacity(2);
        for user in 1..=2 {
            store
                .set(&key(user), &SessionField::Mode, b"x".to_vec())
                .await
                .unwrap();
        }
        // Touch user 1 so user 2 becomes the oldest.
        store.get(&key(1), &SessionField::Mode).await.unwrap();
        store
            .set(&key(3), &SessionField::Mode, b"x".to_vec())
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store.get(&key(1), &SessionField::Mode).await.unwrap().is_some());
        assert_eq!(store.get(&key(2), &SessionField::Mode).await.unwrap(), None);
    }
}
