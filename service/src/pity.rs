use arcade_types::GachaPityState;
use std::sync::Arc;
use tracing::warn;

use crate::{
    store::{PityCache, PityStore},
    StoreError,
};

/// Pity counters: durable store authoritative, cache mirrors a request in flight.
pub struct PityManager<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
}

impl<S, C> Clone for PityManager<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S: PityStore, C: PityCache> PityManager<S, C> {
    pub fn new(store: Arc<S>, cache: Arc<C>) -> Self {
        Self { store, cache }
    }

    /// Counters from the durable store, zeroed for a pair that has never pulled.
    pub async fn load(
        &self,
        machine_id: i64,
        player_id: i64,
    ) -> Result<GachaPityState, StoreError> {
        Ok(self
            .store
            .load_pity(machine_id, player_id)
            .await?
            .unwrap_or_else(|| GachaPityState::fresh(machine_id, player_id)))
    }

    /// Mirrors intermediate counters to the cache. Failures are logged and dropped.
    pub async fn stage(&self, state: &GachaPityState) {
        if let Err(err) = self.cache.stage_pity(state).await {
            warn!(
                machine_id = state.machine_id,
                player_id = state.player_id,
                ?err,
                "failed to stage pity counters"
            );
        }
    }

    /// Drops the cached mirror. Failures are logged and dropped.
    pub async fn discard(&self, machine_id: i64, player_id: i64) {
        if let Err(err) = self.cache.delete_pity(machine_id, player_id).await {
            warn!(machine_id, player_id, ?err, "failed to drop staged pity counters");
        }
    }

    /// Persists final counters and drops the cached mirror.
    pub async fn commit(&self, state: &GachaPityState) -> Result<(), StoreError> {
        self.store.save_pity(*state).await?;
        self.discard(state.machine_id, state.player_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryCache, MemoryStore};

    fn manager() -> (PityManager<MemoryStore, MemoryCache>, Arc<MemoryStore>, Arc<MemoryCache>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new());
        (
            PityManager::new(Arc::clone(&store), Arc::clone(&cache)),
            store,
            cache,
        )
    }

    #[tokio::test]
    async fn load_synthesises_zeroed_counters() {
        let (pity, _, _) = manager();
        assert_eq!(pity.load(3, 9).await.unwrap(), GachaPityState::fresh(3, 9));
    }

    #[tokio::test]
    async fn stage_writes_cache_only() {
        let (pity, store, cache) = manager();
        let state = GachaPityState {
            super_rare_pity_count: 4,
            ultra_rare_pity_count: 12,
            ..GachaPityState::fresh(3, 9)
        };
        pity.stage(&state).await;

        assert_eq!(cache.cached_pity(3, 9).await.unwrap(), Some(state));
        assert_eq!(store.load_pity(3, 9).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stage_failures_are_swallowed() {
        let (pity, _, cache) = manager();
        cache.set_offline(true);
        pity.stage(&GachaPityState::fresh(1, 1)).await;
    }

    #[tokio::test]
    async fn commit_persists_and_invalidates() {
        let (pity, store, cache) = manager();
        let state = GachaPityState {
            super_rare_pity_count: 1,
            ultra_rare_pity_count: 2,
            ..GachaPityState::fresh(3, 9)
        };
        pity.stage(&state).await;
        pity.commit(&state).await.unwrap();

        assert_eq!(store.load_pity(3, 9).await.unwrap(), Some(state));
        assert_eq!(cache.cached_pity(3, 9).await.unwrap(), None);
        assert_eq!(pity.load(3, 9).await.unwrap(), state);
    }

    #[tokio::test]
    async fn commit_failures_surface() {
        let (pity, store, _) = manager();
        store.set_offline(true);
        assert!(matches!(
            pity.commit(&GachaPityState::fresh(1, 1)).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
