use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::cache::CacheInner;
use crate::entry::EntryId;
use crate::types::{CacheKey, CachedValue};

/// An owning handle to a cached value.
///
/// Each handle returned by [`get`](crate::CountingMemoryCache::get) or
/// [`put`](crate::CountingMemoryCache::put) holds one client reference on its
/// entry. The value is guaranteed to stay valid until the handle, and every
/// clone of it, has been dropped. Clones share the client reference.
pub struct CacheRef<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    // Field order matters: the value must be dropped before the client
    // reference is released.
    value: Arc<V>,
    client: Arc<ClientReference<K, V>>,
}

impl<K, V> CacheRef<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    pub(crate) fn new(cache: Arc<CacheInner<K, V>>, key: K, id: EntryId, value: Arc<V>) -> Self {
        Self {
            value,
            client: Arc::new(ClientReference { cache, key, id }),
        }
    }

    /// The key the value was cached under.
    pub fn key(&self) -> &K {
        &self.client.key
    }

    /// Gives the client reference back to the cache. Equivalent to dropping
    /// the handle.
    pub fn release(self) {
        drop(self)
    }
}

impl<K, V> Clone for CacheRef<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            client: self.client.clone(),
        }
    }
}

impl<K, V> Deref for CacheRef<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<K, V> fmt::Debug for CacheRef<K, V>
where
    K: CacheKey + fmt::Debug,
    V: CachedValue,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRef")
            .field("key", &self.client.key)
            .field("entry", &self.client.id)
            .finish()
    }
}

/// One client reference on an entry, released when the last handle sharing
/// it goes away.
struct ClientReference<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    cache: Arc<CacheInner<K, V>>,
    key: K,
    id: EntryId,
}

impl<K, V> Drop for ClientReference<K, V>
where
    K: CacheKey,
    V: CachedValue,
{
    fn drop(&mut self) {
        // Faults are logged by the cache; there is nobody to return them to.
        let _ = self.cache.release_client_reference(&self.key, self.id);
    }
}
