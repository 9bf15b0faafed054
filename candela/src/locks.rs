use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::Mutex;

/// One async mutex per key, created on first use.
///
/// Holders of different keys never contend; holders of the same key are
/// served in FIFO order.
pub struct KeyedLocks<K, V> {
    map: Mutex<HashMap<K, Arc<Mutex<V>>>>,
}

impl<K, V> Default for KeyedLocks<K, V> {
    fn default() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Default> KeyedLocks<K, V> {
    /// The mutex guarding `key`.
    pub async fn get(&self, key: K) -> Arc<Mutex<V>> {
        let mut map = self.map.lock().await;
        Arc::clone(map.entry(key).or_default())
    }
}
