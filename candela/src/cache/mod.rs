//! Range cache and its persistence backends.

mod range;
mod store;

pub use range::RangeCache;
pub use store::{CacheEntry, CacheKey, CandleStore, FileStore, MemoryStore};
pub(crate) use store::write_atomic;
