//! Confluo cache system.
//!
//! One TTL-bounded slot for the resolved collection, a bounded per-slug LRU,
//! and single-flight de-duplication of concurrent loads. Invalidations bump
//! a generation counter that fences in-flight loads out of the cache.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `confluo.toml`:
//!
//! ```toml
//! [cache]
//! ttl_seconds = 300
//! slug_limit = 64
//! ```

mod clock;
mod config;
mod flight;
pub(crate) mod lock;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use flight::FlightGroup;
pub use store::{CacheEntry, ContentCache, Generation, TtlCache};
