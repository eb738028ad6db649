//! stratus-cache — bounded caches for the scrape engine.
//!
//! Each cache is constructed once with a capacity and a TTL and is safe for
//! concurrent use from parallel scrapes. There is deliberately no single-flight
//! de-duplication: two scrapes that miss the same key both recompute and both
//! write, last write wins.

mod ttl;

pub use ttl::{CacheStats, TtlCache};
