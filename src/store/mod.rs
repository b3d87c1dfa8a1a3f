pub mod disk;

pub use disk::{CacheKey, CacheStore, RateCache};
