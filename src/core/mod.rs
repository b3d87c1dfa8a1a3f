//! Core business logic abstractions

pub mod config;
pub mod convert;
pub mod currency;
pub mod error;
pub mod log;
pub mod series;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for cleaner imports
pub use currency::{Currency, RateDate, RateMap, RateSource};
pub use error::{ConfigError, ConversionError, FetchError, StoreError, ValidationError};
