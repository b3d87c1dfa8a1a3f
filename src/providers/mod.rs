pub mod exchangerates;
pub mod util;

pub use exchangerates::ExchangeRatesProvider;
