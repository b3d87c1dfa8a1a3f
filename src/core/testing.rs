use crate::core::currency::{Currency, RateDate, RateMap, RateSource};
use crate::core::error::FetchError;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory rate source that counts calls and fails every date it has no data for.
pub struct StubRates {
    rates: HashMap<(Currency, RateDate), RateMap>,
    calls: AtomicUsize,
    requested: Mutex<Vec<(Currency, RateDate)>>,
}

impl StubRates {
    pub fn new() -> Self {
        Self {
            rates: HashMap::new(),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, base: Currency, date: RateDate, rates: &[(&str, f64)]) -> Self {
        self.rates
            .insert((base, date), rates.iter().map(|(k, v)| (*k, *v)).collect());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<(Currency, RateDate)> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl RateSource for StubRates {
    async fn fetch_rates(&self, base: Currency, date: RateDate) -> Result<RateMap, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push((base, date));
        self.rates
            .get(&(base, date))
            .cloned()
            .ok_or(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
    }
}
