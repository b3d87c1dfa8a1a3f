use crate::core::currency::{Currency, RateDate, RateMap, RateSource};
use crate::core::error::FetchError;
use crate::providers::util::{RetryPolicy, Sleeper, TokioSleeper, with_backoff};
use crate::store::{CacheKey, CacheStore};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: Option<RateMap>,
}

/// Exchange rates from an apilayer-style `/{date}?base={CODE}` API, backed by
/// the on-disk [`CacheStore`].
pub struct ExchangeRatesProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    store: CacheStore,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl ExchangeRatesProvider {
    pub fn new(base_url: &str, api_key: &str, store: CacheStore) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxr/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ExchangeRatesProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            store,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    fn endpoint(&self, base: Currency, date: RateDate) -> String {
        format!("{}/{}?base={}", self.base_url, date, base)
    }

    async fn request(&self, url: &str) -> Result<RateMap, FetchError> {
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let text = response.text().await?;
        let data: RatesResponse = serde_json::from_str(&text)?;
        Ok(data.rates.unwrap_or_default())
    }
}

#[async_trait]
impl RateSource for ExchangeRatesProvider {
    #[instrument(name = "RatesFetch", skip(self), fields(base = %base, date = %date))]
    async fn fetch_rates(&self, base: Currency, date: RateDate) -> Result<RateMap, FetchError> {
        let key = CacheKey::new(base, date);
        if let Some(cached) = self.store.load()?.get(&key) {
            return Ok(cached.clone());
        }

        let url = self.endpoint(base, date);
        debug!("Requesting exchange rates from {}", url);
        let rates = with_backoff(&self.policy, self.sleeper.as_ref(), |attempt| {
            debug!(attempt, "GET {}", url);
            self.request(&url)
        })
        .await?;

        // An empty map would pin this key to "no data" forever
        if rates.is_empty() {
            warn!("Response for {} carried no rates", key);
            return Ok(rates);
        }
        if let Some((code, rate)) = rates.first_invalid() {
            warn!("Response for {} has {} rate {}, not caching", key, code, rate);
            return Err(FetchError::InvalidRate {
                code: code.to_string(),
                rate,
            });
        }

        self.store.put(key, rates.clone()).await?;
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::util::tests::RecordingSleeper;
    use chrono::NaiveDate;
    use std::time::Duration;
    use tempfile::{TempDir, tempdir};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RATES_BODY: &str = r#"{
        "success": true,
        "base": "USD",
        "date": "2024-01-05",
        "rates": {"EUR": 0.9132, "GBP": 0.7868, "JPY": 144.6}
    }"#;

    fn jan(d: u32) -> RateDate {
        RateDate::On(NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
    }

    fn provider(
        server: &MockServer,
        dir: &TempDir,
        sleeper: Arc<RecordingSleeper>,
    ) -> ExchangeRatesProvider {
        let store = CacheStore::new(dir.path().join("rates.json"));
        ExchangeRatesProvider::new(&server.uri(), "test-key", store)
            .unwrap()
            .with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_successful_fetch_sends_credentials_and_base() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let provider = provider(&server, &dir, Arc::default());

        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .and(query_param("base", "USD"))
            .and(header("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RATES_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let rates = provider.fetch_rates(Currency::Usd, jan(5)).await.unwrap();
        assert_eq!(rates.get("EUR"), Some(0.9132));
        assert_eq!(rates.len(), 3);
    }

    #[tokio::test]
    async fn test_latest_uses_latest_endpoint() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let provider = provider(&server, &dir, Arc::default());

        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", "EUR"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"rates": {"USD": 1.09}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let rates = provider
            .fetch_rates(Currency::Eur, RateDate::Latest)
            .await
            .unwrap();
        assert_eq!(rates.get("USD"), Some(1.09));
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let provider = provider(&server, &dir, Arc::default());

        // wiremock verifies on drop that each key hit the network exactly once
        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RATES_BODY))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2024-01-06"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RATES_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let first = provider.fetch_rates(Currency::Usd, jan(5)).await.unwrap();
        let second = provider.fetch_rates(Currency::Usd, jan(5)).await.unwrap();
        provider.fetch_rates(Currency::Usd, jan(6)).await.unwrap();
        provider.fetch_rates(Currency::Usd, jan(6)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.store().load().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cache_survives_a_new_provider() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();

        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RATES_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let first = provider(&server, &dir, Arc::default())
            .fetch_rates(Currency::Usd, jan(5))
            .await
            .unwrap();
        let second = provider(&server, &dir, Arc::default())
            .fetch_rates(Currency::Usd, jan(5))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rate_limited_requests_back_off_then_succeed() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let provider = provider(&server, &dir, Arc::clone(&sleeper));

        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(3)
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RATES_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let rates = provider.fetch_rates(Currency::Usd, jan(5)).await.unwrap();

        assert_eq!(rates.get("GBP"), Some(0.7868));
        assert_eq!(
            sleeper.delays(),
            vec![
                Duration::from_secs(20),
                Duration::from_secs(40),
                Duration::from_secs(60)
            ]
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_cache_untouched() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let sleeper = Arc::new(RecordingSleeper::default());
        let provider = provider(&server, &dir, Arc::clone(&sleeper));

        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&server)
            .await;

        let result = provider.fetch_rates(Currency::Usd, jan(5)).await;

        assert!(matches!(
            result,
            Err(FetchError::Exhausted { attempts: 5, .. })
        ));
        assert_eq!(sleeper.delays(), vec![Duration::from_secs(10); 4]);
        assert!(!provider.store().path().exists());
    }

    #[tokio::test]
    async fn test_malformed_body_is_retried_then_fails() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let provider = provider(&server, &dir, Arc::default())
            .with_policy(RetryPolicy {
                max_attempts: 2,
                ..RetryPolicy::default()
            });

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(2)
            .mount(&server)
            .await;

        let err = provider
            .fetch_rates(Currency::Usd, RateDate::Latest)
            .await
            .unwrap_err();
        match err {
            FetchError::Exhausted { last, .. } => assert!(matches!(*last, FetchError::Decode(_))),
            other => panic!("Expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_rates_field_is_empty_and_not_cached() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let provider = provider(&server, &dir, Arc::default());

        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"success": false, "error": {"code": 302}}"#),
            )
            .expect(2)
            .mount(&server)
            .await;

        let first = provider.fetch_rates(Currency::Usd, jan(5)).await.unwrap();
        let second = provider.fetch_rates(Currency::Usd, jan(5)).await.unwrap();

        assert!(first.is_empty());
        assert!(second.is_empty());
        assert!(provider.store().load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_rate_is_rejected_and_not_cached() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let provider = provider(&server, &dir, Arc::default());

        Mock::given(method("GET"))
            .and(path("/2024-01-05"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"rates": {"EUR": 0.91, "GBP": 0.0}}"#),
            )
            .expect(2)
            .mount(&server)
            .await;

        for _ in 0..2 {
            let err = provider
                .fetch_rates(Currency::Usd, jan(5))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                FetchError::InvalidRate { ref code, rate } if code == "GBP" && rate == 0.0
            ));
        }
        assert!(!dir.path().join("rates.json").exists());
    }

    #[tokio::test]
    async fn test_malformed_cache_fails_before_network() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("rates.json"), "[1, 2").unwrap();
        let provider = provider(&server, &dir, Arc::default());

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RATES_BODY))
            .expect(0)
            .mount(&server)
            .await;

        let result = provider.fetch_rates(Currency::Usd, jan(5)).await;
        assert!(matches!(result, Err(FetchError::Store(_))));
    }
}
