pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use cli::plot::{ChartSurface, PngChart};
use cli::prompt::{Prompt, TermPrompt};
use providers::ExchangeRatesProvider;
use store::CacheStore;
use tracing::{debug, info};

/// Everything one session needs: configuration, the cached rate provider and
/// the chart output.
pub struct AppContext {
    pub config: AppConfig,
    pub provider: ExchangeRatesProvider,
    pub chart: Box<dyn ChartSurface>,
}

impl AppContext {
    /// Builds the context, failing early if the rate cache cannot be read.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let cache_path = config.cache_file();
        let store = CacheStore::new(&cache_path);
        let cached = store
            .load()
            .with_context(|| format!("Failed to load rate cache: {}", cache_path.display()))?;
        debug!(entries = cached.len(), "Rate cache at {}", cache_path.display());

        let provider = ExchangeRatesProvider::new(&config.provider.base_url, &config.api_key, store)?
            .with_policy((&config.retry).into());
        let chart = Box::new(PngChart::new(config.chart_file()));

        Ok(AppContext {
            config,
            provider,
            chart,
        })
    }

    pub async fn run_session(&self, prompt: &dyn Prompt) -> Result<()> {
        let today = chrono::Local::now().date_naive();
        cli::run_session(&self.provider, prompt, self.chart.as_ref(), today).await
    }
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config from {}", config_path.unwrap_or("default location"));
    Ok(config)
}

pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("fxr starting...");

    let config = load_config(config_path)?;
    let context = AppContext::from_config(config)?;
    context.run_session(&TermPrompt).await
}
