use crate::{
    Config, FetchError,
    backend::http::HttpBackend,
    model::{City, WeatherQuery, WeatherRecord},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod http;

/// The two read resources the page consumes, plus the write endpoints the
/// backend exposes for managing cities.
#[async_trait]
pub trait WeatherBackend: Send + Sync + Debug {
    /// `GET /cities`
    async fn fetch_cities(&self) -> Result<Vec<City>, FetchError>;

    /// `GET /weather?city_id=..&start_date=..&end_date=..&unit=..`
    async fn fetch_weather(&self, query: &WeatherQuery) -> Result<Vec<WeatherRecord>, FetchError>;

    /// `POST /cities`
    async fn create_city(&self, name: &str) -> Result<City, FetchError>;

    /// `POST /weather/fetch`: ask the backend to pull fresh data for a city.
    async fn request_refresh(&self, city_name: &str) -> Result<(), FetchError>;
}

/// Construct the HTTP backend described by `config`.
pub fn backend_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherBackend>> {
    let backend = HttpBackend::new(&config.base_url, config.timeout())?;
    Ok(Arc::new(backend))
}
