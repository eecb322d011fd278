use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::instrument;

use crate::{
    FetchError,
    model::{City, CityCreate, RefreshPayload, WeatherQuery, WeatherRecord},
};

use super::WeatherBackend;

const CITIES: &str = "cities";
const WEATHER: &str = "weather";
const WEATHER_FETCH: &str = "weather/fetch";

/// JSON-over-HTTP backend rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    http: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url)
            .with_context(|| format!("Invalid backend base URL: {base_url}"))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl WeatherBackend for HttpBackend {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_cities(&self) -> Result<Vec<City>, FetchError> {
        let res = self
            .http
            .get(self.endpoint(CITIES))
            .send()
            .await
            .map_err(|source| FetchError::Transport { resource: CITIES, source })?;

        read_json(CITIES, res).await
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_weather(&self, query: &WeatherQuery) -> Result<Vec<WeatherRecord>, FetchError> {
        let res = self
            .http
            .get(self.endpoint(WEATHER))
            .query(&query.params()[..])
            .send()
            .await
            .map_err(|source| FetchError::Transport { resource: WEATHER, source })?;

        read_json(WEATHER, res).await
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn create_city(&self, name: &str) -> Result<City, FetchError> {
        let res = self
            .http
            .post(self.endpoint(CITIES))
            .json(&CityCreate { name })
            .send()
            .await
            .map_err(|source| FetchError::Transport { resource: CITIES, source })?;

        read_json(CITIES, res).await
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn request_refresh(&self, city_name: &str) -> Result<(), FetchError> {
        let res = self
            .http
            .post(self.endpoint(WEATHER_FETCH))
            .json(&RefreshPayload { city_name })
            .send()
            .await
            .map_err(|source| FetchError::Transport { resource: WEATHER_FETCH, source })?;

        read_body(WEATHER_FETCH, res).await.map(|_| ())
    }
}

/// Read the whole body, failing on non-2xx statuses.
async fn read_body(resource: &'static str, res: Response) -> Result<String, FetchError> {
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| FetchError::Transport { resource, source })?;

    if !status.is_success() {
        return Err(FetchError::Status {
            resource,
            status,
            body: truncate_body(&body),
        });
    }

    Ok(body)
}

async fn read_json<T: DeserializeOwned>(
    resource: &'static str,
    res: Response,
) -> Result<T, FetchError> {
    let body = read_body(resource, res).await?;
    serde_json::from_str(&body).map_err(|source| FetchError::Parse { resource, source })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
