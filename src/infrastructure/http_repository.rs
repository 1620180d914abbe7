// HTTP data API repository implementation
use crate::application::error::FetchError;
use crate::application::telemetry_repository::{FetchRequest, TelemetryRepository};
use crate::domain::telemetry::{AmbientTemperature, TimeSeries};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: reqwest::Client,
    base_url: String,
    ambient_temperature_path: Option<String>,
}

impl HttpRepository {
    pub fn new(base_url: String, ambient_temperature_path: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            ambient_temperature_path: ambient_temperature_path
                .map(|path| path.trim_matches('/').to_string()),
        }
    }

    fn format_time(time: DateTime<Utc>) -> String {
        urlencoding::encode(&time.to_rfc3339_opts(SecondsFormat::Micros, true)).into_owned()
    }

    fn build_series_url(&self, request: &FetchRequest) -> String {
        format!(
            "{}/{}/{}/?averaging-window={}&start-time={}&end-time={}",
            self.base_url,
            request.package_id,
            request.data_type,
            urlencoding::encode(&request.averaging_window.query_value()),
            Self::format_time(request.start_time),
            Self::format_time(request.end_time)
        )
    }

    fn build_ambient_url(&self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Option<String> {
        self.ambient_temperature_path.as_ref().map(|path| {
            format!(
                "{}/{}/?start-time={}&end-time={}",
                self.base_url,
                path,
                Self::format_time(start_time),
                Self::format_time(end_time)
            )
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("media-type", "application/json")
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TelemetryRepository for HttpRepository {
    async fn fetch_series(&self, request: &FetchRequest) -> Result<TimeSeries, FetchError> {
        let url = self.build_series_url(request);
        self.get_json(&url).await
    }

    async fn fetch_ambient_temperature(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Option<Vec<AmbientTemperature>>, FetchError> {
        match self.build_ambient_url(start_time, end_time) {
            Some(url) => self.get_json(&url).await.map(Some),
            None => Ok(None),
        }
    }
}
