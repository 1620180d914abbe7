// Data source trait for sensor readings
use crate::application::error::FetchError;
use crate::domain::data_type::DataType;
use crate::domain::telemetry::{AmbientTemperature, AveragingWindow, TimeSeries};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One logical fetch. `sequence` orders requests by issue time.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub sequence: u64,
    pub package_id: String,
    pub data_type: DataType,
    pub averaging_window: AveragingWindow,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// Fetch the time series described by `request`
    async fn fetch_series(&self, request: &FetchRequest) -> Result<TimeSeries, FetchError>;

    /// Fetch ambient temperature samples for the same window.
    /// Sources without an ambient endpoint return `Ok(None)`.
    async fn fetch_ambient_temperature(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Option<Vec<AmbientTemperature>>, FetchError>;
}
