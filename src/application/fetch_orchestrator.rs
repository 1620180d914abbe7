// Fetch orchestration - Sequence numbering and stale-response suppression
use crate::application::error::FetchError;
use crate::application::telemetry_repository::{FetchRequest, TelemetryRepository};
use crate::domain::telemetry::{AmbientTemperature, TimeSeries};
use std::sync::Arc;

/// Result of one fetch: the series plus any ambient samples for its window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedData {
    pub series: TimeSeries,
    pub ambient: Vec<AmbientTemperature>,
}

/// The series currently visible, with the request that produced it.
#[derive(Debug, Clone)]
pub struct CommittedSeries {
    pub request: FetchRequest,
    pub series: Arc<TimeSeries>,
    pub ambient: Arc<Vec<AmbientTemperature>>,
}

/// What happened to a settled fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Committed,
    Failed,
    Stale,
}

/// Fetch bookkeeping. Only the request with the highest issued sequence
/// number (the authoritative one) may change `committed`.
#[derive(Debug, Clone, Default)]
pub struct FetchState {
    latest_issued: u64,
    authoritative: Option<FetchRequest>,
    is_loading: bool,
    committed: Option<CommittedSeries>,
    last_error: Option<FetchError>,
}

impl FetchState {
    pub fn next_sequence(&self) -> u64 {
        self.latest_issued + 1
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn authoritative(&self) -> Option<&FetchRequest> {
        self.authoritative.as_ref()
    }

    pub fn committed(&self) -> Option<&CommittedSeries> {
        self.committed.as_ref()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Record a newly issued request. Returns false if its sequence number
    /// is not newer than every request issued so far.
    pub fn issue(&mut self, request: FetchRequest) -> bool {
        if request.sequence <= self.latest_issued {
            return false;
        }
        self.latest_issued = request.sequence;
        self.authoritative = Some(request);
        self.is_loading = true;
        true
    }

    pub fn settle(&mut self, sequence: u64, result: Result<FetchedData, FetchError>) -> Settlement {
        let request = match &self.authoritative {
            Some(request) if request.sequence == sequence => request.clone(),
            _ => return Settlement::Stale,
        };

        self.is_loading = false;

        match result {
            Ok(data) => {
                self.committed = Some(CommittedSeries {
                    request,
                    series: Arc::new(data.series),
                    ambient: Arc::new(data.ambient),
                });
                self.last_error = None;
                Settlement::Committed
            }
            Err(err) => {
                self.last_error = Some(err);
                Settlement::Failed
            }
        }
    }
}

/// Performs the network side of a fetch. Holds no state of its own.
#[derive(Clone)]
pub struct FetchOrchestrator {
    repository: Arc<dyn TelemetryRepository>,
}

impl FetchOrchestrator {
    pub fn new(repository: Arc<dyn TelemetryRepository>) -> Self {
        Self { repository }
    }

    /// Fetch the series and the ambient samples concurrently. A failed
    /// ambient fetch only drops the ambient samples.
    pub async fn perform(&self, request: &FetchRequest) -> Result<FetchedData, FetchError> {
        let (series, ambient) = futures::future::join(
            self.repository.fetch_series(request),
            self.repository
                .fetch_ambient_temperature(request.start_time, request.end_time),
        )
        .await;

        let series = series?;
        let ambient = match ambient {
            Ok(samples) => samples.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    "Ambient temperature unavailable for request {}: {}",
                    request.sequence,
                    e
                );
                Vec::new()
            }
        };

        Ok(FetchedData { series, ambient })
    }
}
