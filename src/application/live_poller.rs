// Live poller - Re-issues the latest request while a package is in live mode
use crate::application::telemetry_repository::FetchRequest;
use crate::application::visualization_controller::{RefreshOutcome, VisualizationController};
use crate::domain::mode::TimeMode;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
pub struct LivePollSettings {
    pub interval: Duration,
    pub window: TimeDelta,
}

pub fn spawn_live_poller(
    controllers: Vec<Arc<VisualizationController>>,
    settings: LivePollSettings,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut poller = LivePoller::new(controllers, settings.window);
        let mut ticker = tokio::time::interval(settings.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            poller.poll_once(Utc::now());
        }
    })
}

/// Keeps at most one poll in flight per package.
pub struct LivePoller {
    controllers: Vec<Arc<VisualizationController>>,
    window: TimeDelta,
    in_flight: HashMap<String, JoinHandle<()>>,
}

impl LivePoller {
    pub fn new(controllers: Vec<Arc<VisualizationController>>, window: TimeDelta) -> Self {
        Self {
            controllers,
            window,
            in_flight: HashMap::new(),
        }
    }

    /// Start a refresh for every live controller that has a previous request
    /// and no poll still running. Each refresh runs in its own task so a slow
    /// package never delays another. Returns how many were started.
    pub fn poll_once(&mut self, now: DateTime<Utc>) -> usize {
        self.in_flight.retain(|_, handle| !handle.is_finished());

        let mut started = 0;
        for controller in &self.controllers {
            if controller.time_mode() != TimeMode::Live {
                continue;
            }
            let id = &controller.package().id;
            if self.in_flight.contains_key(id) {
                tracing::debug!("Previous live poll for {} still running, skipping", id);
                continue;
            }
            let Some(request) = controller.authoritative_request() else {
                continue;
            };

            tracing::debug!("Polling live data for {}", id);
            let handle = tokio::spawn(poll_controller(
                controller.clone(),
                request,
                now - self.window,
                now,
            ));
            self.in_flight.insert(id.clone(), handle);
            started += 1;
        }
        started
    }
}

async fn poll_controller(
    controller: Arc<VisualizationController>,
    request: FetchRequest,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) {
    let result = controller
        .refresh(request.data_type, request.averaging_window, start_time, end_time)
        .await;

    let id = &controller.package().id;
    match result {
        Ok(RefreshOutcome::Committed(series)) => {
            tracing::debug!("Live poll for {} committed {} readings", id, series.len())
        }
        Ok(RefreshOutcome::Superseded) => {
            tracing::debug!("Live poll for {} was superseded", id)
        }
        // Already logged at error by the controller
        Err(err) => tracing::debug!("Live poll for {} failed: {}", id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::FetchError;
    use crate::application::live_status::LiveStatusTracker;
    use crate::application::telemetry_repository::TelemetryRepository;
    use crate::application::visualization_controller::ControllerSettings;
    use crate::domain::data_type::DataType;
    use crate::domain::mode::ModeToggle;
    use crate::domain::package::Package;
    use crate::domain::telemetry::{AmbientTemperature, AveragingWindow, TimeSeries};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    /// Records every request. Once `hang_after` requests have been served,
    /// later fetches never resolve.
    #[derive(Default)]
    struct RecordingRepository {
        requests: Mutex<Vec<FetchRequest>>,
        hang_after: Option<usize>,
    }

    #[async_trait]
    impl TelemetryRepository for RecordingRepository {
        async fn fetch_series(&self, request: &FetchRequest) -> Result<TimeSeries, FetchError> {
            let served = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request.clone());
                requests.len() - 1
            };
            if self.hang_after.is_some_and(|limit| served >= limit) {
                futures::future::pending::<()>().await;
            }
            Ok(TimeSeries::default())
        }

        async fn fetch_ambient_temperature(
            &self,
            _start_time: DateTime<Utc>,
            _end_time: DateTime<Utc>,
        ) -> Result<Option<Vec<AmbientTemperature>>, FetchError> {
            Ok(None)
        }
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2021, 5, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 5, 1, 1, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_poll_once_refreshes_only_live_controllers() {
        let repository = Arc::new(RecordingRepository::default());
        let tracker = LiveStatusTracker::new();
        tracker.set_live_packages(vec!["basement".to_string()]);

        let live = VisualizationController::new(
            Package::new("basement".to_string()),
            ControllerSettings::default(),
            repository.clone(),
            &tracker,
        );
        let historical = VisualizationController::new(
            Package::new("strong-floor".to_string()),
            ControllerSettings::default(),
            repository.clone(),
            &tracker,
        );

        let (start, end) = window();
        let averaging = AveragingWindow::from_secs(60).unwrap();
        for controller in [&live, &historical] {
            controller
                .refresh(DataType::UncompensatedStrain, averaging, start, end)
                .await
                .unwrap();
        }
        live.toggle_mode(ModeToggle::Time(TimeMode::Live)).unwrap();

        let mut poller = LivePoller::new(vec![live.clone(), historical.clone()], TimeDelta::minutes(10));
        let now = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(poller.poll_once(now), 1);
        for (_, handle) in poller.in_flight.drain() {
            handle.await.unwrap();
        }

        {
            let requests = repository.requests.lock().unwrap();
            let polled = requests.last().unwrap();
            assert_eq!(requests.len(), 3);
            assert_eq!(polled.package_id, "basement");
            assert_eq!(polled.sequence, 2);
            assert_eq!(polled.averaging_window, averaging);
            assert_eq!(polled.start_time, now - TimeDelta::minutes(10));
            assert_eq!(polled.end_time, now);
        }

        assert_eq!(poller.poll_once(now), 1);
    }

    #[tokio::test]
    async fn test_poll_once_skips_controllers_without_a_request() {
        let tracker = LiveStatusTracker::new();
        tracker.set_live_packages(vec!["basement".to_string()]);
        let controller = VisualizationController::new(
            Package::new("basement".to_string()),
            ControllerSettings::default(),
            Arc::new(RecordingRepository::default()),
            &tracker,
        );
        controller.toggle_mode(ModeToggle::Time(TimeMode::Live)).unwrap();

        let mut poller = LivePoller::new(vec![controller], TimeDelta::minutes(10));
        assert_eq!(poller.poll_once(Utc::now()), 0);
    }

    #[tokio::test]
    async fn test_hung_poll_is_not_stacked() {
        let repository = Arc::new(RecordingRepository {
            hang_after: Some(1),
            ..RecordingRepository::default()
        });
        let tracker = LiveStatusTracker::new();
        tracker.set_live_packages(vec!["basement".to_string()]);
        let controller = VisualizationController::new(
            Package::new("basement".to_string()),
            ControllerSettings::default(),
            repository.clone(),
            &tracker,
        );
        let (start, end) = window();
        controller
            .refresh(DataType::UncompensatedStrain, AveragingWindow::server_default(), start, end)
            .await
            .unwrap();
        controller.toggle_mode(ModeToggle::Time(TimeMode::Live)).unwrap();

        let mut poller = LivePoller::new(vec![controller], TimeDelta::minutes(10));
        let now = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(poller.poll_once(now), 1);
        for tick in 1..50 {
            tokio::task::yield_now().await;
            assert_eq!(poller.poll_once(now + TimeDelta::seconds(tick)), 0);
        }

        assert_eq!(poller.in_flight.len(), 1);
        assert_eq!(repository.requests.lock().unwrap().len(), 2);
    }
}
