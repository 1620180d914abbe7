// Visualization controller - Composes fetch, modes and derived state for one package
use crate::application::controller_state::{reduce, ControllerEvent, ControllerState, Outcome};
use crate::application::derived_state::{
    compute_data_range, compute_model_scale, compute_sensor_colours, Palette, ScaleTable,
};
use crate::application::error::{ConfigurationError, FetchError};
use crate::application::fetch_orchestrator::FetchOrchestrator;
use crate::application::live_status::{LiveStatusTracker, Subscription};
use crate::application::mode_controller::{ModeController, ModeRejection};
use crate::application::telemetry_repository::{FetchRequest, TelemetryRepository};
use crate::domain::data_type::DataType;
use crate::domain::mode::{ModeToggle, RenderMode, TimeMode};
use crate::domain::package::Package;
use crate::domain::presentation::{
    CameraHints, ChartView, ColourMode, ModelOptions, ModelView, ViewModel,
};
use crate::domain::telemetry::{AveragingWindow, TimeSeries};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Static presentation settings for one controller.
#[derive(Debug, Clone, Default)]
pub struct ControllerSettings {
    pub palette: Palette,
    pub scales: ScaleTable,
    pub camera: CameraHints,
    pub colour_mode: ColourMode,
    pub show_context: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// This refresh was authoritative and its series is now visible.
    Committed(Arc<TimeSeries>),
    /// A newer refresh was issued before this one settled.
    Superseded,
}

/// Owns the state for a single package. All state changes go through
/// [`reduce`] while holding the state lock, which is never held across
/// an await point.
pub struct VisualizationController {
    package: Package,
    settings: ControllerSettings,
    orchestrator: FetchOrchestrator,
    state: Mutex<ControllerState>,
    tracker: LiveStatusTracker,
    _live_subscription: Subscription,
}

impl VisualizationController {
    pub fn new(
        package: Package,
        settings: ControllerSettings,
        repository: Arc<dyn TelemetryRepository>,
        tracker: &LiveStatusTracker,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let package_id = package.id.clone();
            let live_subscription = tracker.subscribe(move |live_set| {
                if let Some(controller) = weak.upgrade() {
                    controller.on_live_set_changed(live_set.contains(&package_id));
                }
            });

            let state = ControllerState {
                modes: ModeController::new(tracker.is_live(&package.id)),
                show_context: settings.show_context,
                colour_mode: settings.colour_mode,
                ..ControllerState::default()
            };

            Self {
                package,
                settings,
                orchestrator: FetchOrchestrator::new(repository),
                state: Mutex::new(state),
                tracker: tracker.clone(),
                _live_subscription: live_subscription,
            }
        })
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn apply(&self, state: &mut ControllerState, event: ControllerEvent) -> Outcome {
        let (next, outcome) = reduce(std::mem::take(state), event, &self.settings.palette);
        *state = next;
        outcome
    }

    /// Fetch a window of data. Only the most recently issued refresh may
    /// change what is visible; older ones resolve to `Superseded`.
    pub async fn refresh(
        &self,
        data_type: DataType,
        averaging_window: AveragingWindow,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<RefreshOutcome, FetchError> {
        if start_time > end_time {
            return Err(FetchError::InvalidWindow {
                start: start_time,
                end: end_time,
            });
        }

        let request = {
            let mut state = self.lock();
            let request = FetchRequest {
                sequence: state.fetch.next_sequence(),
                package_id: self.package.id.clone(),
                data_type,
                averaging_window,
                start_time,
                end_time,
            };
            self.apply(&mut state, ControllerEvent::FetchIssued(request.clone()));
            request
        };

        tracing::debug!(
            "Issued fetch {} for {} ({}, {} to {})",
            request.sequence,
            self.package.id,
            data_type,
            start_time,
            end_time
        );

        let result = self.orchestrator.perform(&request).await;
        let error = result.as_ref().err().cloned();

        let mut state = self.lock();
        let outcome = self.apply(
            &mut state,
            ControllerEvent::FetchSettled {
                sequence: request.sequence,
                result,
            },
        );

        match (outcome, error) {
            (Outcome::Committed, _) => {
                let series = state
                    .fetch
                    .committed()
                    .map(|c| c.series.clone())
                    .unwrap_or_default();
                tracing::debug!(
                    "Committed fetch {} for {}: {} readings",
                    request.sequence,
                    self.package.id,
                    series.len()
                );
                Ok(RefreshOutcome::Committed(series))
            }
            (Outcome::Failed, Some(err)) => {
                tracing::error!(
                    "Fetch {} for {} failed: {}",
                    request.sequence,
                    self.package.id,
                    err
                );
                Err(err)
            }
            _ => {
                tracing::debug!(
                    "Discarding superseded fetch {} for {}",
                    request.sequence,
                    self.package.id
                );
                Ok(RefreshOutcome::Superseded)
            }
        }
    }

    fn on_live_set_changed(&self, is_live: bool) {
        let mut state = self.lock();
        let before = state.modes.time_mode();
        self.apply(&mut state, ControllerEvent::LiveSetChanged { is_live });

        if before != state.modes.time_mode() {
            tracing::info!(
                "{} left the live set, switched to historical",
                self.package.id
            );
        }
    }

    pub fn toggle_mode(&self, toggle: ModeToggle) -> Result<(), ModeRejection> {
        let mut state = self.lock();
        if toggle == ModeToggle::Time(TimeMode::Live) {
            // Going live is checked against the tracker, not the last notification.
            let is_live = self.tracker.is_live(&self.package.id);
            self.apply(&mut state, ControllerEvent::LiveSetChanged { is_live });
        }
        match self.apply(&mut state, ControllerEvent::UserToggledMode(toggle)) {
            Outcome::Rejected(rejection) => {
                tracing::info!(
                    "Rejected mode change {:?} for {}: {}",
                    toggle,
                    self.package.id,
                    rejection
                );
                Err(rejection)
            }
            _ => Ok(()),
        }
    }

    /// Flip a channel's selection. Returns false for an unknown channel.
    pub fn toggle_channel(&self, name: &str) -> bool {
        let mut state = self.lock();
        let outcome = self.apply(&mut state, ControllerEvent::UserToggledChannel(name.to_string()));
        outcome == Outcome::Applied
    }

    pub fn set_model_preferences(&self, show_context: Option<bool>, colour_mode: Option<ColourMode>) {
        let mut state = self.lock();
        self.apply(
            &mut state,
            ControllerEvent::ModelPreferencesChanged {
                show_context,
                colour_mode,
            },
        );
    }

    pub fn render_mode(&self) -> RenderMode {
        self.lock().modes.render_mode()
    }

    pub fn time_mode(&self) -> TimeMode {
        self.lock().modes.time_mode()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().fetch.is_loading()
    }

    /// The most recently issued request, if any.
    pub fn authoritative_request(&self) -> Option<FetchRequest> {
        self.lock().fetch.authoritative().cloned()
    }

    /// Derive the view-model from the committed series.
    pub fn view_model(&self) -> Result<ViewModel, ConfigurationError> {
        let state = self.lock();
        let committed = state.fetch.committed();

        let series = committed.map(|c| c.series.clone()).unwrap_or_default();
        let ambient = committed.map(|c| c.ambient.clone()).unwrap_or_default();
        let data_type = committed
            .map(|c| c.request.data_type)
            .or_else(|| state.fetch.authoritative().map(|r| r.data_type));

        let data_range = compute_data_range(&series);
        let scale = match data_type {
            Some(data_type) => compute_model_scale(
                state.colour_mode,
                data_type,
                data_range,
                &self.settings.scales,
            )?,
            None => data_range,
        };

        Ok(ViewModel {
            package_id: self.package.id.clone(),
            render_mode: state.modes.render_mode(),
            time_mode: state.modes.time_mode(),
            is_live: state.modes.is_live(),
            is_loading: state.fetch.is_loading(),
            data_type,
            camera: self.settings.camera,
            model: ModelView {
                options: ModelOptions {
                    show_context: state.show_context,
                    colour_mode: state.colour_mode,
                    scale,
                },
                sensor_colours: compute_sensor_colours(&series, scale),
            },
            chart: ChartView {
                chart_data: series,
                chart_options: state.channel_options.clone(),
                data_range,
                ambient_temperature: ambient,
            },
            last_error: state.fetch.last_error().map(|e| e.to_string()),
        })
    }
}
