// Controller state and the reducer that advances it
use crate::application::derived_state::{compute_channel_options, Palette};
use crate::application::error::FetchError;
use crate::application::fetch_orchestrator::{FetchState, FetchedData, Settlement};
use crate::application::mode_controller::{ModeController, ModeRejection};
use crate::application::telemetry_repository::FetchRequest;
use crate::domain::mode::ModeToggle;
use crate::domain::presentation::{ChannelOption, ColourMode};

#[derive(Debug, Clone)]
pub struct ControllerState {
    pub fetch: FetchState,
    pub modes: ModeController,
    pub channel_options: Vec<ChannelOption>,
    pub show_context: bool,
    pub colour_mode: ColourMode,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            fetch: FetchState::default(),
            modes: ModeController::default(),
            channel_options: Vec::new(),
            show_context: true,
            colour_mode: ColourMode::default(),
        }
    }
}

#[derive(Debug)]
pub enum ControllerEvent {
    FetchIssued(FetchRequest),
    FetchSettled {
        sequence: u64,
        result: Result<FetchedData, FetchError>,
    },
    LiveSetChanged {
        is_live: bool,
    },
    UserToggledMode(ModeToggle),
    UserToggledChannel(String),
    ModelPreferencesChanged {
        show_context: Option<bool>,
        colour_mode: Option<ColourMode>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Committed,
    Failed,
    /// A response or request that is no longer authoritative.
    Stale,
    Rejected(ModeRejection),
    UnknownChannel,
}

/// Apply one event. Never performs I/O.
pub fn reduce(
    mut state: ControllerState,
    event: ControllerEvent,
    palette: &Palette,
) -> (ControllerState, Outcome) {
    let outcome = match event {
        ControllerEvent::FetchIssued(request) => {
            if state.fetch.issue(request) {
                Outcome::Applied
            } else {
                Outcome::Stale
            }
        }
        ControllerEvent::FetchSettled { sequence, result } => {
            match state.fetch.settle(sequence, result) {
                Settlement::Committed => {
                    if let Some(committed) = state.fetch.committed() {
                        state.modes.on_series_committed(committed.request.data_type);
                        // Options survive an empty commit; there is nothing to derive them from.
                        if !committed.series.channel_names().is_empty() {
                            state.channel_options =
                                compute_channel_options(&committed.series, palette);
                        }
                    }
                    Outcome::Committed
                }
                Settlement::Failed => Outcome::Failed,
                Settlement::Stale => Outcome::Stale,
            }
        }
        ControllerEvent::LiveSetChanged { is_live } => {
            state.modes.on_live_status(is_live);
            Outcome::Applied
        }
        ControllerEvent::UserToggledMode(toggle) => match state.modes.on_user_toggle(toggle) {
            Ok(()) => Outcome::Applied,
            Err(rejection) => Outcome::Rejected(rejection),
        },
        ControllerEvent::UserToggledChannel(name) => {
            match state.channel_options.iter_mut().find(|o| o.name == name) {
                Some(option) => {
                    option.is_selected = !option.is_selected;
                    Outcome::Applied
                }
                None => Outcome::UnknownChannel,
            }
        }
        ControllerEvent::ModelPreferencesChanged {
            show_context,
            colour_mode,
        } => {
            if let Some(show_context) = show_context {
                state.show_context = show_context;
            }
            if let Some(colour_mode) = colour_mode {
                state.colour_mode = colour_mode;
            }
            Outcome::Applied
        }
    };

    (state, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fetch_orchestrator::tests::request;
    use crate::domain::data_type::DataType;
    use crate::domain::mode::{RenderMode, TimeMode};
    use crate::domain::telemetry::{ChannelValue, SensorReading, TimeSeries};
    use chrono::{TimeZone, Utc};

    fn fetched(channels: &[&str]) -> FetchedData {
        let reading = SensorReading::new(
            Utc.timestamp_opt(0, 0).unwrap(),
            channels
                .iter()
                .map(|name| ChannelValue {
                    name: name.to_string(),
                    value: Some(1.0),
                })
                .collect(),
        );
        FetchedData {
            series: TimeSeries::new(vec![reading]),
            ambient: Vec::new(),
        }
    }

    fn apply(state: ControllerState, event: ControllerEvent) -> (ControllerState, Outcome) {
        reduce(state, event, &Palette::default())
    }

    fn commit(
        state: ControllerState,
        sequence: u64,
        data_type: DataType,
        data: FetchedData,
    ) -> ControllerState {
        let (state, _) = apply(state, ControllerEvent::FetchIssued(request(sequence, data_type)));
        let (state, outcome) = apply(
            state,
            ControllerEvent::FetchSettled {
                sequence,
                result: Ok(data),
            },
        );
        assert_eq!(outcome, Outcome::Committed);
        state
    }

    #[test]
    fn test_raw_commit_forces_chart_mode() {
        let state = ControllerState::default();
        assert_eq!(state.modes.render_mode(), RenderMode::Model);

        let state = commit(state, 1, DataType::RawWavelength, fetched(&["a1"]));
        assert_eq!(state.modes.render_mode(), RenderMode::Chart);
    }

    #[test]
    fn test_channel_options_only_change_on_non_empty_commit() {
        let state = commit(
            ControllerState::default(),
            1,
            DataType::UncompensatedStrain,
            fetched(&["s1", "s2"]),
        );
        assert_eq!(state.channel_options.len(), 2);

        let state = commit(state, 2, DataType::UncompensatedStrain, FetchedData::default());
        assert_eq!(state.channel_options.len(), 2);
        assert!(state.fetch.committed().unwrap().series.is_empty());

        let state = commit(state, 3, DataType::UncompensatedStrain, fetched(&["x"]));
        let names: Vec<_> = state.channel_options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["x"]);
    }

    #[test]
    fn test_stale_settlement_leaves_state_untouched() {
        let (state, _) = apply(
            ControllerState::default(),
            ControllerEvent::FetchIssued(request(1, DataType::UncompensatedStrain)),
        );
        let (state, _) = apply(
            state,
            ControllerEvent::FetchIssued(request(2, DataType::RawWavelength)),
        );
        let (state, outcome) = apply(
            state,
            ControllerEvent::FetchSettled {
                sequence: 1,
                result: Ok(fetched(&["s1"])),
            },
        );

        assert_eq!(outcome, Outcome::Stale);
        assert!(state.channel_options.is_empty());
        assert!(state.fetch.is_loading());
        assert_eq!(state.modes.render_mode(), RenderMode::Model);
    }

    #[test]
    fn test_channel_toggle() {
        let state = commit(
            ControllerState::default(),
            1,
            DataType::UncompensatedStrain,
            fetched(&["s1", "s2", "s3", "s4"]),
        );

        let (state, outcome) = apply(state, ControllerEvent::UserToggledChannel("s4".into()));
        assert_eq!(outcome, Outcome::Applied);
        assert!(state.channel_options[3].is_selected);

        let (state, outcome) = apply(state, ControllerEvent::UserToggledChannel("s1".into()));
        assert_eq!(outcome, Outcome::Applied);
        assert!(!state.channel_options[0].is_selected);

        let (_, outcome) = apply(state, ControllerEvent::UserToggledChannel("nope".into()));
        assert_eq!(outcome, Outcome::UnknownChannel);
    }

    #[test]
    fn test_live_transitions() {
        let (state, outcome) = apply(
            ControllerState::default(),
            ControllerEvent::UserToggledMode(ModeToggle::Time(TimeMode::Live)),
        );
        assert_eq!(outcome, Outcome::Rejected(ModeRejection::PackageNotLive));

        let (state, _) = apply(state, ControllerEvent::LiveSetChanged { is_live: true });
        let (state, outcome) = apply(
            state,
            ControllerEvent::UserToggledMode(ModeToggle::Time(TimeMode::Live)),
        );
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(state.modes.time_mode(), TimeMode::Live);

        let (state, _) = apply(state, ControllerEvent::LiveSetChanged { is_live: false });
        assert_eq!(state.modes.time_mode(), TimeMode::Historical);
    }

    #[test]
    fn test_model_preferences() {
        let (state, _) = apply(
            ControllerState::default(),
            ControllerEvent::ModelPreferencesChanged {
                show_context: Some(false),
                colour_mode: None,
            },
        );
        assert!(!state.show_context);
        assert_eq!(state.colour_mode, ColourMode::Fixed);

        let (state, _) = apply(
            state,
            ControllerEvent::ModelPreferencesChanged {
                show_context: None,
                colour_mode: Some(ColourMode::Adaptive),
            },
        );
        assert!(!state.show_context);
        assert_eq!(state.colour_mode, ColourMode::Adaptive);
    }
}
