// Mode state machine - Render mode x time mode
use crate::domain::data_type::DataType;
use crate::domain::mode::{ModeToggle, RenderMode, TimeMode};

/// Why a user toggle was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModeRejection {
    #[error("package is not live")]
    PackageNotLive,
    #[error("raw data can only be shown as a chart")]
    RawDataIsChartOnly,
}

/// Starts in (Model, Historical). `is_live` mirrors the package's
/// membership of the live set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeController {
    render_mode: RenderMode,
    time_mode: TimeMode,
    is_live: bool,
    committed_raw: bool,
}

impl ModeController {
    pub fn new(is_live: bool) -> Self {
        Self {
            is_live,
            ..Self::default()
        }
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    pub fn time_mode(&self) -> TimeMode {
        self.time_mode
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    /// A series of `data_type` was committed.
    pub fn on_series_committed(&mut self, data_type: DataType) {
        self.committed_raw = data_type.is_raw();
        if self.committed_raw {
            self.render_mode = RenderMode::Chart;
        }
    }

    pub fn on_live_status(&mut self, is_live: bool) {
        self.is_live = is_live;
        if !is_live && self.time_mode == TimeMode::Live {
            self.time_mode = TimeMode::Historical;
        }
    }

    pub fn on_user_toggle(&mut self, toggle: ModeToggle) -> Result<(), ModeRejection> {
        match toggle {
            ModeToggle::Render(RenderMode::Model) if self.committed_raw => {
                Err(ModeRejection::RawDataIsChartOnly)
            }
            ModeToggle::Render(mode) => {
                self.render_mode = mode;
                Ok(())
            }
            ModeToggle::Time(TimeMode::Live) if !self.is_live => Err(ModeRejection::PackageNotLive),
            ModeToggle::Time(mode) => {
                self.time_mode = mode;
                Ok(())
            }
        }
    }
}
