// Presentation state handed to the model and chart renderers
use super::data_type::DataType;
use super::mode::{RenderMode, TimeMode};
use super::telemetry::{AmbientTemperature, TimeSeries};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOption {
    pub name: String,
    pub is_selected: bool,
    pub colour: String,
}

/// Inclusive `[min, max]` over every channel value of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct DataRange {
    pub min: f64,
    pub max: f64,
}

impl DataRange {
    /// Returned for a series with no values.
    pub const EMPTY: DataRange = DataRange { min: 0.0, max: 0.0 };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Position of `value` within the range, clamped to `[0, 1]`.
    pub fn normalise(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.5;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

impl From<[f64; 2]> for DataRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<DataRange> for [f64; 2] {
    fn from(range: DataRange) -> Self {
        [range.min, range.max]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColourMode {
    Adaptive,
    #[default]
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOptions {
    pub show_context: bool,
    pub colour_mode: ColourMode,
    pub scale: DataRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraHints {
    pub rotation: [f64; 3],
    pub zoom: f64,
}

impl Default for CameraHints {
    fn default() -> Self {
        Self {
            rotation: [0.0, 0.0, 0.0],
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelView {
    pub options: ModelOptions,
    pub sensor_colours: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub chart_data: Arc<TimeSeries>,
    pub chart_options: Vec<ChannelOption>,
    pub data_range: DataRange,
    pub ambient_temperature: Arc<Vec<AmbientTemperature>>,
}

/// Everything the external renderers need for one package.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub package_id: String,
    pub render_mode: RenderMode,
    pub time_mode: TimeMode,
    pub is_live: bool,
    pub is_loading: bool,
    pub data_type: Option<DataType>,
    pub camera: CameraHints,
    pub model: ModelView,
    pub chart: ChartView,
    pub last_error: Option<String>,
}
