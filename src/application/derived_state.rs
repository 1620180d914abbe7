// Derived presentation state - Pure functions of a committed series
use crate::application::error::ConfigurationError;
use crate::domain::data_type::DataType;
use crate::domain::presentation::{ChannelOption, ColourMode, DataRange};
use crate::domain::telemetry::TimeSeries;
use std::collections::{BTreeMap, HashMap};

/// Channels selected by default, in discovery order.
pub const DEFAULT_SELECTED_CHANNELS: usize = 3;

const DEFAULT_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Colour of a sensor with no current value.
pub const MISSING_VALUE_COLOUR: &str = "#9e9e9e";

const SCALE_LOW: (u8, u8, u8) = (0x2c, 0x7b, 0xb6);
const SCALE_HIGH: (u8, u8, u8) = (0xd7, 0x19, 0x1c);

/// Non-empty list of chart colours, assigned round-robin.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette(Vec<String>);

impl Palette {
    pub fn new(colours: Vec<String>) -> Option<Self> {
        (!colours.is_empty()).then_some(Self(colours))
    }

    pub fn colour(&self, index: usize) -> &str {
        &self.0[index % self.0.len()]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self(DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect())
    }
}

/// Fixed colour scales per data type, supplied by configuration.
#[derive(Debug, Clone, Default)]
pub struct ScaleTable(HashMap<DataType, DataRange>);

impl ScaleTable {
    pub fn new(scales: HashMap<DataType, DataRange>) -> Self {
        Self(scales)
    }

    pub fn lookup(&self, data_type: DataType) -> Result<DataRange, ConfigurationError> {
        self.0
            .get(&data_type)
            .copied()
            .ok_or(ConfigurationError::MissingScale(data_type))
    }
}

pub fn compute_data_range(series: &TimeSeries) -> DataRange {
    let mut values = series.values();
    let Some(first) = values.next() else {
        return DataRange::EMPTY;
    };

    let (min, max) = values.fold((first, first), |(min, max), v| (min.min(v), max.max(v)));
    DataRange::new(min, max)
}

pub fn compute_channel_options(series: &TimeSeries, palette: &Palette) -> Vec<ChannelOption> {
    series
        .channel_names()
        .into_iter()
        .enumerate()
        .map(|(i, name)| ChannelOption {
            name: name.to_string(),
            is_selected: i < DEFAULT_SELECTED_CHANNELS,
            colour: palette.colour(i).to_string(),
        })
        .collect()
}

pub fn compute_model_scale(
    colour_mode: ColourMode,
    data_type: DataType,
    data_range: DataRange,
    scales: &ScaleTable,
) -> Result<DataRange, ConfigurationError> {
    match colour_mode {
        ColourMode::Adaptive => Ok(data_range),
        ColourMode::Fixed => scales.lookup(data_type),
    }
}

/// Colour each channel by its latest value along the model scale.
pub fn compute_sensor_colours(series: &TimeSeries, scale: DataRange) -> BTreeMap<String, String> {
    let Some(latest) = series.latest() else {
        return BTreeMap::new();
    };

    latest
        .channels
        .iter()
        .map(|channel| {
            let colour = match channel.value {
                Some(value) => scale_colour(scale.normalise(value)),
                None => MISSING_VALUE_COLOUR.to_string(),
            };
            (channel.name.clone(), colour)
        })
        .collect()
}

fn scale_colour(t: f64) -> String {
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(SCALE_LOW.0, SCALE_HIGH.0),
        lerp(SCALE_LOW.1, SCALE_HIGH.1),
        lerp(SCALE_LOW.2, SCALE_HIGH.2)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::{ChannelValue, SensorReading};
    use chrono::{TimeZone, Utc};

    fn reading(secs: i64, values: &[(&str, Option<f64>)]) -> SensorReading {
        SensorReading::new(
            Utc.timestamp_opt(secs, 0).unwrap(),
            values
                .iter()
                .map(|(name, value)| ChannelValue {
                    name: name.to_string(),
                    value: *value,
                })
                .collect(),
        )
    }

    fn two_channel_series() -> TimeSeries {
        TimeSeries::new(vec![
            reading(0, &[("s1", Some(1.0)), ("s2", Some(5.0))]),
            reading(1, &[("s1", Some(3.0)), ("s2", Some(2.0))]),
        ])
    }

    #[test]
    fn test_data_range_spans_all_channels() {
        assert_eq!(compute_data_range(&two_channel_series()), DataRange::new(1.0, 5.0));
    }

    #[test]
    fn test_data_range_of_empty_series_is_sentinel() {
        assert_eq!(compute_data_range(&TimeSeries::default()), DataRange::EMPTY);
    }

    #[test]
    fn test_data_range_ignores_missing_values() {
        let series = TimeSeries::new(vec![
            reading(0, &[("s1", None), ("s2", Some(-4.0))]),
            reading(1, &[("s1", Some(7.5)), ("s2", None)]),
        ]);
        let range = compute_data_range(&series);
        assert_eq!(range, DataRange::new(-4.0, 7.5));
        assert!(range.min <= range.max);
    }

    #[test]
    fn test_channel_options_follow_discovery_order() {
        let palette = Palette::default();
        let options = compute_channel_options(&two_channel_series(), &palette);

        assert_eq!(
            options,
            vec![
                ChannelOption {
                    name: "s1".into(),
                    is_selected: true,
                    colour: palette.colour(0).into(),
                },
                ChannelOption {
                    name: "s2".into(),
                    is_selected: true,
                    colour: palette.colour(1).into(),
                },
            ]
        );
    }

    #[test]
    fn test_only_first_three_channels_selected_and_palette_wraps() {
        let names = ["a", "b", "c", "d", "e"];
        let values: Vec<_> = names.iter().map(|n| (*n, Some(0.0))).collect();
        let series = TimeSeries::new(vec![reading(0, &values)]);
        let palette = Palette::new(vec!["#111111".into(), "#222222".into()]).unwrap();

        let options = compute_channel_options(&series, &palette);

        let selected: Vec<_> = options.iter().map(|o| o.is_selected).collect();
        assert_eq!(selected, vec![true, true, true, false, false]);
        let colours: Vec<_> = options.iter().map(|o| o.colour.as_str()).collect();
        assert_eq!(colours, vec!["#111111", "#222222", "#111111", "#222222", "#111111"]);
    }

    #[test]
    fn test_empty_series_has_no_channel_options() {
        assert!(compute_channel_options(&TimeSeries::default(), &Palette::default()).is_empty());
    }

    #[test]
    fn test_model_scale_adaptive_uses_data_range() {
        let scale = compute_model_scale(
            ColourMode::Adaptive,
            DataType::UncompensatedStrain,
            DataRange::new(1.0, 5.0),
            &ScaleTable::default(),
        );
        assert_eq!(scale, Ok(DataRange::new(1.0, 5.0)));
    }

    #[test]
    fn test_model_scale_fixed_uses_table() {
        let mut scales = HashMap::new();
        scales.insert(DataType::UncompensatedStrain, DataRange::new(-500.0, 500.0));
        let table = ScaleTable::new(scales);

        let scale = compute_model_scale(
            ColourMode::Fixed,
            DataType::UncompensatedStrain,
            DataRange::new(1.0, 5.0),
            &table,
        );
        assert_eq!(scale, Ok(DataRange::new(-500.0, 500.0)));

        let missing = compute_model_scale(
            ColourMode::Fixed,
            DataType::RawWavelength,
            DataRange::new(1.0, 5.0),
            &table,
        );
        assert_eq!(
            missing,
            Err(ConfigurationError::MissingScale(DataType::RawWavelength))
        );
    }

    #[test]
    fn test_sensor_colours_span_the_scale() {
        let series = TimeSeries::new(vec![reading(
            0,
            &[("low", Some(-10.0)), ("high", Some(10.0)), ("gone", None)],
        )]);
        let colours = compute_sensor_colours(&series, DataRange::new(0.0, 5.0));

        assert_eq!(colours["low"], "#2c7bb6");
        assert_eq!(colours["high"], "#d7191c");
        assert_eq!(colours["gone"], MISSING_VALUE_COLOUR);
    }

    #[test]
    fn test_palette_must_not_be_empty() {
        assert!(Palette::new(Vec::new()).is_none());
    }
}
