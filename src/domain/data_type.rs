// Data type requested per channel
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    RawWavelength,
    UncompensatedStrain,
    TemperatureCompensatedStrain,
}

impl DataType {
    pub const ALL: [DataType; 3] = [
        DataType::RawWavelength,
        DataType::UncompensatedStrain,
        DataType::TemperatureCompensatedStrain,
    ];

    /// Path segment used by the data API.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::RawWavelength => "raw-wavelength",
            DataType::UncompensatedStrain => "uncompensated-strain",
            DataType::TemperatureCompensatedStrain => "temperature-compensated-strain",
        }
    }

    /// The unaggregated type, which can only be shown as a chart.
    pub fn is_raw(&self) -> bool {
        matches!(self, DataType::RawWavelength)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data type: {0}")]
pub struct UnknownDataType(pub String);

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|data_type| data_type.as_str() == s)
            .ok_or_else(|| UnknownDataType(s.to_string()))
    }
}
