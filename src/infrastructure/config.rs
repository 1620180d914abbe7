use crate::application::derived_state::{Palette, ScaleTable};
use crate::application::live_poller::LivePollSettings;
use crate::application::visualization_controller::ControllerSettings;
use crate::domain::data_type::DataType;
use crate::domain::presentation::{CameraHints, ColourMode, DataRange};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub api: ApiSettings,
    #[serde(default)]
    pub live: LiveSettings,
    #[serde(default)]
    pub presentation: PresentationSettings,
    /// Fixed colour scale per data type, keyed by the data type's wire name
    #[serde(default)]
    pub scales: HashMap<String, [f64; 2]>,
    #[serde(default)]
    pub packages: Vec<PackageConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub ambient_temperature_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveSettings {
    pub poll_interval_secs: u64,
    pub window_secs: i64,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            window_secs: 600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PresentationSettings {
    #[serde(default)]
    pub palette: Vec<String>,
    #[serde(default)]
    pub colour_mode: ColourMode,
    #[serde(default = "default_show_context")]
    pub show_context: bool,
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self {
            palette: Vec::new(),
            colour_mode: ColourMode::default(),
            show_context: default_show_context(),
        }
    }
}

fn default_show_context() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct PackageConfig {
    pub id: String,
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default = "default_zoom")]
    pub zoom: f64,
}

fn default_zoom() -> f64 {
    1.0
}

impl AppConfig {
    pub fn scale_table(&self) -> anyhow::Result<ScaleTable> {
        let mut scales = HashMap::new();
        for (name, [min, max]) in &self.scales {
            let data_type: DataType = name
                .parse()
                .with_context(|| format!("Invalid key in [scales]: {}", name))?;
            if min > max {
                anyhow::bail!("Scale for {} has min {} above max {}", name, min, max);
            }
            scales.insert(data_type, DataRange::new(*min, *max));
        }

        for data_type in DataType::ALL {
            if !scales.contains_key(&data_type) {
                tracing::warn!("No fixed colour scale configured for {}", data_type);
            }
        }

        Ok(ScaleTable::new(scales))
    }

    pub fn palette(&self) -> Palette {
        Palette::new(self.presentation.palette.clone()).unwrap_or_default()
    }

    pub fn controller_settings(&self, package: &PackageConfig) -> anyhow::Result<ControllerSettings> {
        Ok(ControllerSettings {
            palette: self.palette(),
            scales: self.scale_table()?,
            camera: CameraHints {
                rotation: package.rotation,
                zoom: package.zoom,
            },
            colour_mode: self.presentation.colour_mode,
            show_context: self.presentation.show_context,
        })
    }

    pub fn live_poll_settings(&self) -> LivePollSettings {
        LivePollSettings {
            interval: Duration::from_secs(self.live.poll_interval_secs.max(1)),
            window: chrono::TimeDelta::seconds(self.live.window_secs.max(1)),
        }
    }
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/visualization"))
        .add_source(config::Environment::with_prefix("VIZ").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
