// HTTP request handlers
use crate::application::error::{ConfigurationError, FetchError};
use crate::application::mode_controller::ModeRejection;
use crate::application::visualization_controller::VisualizationController;
use crate::domain::data_type::DataType;
use crate::domain::mode::ModeToggle;
use crate::domain::package::Package;
use crate::domain::presentation::{ColourMode, ViewModel};
use crate::domain::telemetry::{parse_timestamp, AveragingWindow};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unknown package: {0}")]
    UnknownPackage(String),
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Rejected(#[from] ModeRejection),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownPackage(_) | ApiError::UnknownChannel(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Fetch(FetchError::InvalidWindow { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Fetch(_) => StatusCode::BAD_GATEWAY,
            ApiError::Configuration(e) => {
                tracing::error!("Configuration error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Rejected(_) => StatusCode::CONFLICT,
        };

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn controller(state: &AppState, id: &str) -> Result<Arc<VisualizationController>, ApiError> {
    state
        .controller(id)
        .cloned()
        .ok_or_else(|| ApiError::UnknownPackage(id.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    #[serde(rename = "data-type")]
    pub data_type: DataType,
    /// Seconds; omitted means the server default
    #[serde(rename = "averaging-window")]
    pub averaging_window: Option<i64>,
    #[serde(rename = "start-time")]
    pub start_time: String,
    #[serde(rename = "end-time")]
    pub end_time: String,
}

#[derive(Debug, Serialize)]
pub struct PackageSummary {
    #[serde(flatten)]
    pub package: Package,
    pub is_live: bool,
}

#[derive(Debug, Deserialize)]
pub struct LiveSetUpdate {
    pub packages: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPreferences {
    pub show_context: Option<bool>,
    pub colour_mode: Option<ColourMode>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List configured packages with their live status
pub async fn list_packages(State(state): State<Arc<AppState>>) -> Json<Vec<PackageSummary>> {
    let live = state.tracker.live_packages();
    let mut packages: Vec<PackageSummary> = state
        .controllers
        .values()
        .map(|c| PackageSummary {
            package: c.package().clone(),
            is_live: live.contains(&c.package().id),
        })
        .collect();
    packages.sort_by(|a, b| a.package.id.cmp(&b.package.id));
    Json(packages)
}

/// Current view-model for one package
pub async fn get_view(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ViewModel>, ApiError> {
    let controller = controller(&state, &id)?;
    Ok(Json(controller.view_model()?))
}

/// Fetch a new window and return the resulting view-model
pub async fn refresh(
    Path(id): Path<String>,
    Query(query): Query<RefreshQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ViewModel>, ApiError> {
    let controller = controller(&state, &id)?;

    let averaging_window = match query.averaging_window {
        None => AveragingWindow::server_default(),
        Some(secs) => AveragingWindow::from_secs(secs).ok_or_else(|| {
            ApiError::BadRequest(format!("averaging window must be positive, got {}", secs))
        })?,
    };
    let start_time = parse_timestamp(&query.start_time)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid start-time: {}", query.start_time)))?;
    let end_time = parse_timestamp(&query.end_time)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid end-time: {}", query.end_time)))?;

    controller
        .refresh(query.data_type, averaging_window, start_time, end_time)
        .await?;

    Ok(Json(controller.view_model()?))
}

/// Operator mode toggle
pub async fn set_mode(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(toggle): Json<ModeToggle>,
) -> Result<StatusCode, ApiError> {
    controller(&state, &id)?.toggle_mode(toggle)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Flip a channel's chart selection
pub async fn toggle_channel(
    Path((id, channel)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    if controller(&state, &id)?.toggle_channel(&channel) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::UnknownChannel(channel))
    }
}

/// Update context visibility and colour mode for the model
pub async fn set_model_options(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(preferences): Json<ModelPreferences>,
) -> Result<Json<ViewModel>, ApiError> {
    let controller = controller(&state, &id)?;
    controller.set_model_preferences(preferences.show_context, preferences.colour_mode);
    Ok(Json(controller.view_model()?))
}

/// Live-status push from the acquisition side
pub async fn update_live_set(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LiveSetUpdate>,
) -> StatusCode {
    state.tracker.set_live_packages(update.packages);
    StatusCode::NO_CONTENT
}
