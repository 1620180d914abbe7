// Application state for HTTP handlers
use crate::application::live_status::LiveStatusTracker;
use crate::application::visualization_controller::VisualizationController;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub tracker: LiveStatusTracker,
    pub controllers: HashMap<String, Arc<VisualizationController>>,
}

impl AppState {
    pub fn controller(&self, package_id: &str) -> Option<&Arc<VisualizationController>> {
        self.controllers.get(package_id)
    }
}
