// Presentation layer - HTTP surface for renderers and operator controls
pub mod app_state;
pub mod handlers;
