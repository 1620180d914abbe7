// Application layer - The visualization controller and its components
pub mod controller_state;
pub mod derived_state;
pub mod error;
pub mod fetch_orchestrator;
pub mod live_poller;
pub mod live_status;
pub mod mode_controller;
pub mod telemetry_repository;
pub mod visualization_controller;
