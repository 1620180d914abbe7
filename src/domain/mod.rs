// Domain layer - Plain data shared by every other layer
pub mod data_type;
pub mod mode;
pub mod package;
pub mod presentation;
pub mod telemetry;
