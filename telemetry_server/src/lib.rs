pub mod app;
pub mod error;
pub mod health;
pub mod simulator;

pub use app::{build_gateway, router, serve, AppState};
pub use error::ApiError;
pub use health::HealthStatus;
pub use simulator::{DeviceFrame, DeviceSimulator, MockDevice, MockRunReport};
