//! Native dashboard for the prediction service.

pub mod controller;
pub mod state;
pub mod ui;

pub use controller::DashboardController;
pub use ui::{DashboardApp, MIN_VIEWPORT_SIZE};
