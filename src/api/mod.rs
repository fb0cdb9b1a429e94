//! Dashboard API.
//!
//! Exposes the dashboard state over HTTP for a browser page: health,
//! trigger a run, poll the panels, read the run log and the backend's
//! audit log. Routes are nested under `/api/`.
//!
//! The router is composable: `dashboard_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::dashboard_router;
pub use server::{start_dashboard_server_on, DashboardServer, DashboardSession};
pub use types::ApiContext;
