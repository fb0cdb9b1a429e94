//! Presentation of the dashboard state: panel view models plus a text
//! renderer for the terminal. The API serializes the same view as JSON.

pub mod render;
pub mod view;

pub use render::render_text;
pub use view::{build_view, DashboardView, Panel};
