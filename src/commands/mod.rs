//! Command implementations behind the CLI subcommands.
//!
//! Each command takes the shared `CoreState` and returns plain data or a
//! `String` error; printing and exit codes stay in `main.rs`.

pub mod backend;
pub mod dashboard_api;
pub mod pipeline;

pub use backend::{check_backend, fetch_backend_logs, format_records, BackendStatus};
pub use dashboard_api::{serve_until_ctrl_c, start_dashboard_api, stop_dashboard_api};
pub use pipeline::{run_prompt, RunReport};
