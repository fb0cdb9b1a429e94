pub mod api; // Dashboard API (axum)
pub mod commands;
pub mod config;
pub mod core_state; // Transport-agnostic state
pub mod dashboard; // Panel views + text rendering
pub mod pipeline;
pub mod pipeline_config;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter(verbose))),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
