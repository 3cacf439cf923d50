pub mod config;
pub mod models;
pub mod db;
pub mod knowledge; // Rule, synonym, disease and medication lookups
pub mod conversation; // Persisted message log
pub mod llm; // Local LLM adapter
pub mod encyclopedia; // "¿Qué es…?" summaries
pub mod dialogue; // Turn processing core

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}
