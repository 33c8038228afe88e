use {
    tracing::Level,
    tracing_subscriber::{prelude::*, filter::filter_fn},
};

// model downloads and http clients are chatty at info level
const QUIET_TARGETS: [&str; 4] = ["reqwest", "hyper", "cached_path", "rust_bert"];

pub fn init_logging() {
    tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish()
        .with(filter_fn(|metadata| {
            if QUIET_TARGETS.iter().any(|target| metadata.target().starts_with(target)) {
                metadata.level() <= &Level::WARN
            } else {
                true
            }
        }))
        .init();
}
