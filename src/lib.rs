pub mod commands;
pub mod error;
pub mod gallery;
pub mod import;
pub mod photos;
pub mod state;

#[cfg(test)]
mod test_support;

pub use error::{GalleryError, Result};

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
