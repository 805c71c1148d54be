use crate::error::StdkitResult;
pub use tracing::instrument;
pub use tracing::{debug, error, info, trace, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber: fmt output filtered by `RUST_LOG` (default `warn`)
/// plus the error layer that lets [`crate::StdkitError`] capture span traces.
pub fn init_tracing() -> StdkitResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| crate::err!("Failed to install tracing subscriber: {}", e))
}
