//! Shared test fixtures: recording mocks for the provider boundaries.

pub mod mock_channel;

pub use mock_channel::{MockSource, MockTarget};

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test subscriber once per binary; `RUST_LOG` controls what
/// shows up in captured test output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
