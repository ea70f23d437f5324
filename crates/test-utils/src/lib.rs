pub mod builders;
pub mod fake_provider;

use std::sync::{Arc, Once};

use orchix::fs::mock::MockFileSystem;
use orchix::provider::ProviderRegistry;
use orchix::state::StateStore;
use tracing_subscriber::{EnvFilter, fmt};

pub use builders::{ComponentBuilder, ManifestBuilder};
pub use fake_provider::{Call, FakeProvider};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Registry that serves `fake` components from `provider`.
pub fn fake_registry(provider: &FakeProvider) -> Arc<ProviderRegistry> {
    Arc::new(ProviderRegistry::new().with("fake", Arc::new(provider.clone())))
}

/// State store backed by an in-memory filesystem; returns the filesystem
/// handle too so tests can inspect writes.
pub fn memory_store() -> (Arc<StateStore>, MockFileSystem) {
    let fs = MockFileSystem::new();
    let store = StateStore::with_fs("state.json", Arc::new(fs.clone()))
        .expect("empty in-memory store always opens");
    (Arc::new(store), fs)
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
