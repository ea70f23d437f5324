#![allow(dead_code)]

use std::sync::Arc;

use orchix::engine::Engine;
use orchix::fs::mock::MockFileSystem;
use orchix::manifest::Manifest;
use orchix::state::StateStore;
use orchix_test_utils::{ComponentBuilder, FakeProvider, ManifestBuilder, fake_registry, memory_store};

pub use orchix_test_utils::init_tracing;

/// Linear three-tier stack: db <- api <- web.
pub fn three_tier_manifest() -> Manifest {
    ManifestBuilder::new("shop")
        .component(ComponentBuilder::new("db").name("Database").build())
        .component(ComponentBuilder::new("api").name("API").depends_on("db").build())
        .component(ComponentBuilder::new("web").name("Web").depends_on("api").build())
        .build()
}

/// Engine over `manifest` with `provider` serving the `fake` type and an
/// in-memory state store.
pub struct Harness {
    pub engine: Engine,
    pub provider: FakeProvider,
    pub store: Arc<StateStore>,
    pub fs: MockFileSystem,
}

pub fn harness(manifest: Manifest, provider: FakeProvider) -> Harness {
    init_tracing();
    let (store, fs) = memory_store();
    let engine = Engine::new(manifest, fake_registry(&provider), Arc::clone(&store))
        .expect("manifest should build an engine");
    Harness {
        engine,
        provider,
        store,
        fs,
    }
}

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
