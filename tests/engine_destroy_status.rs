// tests/engine_destroy_status.rs

mod common;
use crate::common::{harness, ids, three_tier_manifest};

use tokio_util::sync::CancellationToken;

use orchix::errors::OrchixError;
use orchix::state::ComponentState;
use orchix::types::{ComponentStatus, Operation};
use orchix_test_utils::FakeProvider;

#[tokio::test]
async fn destroy_runs_dependents_first() {
    let h = harness(three_tier_manifest(), FakeProvider::new());
    let cancel = CancellationToken::new();
    h.engine.deploy(false, &cancel).await.unwrap();

    let summary = h.engine.destroy(&cancel).await.unwrap();

    assert_eq!(summary.operation, Operation::Destroy);
    assert_eq!(
        summary.stages,
        vec![ids(&["web"]), ids(&["api"]), ids(&["db"])]
    );
    assert_eq!(
        h.provider.calls_for(Operation::Destroy),
        ids(&["web", "api", "db"])
    );
    for id in ["db", "api", "web"] {
        assert_eq!(h.store.get(id).unwrap().status, ComponentStatus::Destroyed);
    }
}

#[tokio::test]
async fn destroy_failure_keeps_dependencies_alive() {
    let provider = FakeProvider::new().fail(Operation::Destroy, "api", "finalizer stuck");
    let h = harness(three_tier_manifest(), provider);
    let cancel = CancellationToken::new();
    h.engine.deploy(false, &cancel).await.unwrap();

    let err = h.engine.destroy(&cancel).await.unwrap_err();

    assert!(matches!(
        err,
        OrchixError::StageFailed {
            stage: 2,
            operation: Operation::Destroy,
            ..
        }
    ));
    assert_eq!(h.store.get("web").unwrap().status, ComponentStatus::Destroyed);
    assert_eq!(h.store.get("api").unwrap().status, ComponentStatus::Failed);
    assert_eq!(h.store.get("db").unwrap().status, ComponentStatus::Deployed);
    assert!(!h.provider.calls_for(Operation::Destroy).contains(&"db".to_string()));
}

#[tokio::test]
async fn status_reports_names_sorted_by_id() {
    let provider = FakeProvider::new().fail(Operation::Apply, "web", "image pull backoff");
    let h = harness(three_tier_manifest(), provider);
    let _ = h.engine.deploy(false, &CancellationToken::new()).await;

    // Left over from an earlier manifest revision.
    h.store
        .set_state("legacy", ComponentState::new(ComponentStatus::Destroyed))
        .unwrap();

    let entries = h.engine.status();
    let rows: Vec<(&str, &str, ComponentStatus)> = entries
        .iter()
        .map(|e| (e.id.as_str(), e.name.as_str(), e.status))
        .collect();

    assert_eq!(
        rows,
        vec![
            ("api", "API", ComponentStatus::Deployed),
            ("db", "Database", ComponentStatus::Deployed),
            ("legacy", "legacy", ComponentStatus::Destroyed),
            ("web", "Web", ComponentStatus::Failed),
        ]
    );
    let web = entries.iter().find(|e| e.id == "web").unwrap();
    assert!(web.error.as_deref().unwrap().contains("image pull backoff"));
}

#[tokio::test]
async fn status_is_empty_before_any_deploy() {
    let h = harness(three_tier_manifest(), FakeProvider::new());
    assert!(h.engine.status().is_empty());
    assert!(h.provider.calls().is_empty());
}

#[tokio::test]
async fn preview_plans_every_component_without_writing_state() {
    let provider = FakeProvider::new()
        .changes("db", &[("create", "aws_db_instance.main")])
        .changes("api", &[("update", "apps.v1.Deployment.default.api")]);
    let h = harness(three_tier_manifest(), provider);

    let previews = h.engine.preview(&CancellationToken::new()).await.unwrap();

    let summary: Vec<(usize, &str, usize)> = previews
        .iter()
        .map(|p| (p.stage, p.id.as_str(), p.changes.len()))
        .collect();
    assert_eq!(summary, vec![(1, "db", 1), (2, "api", 1), (3, "web", 0)]);
    assert_eq!(previews[0].provider, "fake");
    assert_eq!(
        h.provider.calls_for(Operation::Plan),
        ids(&["db", "api", "web"])
    );
    assert_eq!(h.fs.write_count(), 0);
}

#[tokio::test]
async fn preview_surfaces_provider_errors() {
    let provider = FakeProvider::new().fail(Operation::Plan, "api", "backend unreachable");
    let h = harness(three_tier_manifest(), provider);

    let err = h.engine.preview(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        err,
        OrchixError::ProviderExecution {
            operation: Operation::Plan,
            ..
        }
    ));
    assert!(err.to_string().contains("backend unreachable"));
    assert_eq!(h.provider.calls_for(Operation::Plan), ids(&["db", "api"]));
}
