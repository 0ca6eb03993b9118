use std::sync::Arc;

use quickpick_core::commit::{CommitMode, CommitOutcome, CommitPipeline, CommitRequest, MockHost};
use quickpick_core::index_store::MemoryStore;
use quickpick_core::model::Candidate;
use quickpick_core::output::{MockInjector, MockOutput, OutputChain};

struct Fixture {
    primary: Arc<MockOutput>,
    fallback: Arc<MockOutput>,
    host: Arc<MockHost>,
    store: Arc<MemoryStore>,
    injector: Arc<MockInjector>,
    pipeline: CommitPipeline,
}

fn fixture() -> Fixture {
    let primary = Arc::new(MockOutput::new("primary"));
    let fallback = Arc::new(MockOutput::new("fallback"));
    let host = Arc::new(MockHost::default());
    let store = Arc::new(MemoryStore::new(vec![snippet()]));
    let injector = Arc::new(MockInjector::default());
    let chain = OutputChain::new(Box::new(primary.clone())).with_fallback(Box::new(fallback.clone()));
    let pipeline = CommitPipeline::new(chain, host.clone(), store.clone()).with_injector(injector.clone());
    Fixture {
        primary,
        fallback,
        host,
        store,
        injector,
        pipeline,
    }
}

fn snippet() -> Candidate {
    Candidate::new(7, "Greeting", "Hello there")
}

fn request(mode: CommitMode) -> CommitRequest {
    CommitRequest {
        candidate: snippet(),
        query: Some("greet".into()),
        mode,
    }
}

#[test]
fn output_commit_delivers_logs_and_hides_in_order() {
    let f = fixture();
    let outcome = f.pipeline.run(&request(CommitMode::Output));

    assert_eq!(
        outcome,
        CommitOutcome::Committed {
            candidate_id: 7,
            delivered_via: "primary",
            usage_logged: true,
            hidden: true,
        }
    );
    assert_eq!(f.primary.writes(), vec!["Hello there".to_string()]);
    let records = f.store.usage_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].query.as_deref(), Some("greet"));
    assert_eq!(f.host.hide_count(), 1);
}

#[test]
fn fallback_backend_used_when_primary_fails() {
    let f = fixture();
    f.primary.set_fail(true);
    let outcome = f.pipeline.run(&request(CommitMode::Output));

    assert!(outcome.is_committed());
    assert_eq!(f.fallback.writes(), vec!["Hello there".to_string()]);
    assert_eq!(f.host.hide_count(), 1);
}

#[test]
fn all_outputs_failing_aborts_before_logging_and_hide() {
    let f = fixture();
    f.primary.set_fail(true);
    f.fallback.set_fail(true);
    let outcome = f.pipeline.run(&request(CommitMode::Output));

    assert!(matches!(outcome, CommitOutcome::DeliveryFailed { candidate_id: 7, .. }));
    assert!(f.store.usage_records().is_empty());
    assert_eq!(f.host.hide_count(), 0);
}

#[test]
fn usage_log_failure_still_hides_once() {
    let f = fixture();
    f.store.set_fail_usage(true);
    let outcome = f.pipeline.run(&request(CommitMode::Output));

    assert!(matches!(
        outcome,
        CommitOutcome::Committed {
            usage_logged: false,
            hidden: true,
            ..
        }
    ));
    assert_eq!(f.primary.writes().len(), 1);
    assert_eq!(f.host.hide_count(), 1);
}

#[test]
fn hide_failure_is_reported_but_commit_stands() {
    let f = fixture();
    f.host.set_fail(true);
    let outcome = f.pipeline.run(&request(CommitMode::Output));

    assert!(matches!(
        outcome,
        CommitOutcome::Committed {
            usage_logged: true,
            hidden: false,
            ..
        }
    ));
    assert_eq!(f.store.usage_records().len(), 1);
}

#[test]
fn injection_mode_prefers_injector() {
    let f = fixture();
    let outcome = f.pipeline.run(&request(CommitMode::Injection));

    assert!(matches!(
        outcome,
        CommitOutcome::Committed {
            delivered_via: "injection",
            ..
        }
    ));
    assert_eq!(f.injector.injected(), vec![7]);
    assert!(f.primary.writes().is_empty());
}

#[test]
fn injection_failure_falls_back_to_output() {
    let f = fixture();
    f.injector.set_fail(true);
    let outcome = f.pipeline.run(&request(CommitMode::Injection));

    assert!(matches!(
        outcome,
        CommitOutcome::Committed {
            delivered_via: "primary",
            ..
        }
    ));
    assert_eq!(f.primary.writes(), vec!["Hello there".to_string()]);
}

#[test]
fn injection_without_injector_uses_output() {
    let primary = Arc::new(MockOutput::new("primary"));
    let host = Arc::new(MockHost::default());
    let store = Arc::new(MemoryStore::new(vec![snippet()]));
    let pipeline = CommitPipeline::new(OutputChain::new(Box::new(primary.clone())), host, store);

    assert!(pipeline.run(&request(CommitMode::Injection)).is_committed());
    assert_eq!(primary.writes().len(), 1);
}
