//! Scenario tests for the `enablement` application service.
//!
//! Every scenario runs on paused tokio time, so poll intervals elapse
//! instantly and elapsed time can be asserted exactly.

#![allow(clippy::expect_used)]

use std::time::Duration;

use rlenable_cli::application::services::enablement::{
    EnableOptions, Timing, enable_batch, resolve_instances,
};
use rlenable_cli::application::services::injector::USER_DATA_ATTRIBUTE;
use rlenable_cli::application::services::retry::RetryPolicy;
use rlenable_cli::domain::enablement::{ApplyFailurePolicy, BatchPhase, ConfigureStatus};
use rlenable_cli::domain::error::{BatchError, ConvergenceError, EnableError, LookupError};
use rlenable_cli::domain::instance::InstanceState;
use tokio::time::Instant;

use crate::mocks::{
    DEPLOYMENT, FailingBuilder, FakeBuilder, NoopReporter, RecordingReporter, ScriptedCloud,
    cloud, server, uid,
};

const OP: InstanceState = InstanceState::Operational;
const PROV: InstanceState = InstanceState::Provisioned;

fn booting() -> InstanceState {
    InstanceState::Other("booting".to_string())
}

fn decommissioning() -> InstanceState {
    InstanceState::Other("decommissioning".to_string())
}

fn opts(policy: ApplyFailurePolicy) -> EnableOptions<'static> {
    EnableOptions {
        deployment: DEPLOYMENT,
        template_ref: "Base ServerTemplate",
        auth_ref: "RS_REFRESH",
        timing: Timing::default(),
        retry: RetryPolicy::new(Some(5), Duration::from_secs(1)),
        on_apply_failure: policy,
    }
}

/// Two members; `i-b` needs an extra stop round. Registration trickles in
/// over three listings, then both servers report a final state.
fn two_member_cloud(final_b: InstanceState) -> ScriptedCloud {
    ScriptedCloud::new()
        .member("i-a", Some("web-a"), &[OP, PROV])
        .member("i-b", None, &[OP, decommissioning(), PROV])
        .servers(vec![
            vec![],
            vec![server("web-a", booting())],
            vec![server("web-a", booting()), server("i-b", booting())],
            vec![server("web-a", OP), server("i-b", final_b)],
        ])
}

#[tokio::test(start_paused = true)]
async fn happy_path_walks_every_barrier_in_order() {
    let cp = two_member_cloud(OP);
    let reporter = RecordingReporter::default();
    let started = Instant::now();

    let report = enable_batch(
        &cp,
        &FakeBuilder,
        &reporter,
        &cp.instances(),
        &opts(ApplyFailurePolicy::Log),
    )
    .await
    .expect("enable");

    assert!(report.is_clean());
    assert_eq!(cp.stops(), vec![vec![uid("i-a"), uid("i-b")]]);
    assert_eq!(cp.starts(), vec![vec![uid("i-a"), uid("i-b")]]);
    assert_eq!(cp.list_calls(), 4);

    // stop: 2 rounds; registration: immediate check + 2 pending rounds.
    assert_eq!(Instant::now() - started, Duration::from_secs(60));

    let phases: Vec<BatchPhase> = report.phases.iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        vec![
            BatchPhase::PendingReady,
            BatchPhase::Stopping,
            BatchPhase::Stopped,
            BatchPhase::Configuring,
            BatchPhase::Starting,
            BatchPhase::AwaitingRegistration,
            BatchPhase::Converged,
        ]
    );
    assert!(reporter.warnings().is_empty());
}

#[tokio::test(start_paused = true)]
async fn user_data_uses_display_name_and_fixed_attribute() {
    let cp = two_member_cloud(OP);

    let report = enable_batch(
        &cp,
        &FakeBuilder,
        &NoopReporter,
        &cp.instances(),
        &opts(ApplyFailurePolicy::Log),
    )
    .await
    .expect("enable");

    let updates = cp.updates();
    assert_eq!(updates.len(), 2);
    assert!(updates.iter().all(|(_, key, _)| key == USER_DATA_ATTRIBUTE));
    assert_eq!(updates[0].2, "Base ServerTemplate|web-a|RS_REFRESH");
    // Unnamed members fall back to their resource uid.
    assert_eq!(updates[1].2, "Base ServerTemplate|i-b|RS_REFRESH");
    assert_eq!(report.members[1].display_name, "i-b");
}

#[tokio::test(start_paused = true)]
async fn transient_not_found_is_retried() {
    let cp = ScriptedCloud::new()
        .member("i-a", None, &[OP, PROV])
        .failing_lookups("i-a", 2)
        .servers(vec![vec![server("i-a", OP)]]);
    let started = Instant::now();

    let report = enable_batch(
        &cp,
        &FakeBuilder,
        &NoopReporter,
        &cp.instances(),
        &opts(ApplyFailurePolicy::Log),
    )
    .await
    .expect("enable");

    assert!(report.is_clean());
    // 2s of lookup retries + 15s stop round; registration is seen at once.
    assert_eq!(Instant::now() - started, Duration::from_secs(17));
}

#[tokio::test(start_paused = true)]
async fn mismatched_lookup_is_retried() {
    let cp = ScriptedCloud::new()
        .member("i-a", None, &[OP, PROV])
        .mismatched_lookups("i-a", 1)
        .servers(vec![vec![server("i-a", OP)]]);

    let report = enable_batch(
        &cp,
        &FakeBuilder,
        &NoopReporter,
        &cp.instances(),
        &opts(ApplyFailurePolicy::Log),
    )
    .await
    .expect("enable");

    assert_eq!(report.members[0].resource_uid, uid("i-a"));
}

#[tokio::test(start_paused = true)]
async fn lookup_exhaustion_is_fatal() {
    let cp = ScriptedCloud::new()
        .member("i-a", None, &[OP])
        .failing_lookups("i-a", 100);
    let mut o = opts(ApplyFailurePolicy::Log);
    o.retry = RetryPolicy::new(Some(3), Duration::from_secs(1));

    let err = enable_batch(&cp, &FakeBuilder, &NoopReporter, &cp.instances(), &o)
        .await
        .expect_err("lookups never succeed");

    match err.downcast_ref::<LookupError>() {
        Some(LookupError::Exhausted { attempts, .. }) => assert_eq!(*attempts, 3),
        other => panic!("expected exhausted lookup, got {other:?}"),
    }
    assert!(cp.stops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stranded_in_booting_converges_with_warning() {
    let cp = two_member_cloud(InstanceState::StrandedInBooting);
    let reporter = RecordingReporter::default();

    let report = enable_batch(
        &cp,
        &FakeBuilder,
        &reporter,
        &cp.instances(),
        &opts(ApplyFailurePolicy::Log),
    )
    .await
    .expect("stranded is terminal");

    assert_eq!(report.stranded(), 1);
    assert!(!report.is_clean());
    assert!(reporter.warnings().iter().any(|w| w.contains("stranded")));
}

#[tokio::test(start_paused = true)]
async fn apply_failure_is_logged_and_run_continues() {
    let cp = two_member_cloud(OP).update_status("i-b", 403);
    let reporter = RecordingReporter::default();

    let report = enable_batch(
        &cp,
        &FakeBuilder,
        &reporter,
        &cp.instances(),
        &opts(ApplyFailurePolicy::Log),
    )
    .await
    .expect("log policy continues");

    assert_eq!(report.apply_failures(), 1);
    assert!(matches!(
        &report.members[1].configure,
        ConfigureStatus::Failed { reason } if reason.contains("403")
    ));
    assert_eq!(cp.starts().len(), 1, "every member is still started");
    assert!(
        reporter
            .warnings()
            .iter()
            .any(|w| w.contains("user-data not applied"))
    );
}

#[tokio::test(start_paused = true)]
async fn apply_failure_aborts_under_abort_policy() {
    let cp = two_member_cloud(OP).update_status("i-a", 403);

    let err = enable_batch(
        &cp,
        &FakeBuilder,
        &NoopReporter,
        &cp.instances(),
        &opts(ApplyFailurePolicy::Abort),
    )
    .await
    .expect_err("abort policy halts");

    assert!(matches!(
        err.downcast_ref::<EnableError>(),
        Some(EnableError::ApplyFailed { instance, .. }) if instance == "web-a"
    ));
    assert_eq!(cp.updates().len(), 1, "halts at the first failure");
    assert!(cp.starts().is_empty(), "nothing is restarted");
}

#[tokio::test(start_paused = true)]
async fn payload_build_failure_is_fatal() {
    let cp = two_member_cloud(OP);

    let err = enable_batch(
        &cp,
        &FailingBuilder,
        &NoopReporter,
        &cp.instances(),
        &opts(ApplyFailurePolicy::Log),
    )
    .await
    .expect_err("missing credential");

    assert!(format!("{err:#}").contains("was not found"));
    assert!(cp.updates().is_empty());
    assert!(cp.starts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn ready_timeout_elapses_when_instances_never_settle() {
    let cp = ScriptedCloud::new().member("i-a", None, &[booting()]);
    let mut o = opts(ApplyFailurePolicy::Log);
    o.timing.ready_timeout = Some(Duration::from_secs(60));
    let started = Instant::now();

    let err = enable_batch(&cp, &FakeBuilder, &NoopReporter, &cp.instances(), &o)
        .await
        .expect_err("never operational");

    match err.downcast_ref::<ConvergenceError>() {
        Some(ConvergenceError::Timeout { waited, .. }) => {
            assert_eq!(*waited, Duration::from_secs(60));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(Instant::now() - started, Duration::from_secs(60));
    assert!(cp.stops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn registration_waits_for_every_server() {
    let cp = ScriptedCloud::new()
        .member("i-a", None, &[OP, PROV])
        .member("i-b", None, &[OP, PROV])
        .servers(vec![vec![server("i-a", OP)]]);
    let mut o = opts(ApplyFailurePolicy::Log);
    o.timing.start_timeout = Some(Duration::from_secs(120));

    let err = enable_batch(&cp, &FakeBuilder, &NoopReporter, &cp.instances(), &o)
        .await
        .expect_err("second server never registers");

    assert!(err.downcast_ref::<ConvergenceError>().is_some());
    assert_eq!(cp.starts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_batch_is_rejected() {
    let cp = ScriptedCloud::new();

    let err = enable_batch(
        &cp,
        &FakeBuilder,
        &NoopReporter,
        &[],
        &opts(ApplyFailurePolicy::Log),
    )
    .await
    .expect_err("empty");

    assert_eq!(err.downcast_ref::<BatchError>(), Some(&BatchError::Empty));
}

#[tokio::test(start_paused = true)]
async fn resolve_instances_looks_up_each_uid() {
    let cp = ScriptedCloud::new()
        .member("i-a", Some("web-a"), &[OP])
        .member("i-b", None, &[OP])
        .failing_lookups("i-b", 1);

    let found = resolve_instances(
        &cp,
        &cloud(),
        &[uid("i-a"), uid("i-b")],
        &RetryPolicy::default(),
    )
    .await
    .expect("resolve");

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].display_name(), "web-a");
    assert_eq!(cp.lookups(), 3);
}

#[tokio::test(start_paused = true)]
async fn resolve_instances_rejects_answers_for_other_uids() {
    let cp = ScriptedCloud::new()
        .member("i-a", None, &[OP])
        .mismatched_lookups("i-a", 2);
    let started = Instant::now();

    let found = resolve_instances(&cp, &cloud(), &[uid("i-a")], &RetryPolicy::default())
        .await
        .expect("resolve");

    assert_eq!(found[0].resource_uid, uid("i-a"));
    assert_eq!(cp.lookups(), 3);
    assert_eq!(Instant::now() - started, Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn resolve_instances_gives_up_on_persistent_mismatch() {
    let cp = ScriptedCloud::new()
        .member("i-a", None, &[OP])
        .mismatched_lookups("i-a", 100);

    let err = resolve_instances(
        &cp,
        &cloud(),
        &[uid("i-a")],
        &RetryPolicy::new(Some(3), Duration::from_secs(1)),
    )
    .await
    .expect_err("never the right instance");

    match err.downcast_ref::<LookupError>() {
        Some(LookupError::Exhausted { last_error, .. }) => {
            assert!(last_error.contains("different instance"), "{last_error}");
        }
        other => panic!("expected exhausted lookup, got {other:?}"),
    }
}
