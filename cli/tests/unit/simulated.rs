//! End-to-end runs of the enablement service against `SimulatedCloud`.

#![allow(clippy::expect_used)]

use std::time::Duration;

use rlenable_cli::application::services::enablement::{EnableOptions, Timing, enable_batch};
use rlenable_cli::application::services::retry::RetryPolicy;
use rlenable_cli::application::services::userdata::RightLinkPayloadBuilder;
use rlenable_cli::domain::enablement::{ApplyFailurePolicy, EnableReport};
use rlenable_cli::domain::instance::InstanceState;
use rlenable_cli::domain::userdata::decode_user_data;
use rlenable_cli::infra::credentials::StaticCredentialStore;
use rlenable_cli::infra::simulated::{SimulatedCloud, SimulationSpec};

use crate::mocks::NoopReporter;

async fn run(cloud: &SimulatedCloud, policy: ApplyFailurePolicy) -> anyhow::Result<EnableReport> {
    let secrets = StaticCredentialStore::new().with("TOKEN", "sim-token");
    let builder = RightLinkPayloadBuilder::new(&secrets, cloud, "Simulated");
    let deployment = cloud.spec().deployment.clone();
    let opts = EnableOptions {
        deployment: &deployment,
        template_ref: "Sim Template",
        auth_ref: "TOKEN",
        timing: Timing {
            interval: Duration::from_secs(1),
            ..Timing::default()
        },
        retry: RetryPolicy::new(Some(10), Duration::from_millis(100)),
        on_apply_failure: policy,
    };
    enable_batch(cloud, &builder, &NoopReporter, &cloud.instances(), &opts).await
}

#[tokio::test(start_paused = true)]
async fn simulated_batch_converges_despite_handle_rotation_and_flaky_lookups() {
    let cloud = SimulatedCloud::new(SimulationSpec {
        instances: 4,
        flaky_lookups: 2,
        transition_polls: 3,
        ..SimulationSpec::default()
    })
    .expect("cloud");

    let report = run(&cloud, ApplyFailurePolicy::Log).await.expect("enable");

    assert!(report.is_clean());
    assert_eq!(report.servers.len(), 4);
    assert_eq!(cloud.stop_requests(), 1);
    assert_eq!(cloud.start_requests(), 1);
    assert!(cloud.lookup_failures() > 0, "flaky lookups were exercised");

    for member in &report.members {
        let stored = cloud
            .user_data(member.resource_uid.as_str())
            .expect("user-data stored");
        let decoded = decode_user_data(&stored).expect("decodes");
        assert!(decoded.contains(&format!("-n \"{}\"", member.display_name)));
        assert!(decoded.contains("-d \"Simulated\""));
    }
}

#[tokio::test(start_paused = true)]
async fn simulated_stranded_members_still_converge() {
    let cloud = SimulatedCloud::new(SimulationSpec {
        instances: 3,
        stranded: 1,
        ..SimulationSpec::default()
    })
    .expect("cloud");

    let report = run(&cloud, ApplyFailurePolicy::Log).await.expect("enable");

    assert_eq!(report.stranded(), 1);
    assert!(
        report
            .servers
            .iter()
            .any(|s| s.state == InstanceState::StrandedInBooting)
    );
}

#[tokio::test(start_paused = true)]
async fn simulated_rejected_update_is_reported() {
    let cloud = SimulatedCloud::new(SimulationSpec {
        instances: 2,
        rejected_updates: 1,
        ..SimulationSpec::default()
    })
    .expect("cloud");

    let report = run(&cloud, ApplyFailurePolicy::Log).await.expect("enable");
    assert_eq!(report.apply_failures(), 1);

    let cloud = SimulatedCloud::new(SimulationSpec {
        instances: 2,
        rejected_updates: 1,
        ..SimulationSpec::default()
    })
    .expect("cloud");
    assert!(run(&cloud, ApplyFailurePolicy::Abort).await.is_err());
    assert_eq!(cloud.start_requests(), 0);
}
