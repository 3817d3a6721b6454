//! Tests for `BatchTracker`: uid-keyed re-resolution and round semantics.

#![allow(clippy::expect_used)]

use std::time::Duration;

use rlenable_cli::application::services::poller::PollOptions;
use rlenable_cli::application::services::retry::RetryPolicy;
use rlenable_cli::application::services::tracker::BatchTracker;
use rlenable_cli::domain::convergence::ConvergenceCondition;
use rlenable_cli::domain::instance::{Batch, InstanceState};
use tokio::time::Instant;

use crate::mocks::{ScriptedCloud, uid};

fn every_second() -> PollOptions {
    PollOptions::every(Duration::from_secs(1))
}

#[tokio::test(start_paused = true)]
async fn snapshot_keeps_batch_order_and_fresh_states() {
    let cp = ScriptedCloud::new()
        .member("i-b", None, &[InstanceState::Operational, InstanceState::Provisioned])
        .member("i-a", None, &[InstanceState::Operational]);
    let batch = Batch::capture(&cp.instances()).expect("batch");
    let tracker = BatchTracker::new(&cp, &batch, RetryPolicy::default());

    let first = tracker.snapshot().await.expect("snapshot");
    let second = tracker.snapshot().await.expect("snapshot");

    assert_eq!(first[0].resource_uid, uid("i-b"));
    assert_eq!(first[1].resource_uid, uid("i-a"));
    assert_eq!(second[0].state, InstanceState::Provisioned);
    assert_eq!(cp.lookups(), 4);
}

#[tokio::test(start_paused = true)]
async fn wait_for_state_checks_immediately() {
    let cp = ScriptedCloud::new().member("i-a", None, &[InstanceState::Operational]);
    let batch = Batch::capture(&cp.instances()).expect("batch");
    let tracker = BatchTracker::new(&cp, &batch, RetryPolicy::default());
    let started = Instant::now();

    let ready = tracker
        .wait_for_state("ready", &ConvergenceCondition::ready(1), &every_second())
        .await
        .expect("ready");

    assert_eq!(ready.len(), 1);
    assert_eq!(Instant::now() - started, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn reconcile_sleeps_first_and_restarts_each_round() {
    // i-a flips back out of provisioned; a round that saw it earlier must
    // not count it.
    let cp = ScriptedCloud::new()
        .member(
            "i-a",
            None,
            &[
                InstanceState::Operational,
                InstanceState::Provisioned,
                InstanceState::Other("pending".to_string()),
                InstanceState::Provisioned,
            ],
        )
        .member(
            "i-b",
            None,
            &[
                InstanceState::Operational,
                InstanceState::Other("stopping".to_string()),
                InstanceState::Provisioned,
            ],
        );
    let batch = Batch::capture(&cp.instances()).expect("batch");
    let tracker = BatchTracker::new(&cp, &batch, RetryPolicy::default());
    tracker.snapshot().await.expect("consume initial states");
    let started = Instant::now();

    let stopped = tracker
        .reconcile(&InstanceState::Provisioned, &every_second())
        .await
        .expect("reconcile");

    assert_eq!(stopped.len(), 2);
    assert!(stopped.iter().all(|i| i.state == InstanceState::Provisioned));
    // Round 1: a ok, b stopping. Round 2: a pending, b ok. Round 3: both.
    assert_eq!(Instant::now() - started, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn reconcile_honours_timeout() {
    let cp = ScriptedCloud::new().member(
        "i-a",
        None,
        &[InstanceState::Other("stopping".to_string())],
    );
    let batch = Batch::capture(&cp.instances()).expect("batch");
    let tracker = BatchTracker::new(&cp, &batch, RetryPolicy::default());

    let err = tracker
        .reconcile(
            &InstanceState::Provisioned,
            &every_second().with_timeout(Some(Duration::from_secs(5))),
        )
        .await
        .expect_err("never stops");

    assert!(err.to_string().contains("Timed out"));
}
