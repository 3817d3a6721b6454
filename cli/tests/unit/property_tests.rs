//! Property-based tests for payload encoding, convergence and config validation.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use rlenable_cli::domain::config::{VALID_CONFIG_KEYS, validate_config_key, validate_config_value};
use rlenable_cli::domain::convergence::ConvergenceCondition;
use rlenable_cli::domain::instance::InstanceState;
use rlenable_cli::domain::userdata::{UserDataSpec, decode_user_data, encode_user_data};

fn state() -> impl Strategy<Value = InstanceState> {
    prop_oneof![
        Just(InstanceState::Operational),
        Just(InstanceState::Provisioned),
        Just(InstanceState::Stranded),
        Just(InstanceState::StrandedInBooting),
        "[a-z]{3,10}".prop_map(|s| InstanceState::from(s.as_str())),
    ]
}

// ============================================================================
// User-data payload
// ============================================================================

proptest! {
    /// Encoded payloads contain only characters that survive a form body.
    #[test]
    fn prop_encoded_payload_is_transport_safe(raw in "\\PC{0,200}") {
        let encoded = encode_user_data(&raw);
        prop_assert!(
            encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '%'),
            "unsafe char in {}", encoded
        );
        prop_assert_eq!(decode_user_data(&encoded).expect("decode"), raw);
    }

    /// Rendering is a pure function of its inputs.
    #[test]
    fn prop_payload_is_idempotent(
        name in "[A-Za-z0-9 _.-]{1,30}",
        template in "[A-Za-z0-9 _.-]{1,30}",
    ) {
        let spec = UserDataSpec {
            refresh_token: "token",
            server_template: &template,
            server_name: &name,
            deployment_name: "Production",
            cloud_type: "amazon",
            api_host: "us-3.rightscale.com",
            script_url: "https://example.com/enable.sh",
        };
        let first = spec.encoded().expect("encode");
        prop_assert_eq!(&first, &spec.encoded().expect("encode"));
        let decoded = decode_user_data(&first).expect("decode");
        let expected = format!("-n \"{name}\"");
        prop_assert!(decoded.contains(&expected));
    }

    /// Any field carrying a shell metacharacter is rejected.
    #[test]
    fn prop_shell_metacharacters_rejected(
        prefix in "[a-z]{0,10}",
        bad in prop_oneof![Just('"'), Just('`'), Just('$'), Just('\\'), Just('\n')],
    ) {
        let name = format!("{prefix}{bad}x");
        let spec = UserDataSpec {
            refresh_token: "token",
            server_template: "Base",
            server_name: &name,
            deployment_name: "Production",
            cloud_type: "amazon",
            api_host: "us-3.rightscale.com",
            script_url: "https://example.com/enable.sh",
        };
        prop_assert!(spec.render().is_err());
    }
}

// ============================================================================
// Convergence
// ============================================================================

proptest! {
    /// A condition never holds for a collection of the wrong size.
    #[test]
    fn prop_wrong_cardinality_never_converges(
        states in proptest::collection::vec(state(), 0..8),
        expected in 0usize..8,
    ) {
        prop_assume!(states.len() != expected);
        let tally = ConvergenceCondition::terminal(expected).evaluate(&states);
        prop_assert!(!tally.is_met());
    }

    /// With the right size, a condition holds iff every state is accepted.
    #[test]
    fn prop_converges_iff_all_accepted(states in proptest::collection::vec(state(), 1..8)) {
        let cond = ConvergenceCondition::ready(states.len());
        let all_operational = states.iter().all(|s| *s == InstanceState::Operational);
        prop_assert_eq!(cond.evaluate(&states).is_met(), all_operational);
    }
}

// ============================================================================
// validate_config_key() and validate_config_value()
// ============================================================================

proptest! {
    /// Arbitrary keys outside the whitelist are rejected.
    #[test]
    fn prop_arbitrary_keys_rejected(key in "[a-z]{1,20}\\.[a-z]{1,20}") {
        if !VALID_CONFIG_KEYS.contains(&key.as_str()) {
            prop_assert!(validate_config_key(&key).is_err(), "accepted invalid key: {key}");
        }
    }

    /// Numeric keys accept any positive integer.
    #[test]
    fn prop_positive_intervals_accepted(n in 1u64..100_000) {
        prop_assert!(validate_config_value("polling.interval_secs", &n.to_string()).is_ok());
    }

    /// Unknown apply-failure policies are rejected.
    #[test]
    fn prop_unknown_policies_rejected(value in "[a-z]{1,12}") {
        if value != "log" && value != "abort" {
            prop_assert!(validate_config_value("enablement.on_apply_failure", &value).is_err());
        }
    }
}
