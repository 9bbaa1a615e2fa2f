//! Activation decision tests: the two-signal rule and the single-in-flight
//! guarantee must hold under any interleaving of user edits.

use super::activation::{activation_decision, ActivationDecision, ActivationState};
use crds::{ActivationNetwork, CDNPropertyStatus};

fn state() -> ActivationState {
    ActivationState {
        activation_id: String::new(),
        activation_status: String::new(),
        activation_note: String::new(),
        active_version: 0,
        latest_version: 0,
        desired_note: String::new(),
    }
}

#[test]
fn waits_when_no_version_exists() {
    let s = ActivationState {
        latest_version: 0,
        ..state()
    };
    assert_eq!(activation_decision(&s), ActivationDecision::Wait);
}

#[test]
fn first_activation_needs_no_note_change() {
    let s = ActivationState {
        latest_version: 1,
        ..state()
    };
    assert_eq!(activation_decision(&s), ActivationDecision::Start);
}

#[test]
fn in_flight_activation_is_polled_not_restarted() {
    for status in ["PENDING", "ACTIVATING"] {
        let s = ActivationState {
            activation_id: "atv_1".into(),
            activation_status: status.into(),
            activation_note: "deploy 3".into(),
            active_version: 0,
            latest_version: 4,
            desired_note: "deploy 4".into(),
        };
        assert_eq!(
            activation_decision(&s),
            ActivationDecision::Poll,
            "{status} must poll, never double-start"
        );
    }
}

#[test]
fn unchanged_note_does_not_reactivate() {
    // S5 step one: version 4 exists, version 3 active, note unchanged.
    let s = ActivationState {
        activation_id: "atv_1".into(),
        activation_status: "ACTIVE".into(),
        activation_note: "deploy 3".into(),
        active_version: 3,
        latest_version: 4,
        desired_note: "deploy 3".into(),
    };
    assert_eq!(activation_decision(&s), ActivationDecision::Wait);
}

#[test]
fn note_change_with_new_version_activates() {
    // S5 step two: the note changed and a newer version exists.
    let s = ActivationState {
        activation_id: "atv_1".into(),
        activation_status: "ACTIVE".into(),
        activation_note: "deploy 3".into(),
        active_version: 3,
        latest_version: 4,
        desired_note: "deploy 4".into(),
    };
    assert_eq!(activation_decision(&s), ActivationDecision::Start);
}

#[test]
fn note_change_without_new_version_waits() {
    // Note alone has nothing new to publish.
    let s = ActivationState {
        activation_id: "atv_1".into(),
        activation_status: "ACTIVE".into(),
        activation_note: "deploy 4".into(),
        active_version: 4,
        latest_version: 4,
        desired_note: "deploy 4 again".into(),
    };
    assert_eq!(activation_decision(&s), ActivationDecision::Wait);
}

#[test]
fn version_change_without_note_change_waits() {
    // Version alone must not auto-republish on every rule edit.
    let s = ActivationState {
        activation_id: "atv_1".into(),
        activation_status: "ACTIVE".into(),
        activation_note: "deploy 4".into(),
        active_version: 4,
        latest_version: 7,
        desired_note: "deploy 4".into(),
    };
    assert_eq!(activation_decision(&s), ActivationDecision::Wait);
}

#[test]
fn note_change_with_nothing_active_activates() {
    // Initial deployment retry: an id exists but nothing ever went active.
    let s = ActivationState {
        activation_id: "atv_1".into(),
        activation_status: "FAILED".into(),
        activation_note: "deploy 1".into(),
        active_version: 0,
        latest_version: 1,
        desired_note: "deploy 1 retry".into(),
    };
    assert_eq!(activation_decision(&s), ActivationDecision::Start);
}

#[test]
fn failed_activation_needs_note_change_to_retry() {
    let s = ActivationState {
        activation_id: "atv_1".into(),
        activation_status: "FAILED".into(),
        activation_note: "deploy 4".into(),
        active_version: 3,
        latest_version: 4,
        desired_note: "deploy 4".into(),
    };
    assert_eq!(activation_decision(&s), ActivationDecision::Wait);

    let retried = ActivationState {
        desired_note: "deploy 4 retry".into(),
        ..s
    };
    assert_eq!(activation_decision(&retried), ActivationDecision::Start);
}

#[test]
fn state_extraction_is_per_network() {
    let status = CDNPropertyStatus {
        latest_version: 5,
        staging_version: 4,
        production_version: 2,
        staging_activation_id: "atv_s".into(),
        staging_activation_status: "ACTIVE".into(),
        staging_activation_note: "staging note".into(),
        production_activation_id: "atv_p".into(),
        production_activation_status: "PENDING".into(),
        production_activation_note: "production note".into(),
        ..Default::default()
    };

    let staging = ActivationState::from_status(&status, ActivationNetwork::Staging, "next");
    assert_eq!(staging.activation_id, "atv_s");
    assert_eq!(staging.activation_status, "ACTIVE");
    assert_eq!(staging.activation_note, "staging note");
    assert_eq!(staging.active_version, 4);
    assert_eq!(staging.latest_version, 5);

    let production = ActivationState::from_status(&status, ActivationNetwork::Production, "next");
    assert_eq!(production.activation_id, "atv_p");
    assert_eq!(production.active_version, 2);
    assert_eq!(activation_decision(&production), ActivationDecision::Poll);
}

#[test]
fn two_signal_rule_matrix() {
    // note_changed x version_changed x active_version==0, with a completed
    // prior activation. Start only when the note changed AND (version
    // changed OR nothing active).
    struct Case {
        note_changed: bool,
        version_changed: bool,
        nothing_active: bool,
        expect_start: bool,
    }
    let cases = [
        Case { note_changed: false, version_changed: false, nothing_active: false, expect_start: false },
        Case { note_changed: false, version_changed: true, nothing_active: false, expect_start: false },
        Case { note_changed: false, version_changed: true, nothing_active: true, expect_start: false },
        Case { note_changed: true, version_changed: false, nothing_active: false, expect_start: false },
        Case { note_changed: true, version_changed: true, nothing_active: false, expect_start: true },
        Case { note_changed: true, version_changed: true, nothing_active: true, expect_start: true },
    ];

    for (i, case) in cases.iter().enumerate() {
        let active_version = if case.nothing_active { 0 } else { 3 };
        let latest_version = if case.version_changed { active_version + 1 } else { active_version.max(1) };
        let s = ActivationState {
            activation_id: "atv_1".into(),
            activation_status: "ACTIVE".into(),
            activation_note: "before".into(),
            active_version,
            latest_version,
            desired_note: if case.note_changed { "after".into() } else { "before".into() },
        };
        let expected = if case.expect_start {
            ActivationDecision::Start
        } else {
            ActivationDecision::Wait
        };
        assert_eq!(activation_decision(&s), expected, "case {i}");
    }
}
