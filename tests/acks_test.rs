//! Kitchen acknowledgment correlation tests.

use std::time::Duration;

use comanda::sync::acks::AckTracker;

#[test]
fn ack_clears_only_the_matching_order() {
    let mut acks = AckTracker::new();
    acks.track("42", "ORD-0042");
    acks.track("43", "ORD-0043");

    assert!(acks.resolve("42", true));
    assert!(!acks.is_pending("42"));
    assert!(acks.is_pending("43"));
}

#[test]
fn float_formatted_result_id_correlates() {
    let mut acks = AckTracker::new();
    acks.track("42", "ORD-0042");
    assert!(acks.resolve("42.0", true));
    assert!(acks.is_empty());
}

#[test]
fn negative_result_keeps_order_pending() {
    let mut acks = AckTracker::new();
    acks.track("42", "ORD-0042");
    assert!(!acks.resolve("42", false));
    assert!(acks.is_pending("42"));
}

#[test]
fn duplicate_resolution_is_idempotent() {
    let mut acks = AckTracker::new();
    acks.track("42", "ORD-0042");
    assert!(acks.resolve("42", true));
    assert!(!acks.resolve("42", true));
    assert!(!acks.resolve("99", true));
}

#[test]
fn unconfirmed_orders_surface_after_window() {
    let mut acks = AckTracker::new();
    acks.track("42", "ORD-0042");
    acks.track("43", "ORD-0043");

    // With a zero window everything tracked is already overdue.
    let stale = acks.unconfirmed(Duration::ZERO);
    assert_eq!(stale.len(), 2);

    // Nothing is overdue against a generous window.
    assert!(acks.unconfirmed(Duration::from_secs(3600)).is_empty());
}

#[test]
fn retracking_resets_the_resend_clock() {
    let mut acks = AckTracker::new();
    acks.track("42", "ORD-0042");
    // Manual resend: same order tracked again, still a single entry.
    acks.track("42", "ORD-0042");
    assert_eq!(acks.len(), 1);
    assert!(acks.is_pending("42"));
}
