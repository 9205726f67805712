use bevy::math::DVec2;

use crate::velocity::{VelocityFlags, VelocityLedger};

#[test]
fn consumed_entry_never_matches_again() {
    let mut ledger = VelocityLedger::default();
    ledger.add_back(10, 0.0, 0.42, 0.0, VelocityFlags::NONE);

    assert_eq!(ledger.use_vertical(0.42, 1e-4), Some(0.42));
    assert_eq!(ledger.use_vertical(0.42, 1e-4), None);
    assert!(!ledger.has_any());
}

#[test]
fn failed_match_removes_nothing() {
    let mut ledger = VelocityLedger::default();
    ledger.add_back(10, 0.5, 0.3, 0.0, VelocityFlags::NONE);

    assert_eq!(ledger.use_vertical(-0.3, 1e-4), None);
    assert_eq!(ledger.use_horizontal(-0.5, 0.0, 1e-4), None);
    assert_eq!(ledger.vertical().len(), 1);
    assert_eq!(ledger.horizontal().len(), 1);
}

#[test]
fn match_drops_entries_passed_over() {
    let mut ledger = VelocityLedger::default();
    ledger.add_back(1, 0.0, 0.1, 0.0, VelocityFlags::NONE);
    ledger.add_back(2, 0.0, 0.2, 0.0, VelocityFlags::NONE);
    ledger.add_back(3, 0.0, 0.3, 0.0, VelocityFlags::NONE);

    assert_eq!(ledger.use_vertical(0.2, 1e-4), Some(0.2));
    assert_eq!(ledger.vertical().len(), 1);
    assert_eq!(ledger.peek_vertical().map(|e| e.value), Some(0.3));
}

#[test]
fn additive_entries_of_one_tick_sum() {
    let mut ledger = VelocityLedger::default();
    ledger.add_back(7, 1.0, 0.0, 0.0, VelocityFlags::ADDITIVE);
    ledger.add_back(7, 0.5, 0.0, 0.5, VelocityFlags::ADDITIVE);
    ledger.add_back(8, 0.25, 0.0, 0.0, VelocityFlags::ADDITIVE);

    let used = ledger.use_horizontal(1.5, 0.5, 1e-4);
    assert_eq!(used, Some(DVec2::new(1.5, 0.5)));
    assert_eq!(ledger.horizontal().len(), 1);
    // The next tick's entry does not join the group.
    assert_eq!(ledger.use_horizontal(1.75, 0.5, 1e-4), None);
}

#[test]
fn sign_and_axis_pairing_are_kept() {
    let mut ledger = VelocityLedger::default();
    ledger.add_back(1, 0.4, 0.0, -0.2, VelocityFlags::NONE);
    assert_eq!(ledger.use_horizontal(-0.2, 0.4, 1e-4), None);
    assert_eq!(ledger.use_horizontal(0.4, 0.2, 1e-4), None);
    assert_eq!(ledger.use_horizontal(0.4, -0.2, 1e-4), Some(DVec2::new(0.4, -0.2)));
}

#[test]
fn entries_expire_by_activation_and_window() {
    let mut ledger = VelocityLedger::new(3, 40);
    ledger.add_back(0, 0.0, 0.5, 0.0, VelocityFlags::NONE);
    ledger.remove_invalid(1);
    ledger.remove_invalid(2);
    assert!(ledger.has_any());
    ledger.remove_invalid(3);
    assert!(!ledger.has_any());

    let mut ledger = VelocityLedger::new(100, 5);
    ledger.add_back(0, 0.0, 0.5, 0.0, VelocityFlags::NONE);
    ledger.remove_invalid(5);
    assert!(ledger.has_any());
    ledger.remove_invalid(6);
    assert!(!ledger.has_any());
}

#[test]
fn front_insertion_is_matched_first() {
    let mut ledger = VelocityLedger::default();
    ledger.add_back(1, 0.0, 0.6, 0.0, VelocityFlags::NONE);
    ledger.add_front(2, 0.0, 0.6, 0.0, VelocityFlags::INTERNAL);
    assert_eq!(ledger.peek_vertical().map(|e| e.tick), Some(2));
    assert_eq!(ledger.use_vertical(0.6, 1e-4), Some(0.6));
    assert_eq!(ledger.peek_vertical().map(|e| e.tick), Some(1));
}
