//! Spacing guarantees of the per-site rate governor.
//!
//! These tests drive the governor with a `ManualClock`, so every pause is
//! recorded instead of slept and send instants can be compared exactly.

use pacing::{CallContext, CancelToken, Clock, Interrupted, ManualClock, RateGovernor};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn governor(clock: &Arc<ManualClock>, floor_ms: u64) -> RateGovernor {
    RateGovernor::new(
        clock.clone(),
        Duration::from_millis(floor_ms),
        Duration::from_secs(65),
    )
}

fn assert_spaced(sent: &[Instant], floor: Duration) {
    for pair in sent.windows(2) {
        let gap = pair[1].saturating_duration_since(pair[0]);
        assert!(gap >= floor, "sends only {gap:?} apart, floor is {floor:?}");
    }
}

proptest! {
    #[test]
    fn sends_never_start_closer_than_the_floor(
        floor_ms in 1u64..10_000,
        gaps in prop::collection::vec(0u64..12_000, 1..24),
    ) {
        let clock = Arc::new(ManualClock::new());
        let governor = governor(&clock, floor_ms);
        let floor = Duration::from_millis(floor_ms);
        let mut sent = Vec::new();

        for gap in gaps {
            clock.advance(Duration::from_millis(gap));
            let (instant, _) = governor
                .pace(&CallContext::none(), || clock.now())
                .expect("no context to interrupt");
            sent.push(instant);
        }

        for pair in sent.windows(2) {
            prop_assert!(pair[1].saturating_duration_since(pair[0]) >= floor);
        }
    }

    #[test]
    fn waits_are_exactly_the_missing_part_of_the_floor(
        floor_ms in 1u64..10_000,
        gap_ms in 0u64..20_000,
    ) {
        let clock = Arc::new(ManualClock::new());
        let governor = governor(&clock, floor_ms);

        let _ = governor.pace(&CallContext::none(), || ()).expect("first send");
        clock.advance(Duration::from_millis(gap_ms));
        let ((), wait) = governor.pace(&CallContext::none(), || ()).expect("second send");

        prop_assert_eq!(wait.waited(), Duration::from_millis(floor_ms.saturating_sub(gap_ms)));
        prop_assert_eq!(wait.since_previous(), Some(Duration::from_millis(gap_ms)));
    }
}

#[test]
fn concurrent_callers_are_serialised_and_spaced() {
    let clock = Arc::new(ManualClock::new());
    let governor = Arc::new(governor(&clock, 3_000));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let governor = Arc::clone(&governor);
            let clock = Arc::clone(&clock);
            thread::spawn(move || {
                governor
                    .pace(&CallContext::none(), || {
                        let start = clock.now();
                        clock.advance(Duration::from_millis(40));
                        start
                    })
                    .expect("uninterrupted")
                    .0
            })
        })
        .collect();

    let mut sent: Vec<Instant> = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker panicked"))
        .collect();
    sent.sort();

    assert_eq!(sent.len(), 6);
    assert_spaced(&sent, Duration::from_secs(3));
}

#[test]
fn deadline_inside_the_wait_interrupts_without_sending() {
    let clock = Arc::new(ManualClock::new());
    let governor = governor(&clock, 3_000);
    let _ = governor.pace(&CallContext::none(), || ()).expect("first send");

    let ctx = CallContext::none().with_timeout(clock.as_ref(), Duration::from_secs(1));
    let mut sent = false;
    let err = governor.pace(&ctx, || sent = true).unwrap_err();

    assert_eq!(err, Interrupted::DeadlineExceeded);
    assert!(!sent);
    assert_eq!(clock.total_slept(), Duration::from_secs(1));
}

#[test]
fn cooldown_honours_cancellation() {
    let clock = Arc::new(ManualClock::new());
    let governor = governor(&clock, 3_000);
    let token = CancelToken::new();
    token.cancel();

    let err = governor
        .cool_down(&CallContext::none().with_cancel(token))
        .unwrap_err();

    assert_eq!(err, Interrupted::Cancelled);
    assert!(clock.sleeps().is_empty());
}
