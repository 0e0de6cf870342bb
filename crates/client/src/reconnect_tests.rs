// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn default_backoff() -> Backoff {
    Backoff::new(Duration::from_secs(1), Duration::from_secs(30))
}

#[parameterized(
    first = { 1, 1_000 },
    second = { 2, 2_000 },
    third = { 3, 4_000 },
    fourth = { 4, 8_000 },
    fifth = { 5, 16_000 },
    capped = { 6, 30_000 },
    far_past_cap = { 40, 30_000 },
    zero_treated_as_first = { 0, 1_000 },
)]
fn backoff_delays(attempt: u32, expected_ms: u64) {
    assert_eq!(
        default_backoff().delay_for(attempt),
        Duration::from_millis(expected_ms)
    );
}

#[test]
fn backoff_is_monotonic_and_capped() {
    let backoff = default_backoff();
    let mut previous = Duration::ZERO;
    for attempt in 1..=100 {
        let delay = backoff.delay_for(attempt);
        assert!(delay >= previous);
        assert!(delay <= Duration::from_secs(30));
        previous = delay;
    }
}

#[test]
fn scheduler_exhausts_after_max_attempts() {
    let mut scheduler = ReconnectScheduler::new(default_backoff(), 5);
    let mut delays = Vec::new();

    for _ in 0..5 {
        match scheduler.next() {
            ReconnectDecision::Retry { delay, .. } => delays.push(delay.as_secs()),
            ReconnectDecision::Exhausted { .. } => unreachable!("exhausted early"),
        }
    }

    assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    assert_eq!(
        scheduler.next(),
        ReconnectDecision::Exhausted { attempts: 5 }
    );
    assert_eq!(scheduler.attempts(), 5);
}

#[test]
fn counter_never_exceeds_max() {
    let mut scheduler = ReconnectScheduler::new(default_backoff(), 3);
    for _ in 0..10 {
        scheduler.next();
        assert!(scheduler.attempts() <= 3);
    }
}

#[test]
fn reset_restarts_backoff() {
    let mut scheduler = ReconnectScheduler::new(default_backoff(), 5);
    scheduler.next();
    scheduler.next();

    scheduler.reset();

    assert_eq!(scheduler.attempts(), 0);
    assert_eq!(
        scheduler.next(),
        ReconnectDecision::Retry {
            attempt: 1,
            delay: Duration::from_secs(1)
        }
    );
}

#[test]
fn zero_max_attempts_retries_forever() {
    let mut scheduler = ReconnectScheduler::new(default_backoff(), 0);
    for _ in 0..1_000 {
        assert!(matches!(scheduler.next(), ReconnectDecision::Retry { .. }));
    }
}
