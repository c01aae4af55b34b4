use super::*;

#[test]
fn fake_clock_starts_at_given_value() {
    let clock = FakeClock::new(100);
    assert_eq!(clock.now(), 100);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new(0);
    clock.advance(5);
    assert_eq!(clock.now(), 5);
}

#[test]
fn system_clock_is_positive() {
    assert!(SystemClock.now() > 0);
}
