use std::time::Duration;

use proptest::prelude::*;

use super::*;

const WAIT: Duration = Duration::from_millis(100);

fn ms(n: u64) -> Duration {
	Duration::from_millis(n)
}

#[test]
fn trailing_burst_collapses_to_one() {
	let mut debouncer = Debouncer::new();
	let policy = DebouncePolicy::wait(WAIT);
	let start = Instant::now();

	for i in 0..5 {
		assert_eq!(debouncer.call("name", &policy, start + ms(i * 10)), DebounceDecision::Deferred);
	}
	assert!(debouncer.due(start + ms(120)).is_empty(), "last call at 40ms keeps the burst open");
	assert_eq!(debouncer.due(start + ms(140)), vec!["name".to_string()]);
	assert!(debouncer.due(start + ms(400)).is_empty());
	assert!(debouncer.is_empty());
}

#[test]
fn leading_edge_invokes_once_without_trailing_repeat() {
	let mut debouncer = Debouncer::new();
	let policy = DebouncePolicy::wait(WAIT).leading(true);
	let start = Instant::now();

	assert_eq!(debouncer.call("name", &policy, start), DebounceDecision::Invoke);
	assert!(debouncer.due(start + ms(200)).is_empty());

	assert_eq!(debouncer.call("name", &policy, start + ms(300)), DebounceDecision::Invoke);
	assert_eq!(debouncer.call("name", &policy, start + ms(320)), DebounceDecision::Deferred);
	assert_eq!(debouncer.due(start + ms(420)), vec!["name".to_string()]);
}

#[test]
fn leading_only_drops_the_trailing_call() {
	let mut debouncer = Debouncer::new();
	let policy = DebouncePolicy::wait(WAIT).leading(true).trailing(false);
	let start = Instant::now();

	assert_eq!(debouncer.call("name", &policy, start), DebounceDecision::Invoke);
	assert_eq!(debouncer.call("name", &policy, start + ms(10)), DebounceDecision::Deferred);
	assert!(debouncer.due(start + ms(200)).is_empty());
}

#[test]
fn quiet_burst_restarts_without_polling() {
	let mut debouncer = Debouncer::new();
	let policy = DebouncePolicy::wait(WAIT).leading(true).trailing(false);
	let start = Instant::now();

	assert_eq!(debouncer.call("name", &policy, start), DebounceDecision::Invoke);
	assert_eq!(debouncer.call("name", &policy, start + ms(1000)), DebounceDecision::Invoke);
	assert_eq!(debouncer.call("name", &policy, start + ms(1050)), DebounceDecision::Deferred);
	assert!(debouncer.due(start + ms(2000)).is_empty());
	assert!(debouncer.is_empty());
}

#[test]
fn quiet_trailing_burst_keeps_one_held_request() {
	let mut debouncer = Debouncer::new();
	let policy = DebouncePolicy::wait(WAIT);
	let start = Instant::now();

	assert_eq!(debouncer.call("name", &policy, start), DebounceDecision::Deferred);
	assert_eq!(debouncer.call("name", &policy, start + ms(500)), DebounceDecision::Deferred);
	assert!(debouncer.due(start + ms(550)).is_empty(), "the restarted burst measures quiet from 500ms");
	assert_eq!(debouncer.due(start + ms(600)), vec!["name".to_string()]);
}

#[test]
fn max_wait_forces_progress() {
	let mut debouncer = Debouncer::new();
	let policy = DebouncePolicy::wait(WAIT).max_wait(ms(250));
	let start = Instant::now();

	let mut invoked = 0;
	for i in 0..=30 {
		let now = start + ms(i * 20);
		if debouncer.call("name", &policy, now) == DebounceDecision::Invoke {
			invoked += 1;
		}
		invoked += debouncer.due(now).len();
	}
	assert!(invoked >= 2, "600ms of calls every 20ms with max_wait 250ms invoked {invoked} times");
	assert!(debouncer.next_deadline().is_some());
}

#[test]
fn cancel_and_retain() {
	let mut debouncer = Debouncer::new();
	let policy = DebouncePolicy::wait(WAIT);
	let start = Instant::now();
	debouncer.call("a", &policy, start);
	debouncer.call("b", &policy, start);
	debouncer.call("c", &policy, start);

	assert!(debouncer.cancel("a"));
	debouncer.retain(|path| path != "b");
	assert!(!debouncer.is_scheduled("b"));
	assert_eq!(debouncer.due(start + WAIT), vec!["c".to_string()]);
}

proptest! {
	#[test]
	fn calls_inside_one_window_invoke_once(gaps in prop::collection::vec(0u64..99, 1..20)) {
		let mut debouncer = Debouncer::new();
		let policy = DebouncePolicy::wait(WAIT);
		let start = Instant::now();
		let mut now = start;
		let mut invoked = 0;
		for gap in gaps {
			now += ms(gap);
			if debouncer.call("name", &policy, now) == DebounceDecision::Invoke {
				invoked += 1;
			}
			invoked += debouncer.due(now).len();
		}
		invoked += debouncer.due(now + WAIT * 2).len();
		prop_assert_eq!(invoked, 1);
	}
}
