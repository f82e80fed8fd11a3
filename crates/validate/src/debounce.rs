//! Per-field debouncing of validation requests.
//!
//! Each field path with a [`DebouncePolicy`] gets its own burst state. A burst
//! starts with the first call and ends once `wait` has passed without another
//! call. Within a burst, calls collapse: at most one invocation on the leading
//! edge, one on the trailing edge, plus one every `max_wait` if calls keep
//! arriving. The debouncer owns no timers; the caller polls [`Debouncer::due`].

use arbor_core::DebouncePolicy;
use rustc_hash::FxHashMap;
use tokio::time::Instant;
use tracing::trace;

/// What to do with a validation request right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceDecision {
	/// Run the validation now.
	Invoke,
	/// Hold it; it may come back through [`Debouncer::due`].
	Deferred,
}

#[derive(Debug, Clone)]
struct Burst {
	policy: DebouncePolicy,
	last_call: Instant,
	last_invoke: Instant,
	trailing_pending: bool,
}

impl Burst {
	fn quiet(&self, now: Instant) -> bool {
		now.saturating_duration_since(self.last_call) >= self.policy.wait
	}

	fn maxed(&self, now: Instant) -> bool {
		self.policy
			.max_wait
			.is_some_and(|max_wait| now.saturating_duration_since(self.last_invoke) >= max_wait)
	}

	fn deadline(&self) -> Instant {
		let quiet_at = self.last_call + self.policy.wait;
		match self.policy.max_wait {
			Some(max_wait) if self.trailing_pending && self.policy.trailing => quiet_at.min(self.last_invoke + max_wait),
			_ => quiet_at,
		}
	}
}

/// Burst state for every debounced field path.
#[derive(Debug, Default)]
pub struct Debouncer {
	bursts: FxHashMap<String, Burst>,
}

impl Debouncer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a validation request for `path`.
	///
	/// A call arriving after the burst for `path` went quiet starts a new
	/// burst, whether or not [`due`](Self::due) ran in between. A request the
	/// old burst still held is superseded by this one.
	pub fn call(&mut self, path: &str, policy: &DebouncePolicy, now: Instant) -> DebounceDecision {
		let Some(burst) = self.bursts.get_mut(path).filter(|burst| !burst.quiet(now)) else {
			let burst = Burst {
				policy: *policy,
				last_call: now,
				last_invoke: now,
				trailing_pending: !policy.leading,
			};
			if self.bursts.insert(path.to_string(), burst).is_some() {
				trace!(path, "validation.debounce.restart");
			} else {
				trace!(path, leading = policy.leading, "validation.debounce.start");
			}
			return if policy.leading { DebounceDecision::Invoke } else { DebounceDecision::Deferred };
		};

		burst.policy = *policy;
		burst.last_call = now;
		if burst.maxed(now) {
			burst.last_invoke = now;
			burst.trailing_pending = false;
			trace!(path, "validation.debounce.max_wait");
			return DebounceDecision::Invoke;
		}
		burst.trailing_pending = true;
		DebounceDecision::Deferred
	}

	/// Paths whose held request should run at `now`, in sorted order.
	///
	/// Bursts that went quiet are closed; bursts held open by `max_wait` stay.
	pub fn due(&mut self, now: Instant) -> Vec<String> {
		let mut due = Vec::new();
		self.bursts.retain(|path, burst| {
			if burst.quiet(now) {
				if burst.trailing_pending && burst.policy.trailing {
					due.push(path.clone());
				}
				return false;
			}
			if burst.trailing_pending && burst.policy.trailing && burst.maxed(now) {
				burst.last_invoke = now;
				burst.trailing_pending = false;
				due.push(path.clone());
			}
			true
		});
		due.sort();
		due
	}

	/// Earliest instant at which [`due`](Self::due) may return something.
	pub fn next_deadline(&self) -> Option<Instant> {
		self.bursts.values().map(Burst::deadline).min()
	}

	/// Returns `true` if a burst is open for `path`.
	pub fn is_scheduled(&self, path: &str) -> bool {
		self.bursts.contains_key(path)
	}

	/// Drops the burst for `path`, discarding any held request.
	pub fn cancel(&mut self, path: &str) -> bool {
		self.bursts.remove(path).is_some()
	}

	/// Keeps only bursts whose path satisfies `keep`.
	pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
		self.bursts.retain(|path, _| keep(path));
	}

	pub fn clear(&mut self) {
		self.bursts.clear();
	}

	pub fn len(&self) -> usize {
		self.bursts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bursts.is_empty()
	}
}

#[cfg(test)]
mod tests;
