//! Field status flags and the transition table that governs them.
//!
//! A status is a combination of one touchedness flag, one cleanliness flag and
//! at most one validity flag. Transitions are pure functions of the current
//! flags: [`next_flags`] is the whole state machine.

use crate::error::DisallowedTransition;

/// One status flag, in the order used by [`Status::to_flags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusFlag {
	/// Field has been blurred.
	Touched,
	/// Field has not been blurred.
	Untouched,
	/// Field has not received input.
	Clean,
	/// Field has received input.
	Dirty,
	/// Field is waiting on an async validation result.
	Pending,
	/// Field passed its last validation.
	Valid,
	/// Field failed its last validation.
	Invalid,
}

bitflags::bitflags! {
	/// Set of status flags.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct StatusFlags: u8 {
		const TOUCHED = 1 << 0;
		const UNTOUCHED = 1 << 1;
		const CLEAN = 1 << 2;
		const DIRTY = 1 << 3;
		const PENDING = 1 << 4;
		const VALID = 1 << 5;
		const INVALID = 1 << 6;

		const TOUCHEDNESS = Self::TOUCHED.bits() | Self::UNTOUCHED.bits();
		const CLEANLINESS = Self::CLEAN.bits() | Self::DIRTY.bits();
		const VALIDITY = Self::PENDING.bits() | Self::VALID.bits() | Self::INVALID.bits();
	}
}

impl StatusFlag {
	/// Returns the bitflag for this status flag.
	pub const fn as_set(self) -> StatusFlags {
		match self {
			Self::Touched => StatusFlags::TOUCHED,
			Self::Untouched => StatusFlags::UNTOUCHED,
			Self::Clean => StatusFlags::CLEAN,
			Self::Dirty => StatusFlags::DIRTY,
			Self::Pending => StatusFlags::PENDING,
			Self::Valid => StatusFlags::VALID,
			Self::Invalid => StatusFlags::INVALID,
		}
	}

	/// Lowercase name, as used in logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Touched => "touched",
			Self::Untouched => "untouched",
			Self::Clean => "clean",
			Self::Dirty => "dirty",
			Self::Pending => "pending",
			Self::Valid => "valid",
			Self::Invalid => "invalid",
		}
	}
}

impl StatusFlags {
	/// Initial and reset state.
	pub const INITIAL: Self = Self::CLEAN.union(Self::UNTOUCHED);

	/// Returns `true` for exactly one touchedness flag, exactly one cleanliness
	/// flag and at most one validity flag.
	pub fn is_well_formed(self) -> bool {
		self.intersection(Self::TOUCHEDNESS).bits().count_ones() == 1
			&& self.intersection(Self::CLEANLINESS).bits().count_ones() == 1
			&& self.intersection(Self::VALIDITY).bits().count_ones() <= 1
	}

	fn validity(self) -> Self {
		self.intersection(Self::VALIDITY)
	}
}

/// Named status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
	/// Field lost focus.
	Blurred,
	/// Field received input.
	Typed,
	/// Async validation started.
	Pending,
	/// Validation produced no errors.
	Valid,
	/// Validation produced errors.
	Invalid,
}

impl Transition {
	/// All transitions, in table order.
	pub const ALL: [Transition; 5] = [Self::Blurred, Self::Typed, Self::Pending, Self::Valid, Self::Invalid];

	/// Lowercase name, as used in logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Blurred => "blurred",
			Self::Typed => "typed",
			Self::Pending => "pending",
			Self::Valid => "valid",
			Self::Invalid => "invalid",
		}
	}
}

/// Computes the state reached by `transition` from `flags`, or `None` if the
/// transition is not allowed from that state.
pub fn next_flags(flags: StatusFlags, transition: Transition) -> Option<StatusFlags> {
	use StatusFlags as F;

	let validity = flags.validity();
	let cleanliness = flags.intersection(F::CLEANLINESS);
	let touchedness = flags.intersection(F::TOUCHEDNESS);

	match transition {
		Transition::Blurred => flags.contains(F::UNTOUCHED).then(|| cleanliness | F::TOUCHED | validity),
		Transition::Typed => {
			let allowed = flags.contains(F::CLEAN) && !flags.contains(F::PENDING);
			allowed.then(|| F::DIRTY | touchedness | validity)
		}
		Transition::Pending => {
			let allowed = flags.contains(F::TOUCHED) && !flags.contains(F::PENDING);
			allowed.then(|| cleanliness | touchedness | F::PENDING)
		}
		Transition::Valid => flags.intersects(F::INVALID | F::PENDING).then_some(F::DIRTY | F::TOUCHED | F::VALID),
		Transition::Invalid => (!flags.contains(F::INVALID)).then(|| cleanliness | touchedness | F::INVALID),
	}
}

/// Status of a plain field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(StatusFlags);

impl Default for Status {
	fn default() -> Self {
		Self::new()
	}
}

impl Status {
	/// Creates a status in the initial `{Clean, Untouched}` state.
	pub const fn new() -> Self {
		Self(StatusFlags::INITIAL)
	}

	/// Returns the raw flag set.
	pub const fn flags(self) -> StatusFlags {
		self.0
	}

	/// Returns the flags as an ordered list: cleanliness, touchedness, validity.
	pub fn to_flags(self) -> Vec<StatusFlag> {
		const ORDER: [StatusFlag; 7] = [
			StatusFlag::Clean,
			StatusFlag::Dirty,
			StatusFlag::Touched,
			StatusFlag::Untouched,
			StatusFlag::Pending,
			StatusFlag::Valid,
			StatusFlag::Invalid,
		];
		ORDER.into_iter().filter(|flag| self.0.contains(flag.as_set())).collect()
	}

	/// Returns `true` if the flag is set.
	pub fn has(self, flag: StatusFlag) -> bool {
		self.0.contains(flag.as_set())
	}

	/// Returns `true` if `transition` is allowed from the current state.
	pub fn can(self, transition: Transition) -> bool {
		next_flags(self.0, transition).is_some()
	}

	/// Returns the state reached by `transition`.
	pub fn apply(self, transition: Transition) -> Result<Status, DisallowedTransition> {
		next_flags(self.0, transition).map(Status).ok_or(DisallowedTransition { transition, from: self.0 })
	}

	pub fn is_touched(self) -> bool {
		self.has(StatusFlag::Touched)
	}

	pub fn is_dirty(self) -> bool {
		self.has(StatusFlag::Dirty)
	}

	pub fn is_pending(self) -> bool {
		self.has(StatusFlag::Pending)
	}

	pub fn is_valid(self) -> bool {
		self.has(StatusFlag::Valid)
	}

	pub fn is_invalid(self) -> bool {
		self.has(StatusFlag::Invalid)
	}
}

#[cfg(test)]
mod tests;
