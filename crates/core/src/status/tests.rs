use proptest::prelude::*;

use super::*;

fn status(flags: StatusFlags) -> Status {
	Status(flags)
}

fn any_well_formed() -> impl Strategy<Value = StatusFlags> {
	let touch = prop_oneof![Just(StatusFlags::TOUCHED), Just(StatusFlags::UNTOUCHED)];
	let clean = prop_oneof![Just(StatusFlags::CLEAN), Just(StatusFlags::DIRTY)];
	let validity = prop_oneof![
		Just(StatusFlags::empty()),
		Just(StatusFlags::PENDING),
		Just(StatusFlags::VALID),
		Just(StatusFlags::INVALID),
	];
	(touch, clean, validity).prop_map(|(t, c, v)| t | c | v)
}

fn any_transition() -> impl Strategy<Value = Transition> {
	prop::sample::select(Transition::ALL.to_vec())
}

#[test]
fn initial_state_is_clean_untouched() {
	let status = Status::new();
	assert_eq!(status.to_flags(), vec![StatusFlag::Clean, StatusFlag::Untouched]);
	assert!(!status.is_touched());
	assert!(!status.is_dirty());
}

#[test]
fn blurred_touches_and_keeps_cleanliness() {
	let dirty = status(StatusFlags::DIRTY | StatusFlags::UNTOUCHED);
	assert_eq!(dirty.apply(Transition::Blurred).unwrap().flags(), StatusFlags::DIRTY | StatusFlags::TOUCHED);

	let touched = status(StatusFlags::CLEAN | StatusFlags::TOUCHED);
	let err = touched.apply(Transition::Blurred).unwrap_err();
	assert_eq!(err.transition, Transition::Blurred);
	assert_eq!(err.from, touched.flags());
}

#[test]
fn typed_marks_dirty_and_preserves_validity() {
	let touched_invalid = status(StatusFlags::CLEAN | StatusFlags::TOUCHED | StatusFlags::INVALID);
	assert_eq!(
		touched_invalid.apply(Transition::Typed).unwrap().flags(),
		StatusFlags::DIRTY | StatusFlags::TOUCHED | StatusFlags::INVALID
	);
	assert_eq!(Status::new().apply(Transition::Typed).unwrap().flags(), StatusFlags::DIRTY | StatusFlags::UNTOUCHED);
	assert!(!status(StatusFlags::DIRTY | StatusFlags::TOUCHED).can(Transition::Typed));
}

#[test]
fn pending_requires_touched_and_replaces_validity() {
	assert!(!Status::new().can(Transition::Pending));
	let valid = status(StatusFlags::DIRTY | StatusFlags::TOUCHED | StatusFlags::VALID);
	assert_eq!(
		valid.apply(Transition::Pending).unwrap().flags(),
		StatusFlags::DIRTY | StatusFlags::TOUCHED | StatusFlags::PENDING
	);
}

#[test]
fn valid_only_from_invalid_or_pending() {
	let touched = status(StatusFlags::CLEAN | StatusFlags::TOUCHED);
	assert!(!touched.can(Transition::Valid));

	let pending = status(StatusFlags::CLEAN | StatusFlags::TOUCHED | StatusFlags::PENDING);
	assert_eq!(
		pending.apply(Transition::Valid).unwrap().to_flags(),
		vec![StatusFlag::Dirty, StatusFlag::Touched, StatusFlag::Valid]
	);

	let forced_invalid = status(StatusFlags::DIRTY | StatusFlags::UNTOUCHED | StatusFlags::INVALID);
	assert!(forced_invalid.apply(Transition::Valid).unwrap().is_valid());
}

#[test]
fn invalid_from_anything_not_already_invalid() {
	let untouched = Status::new().apply(Transition::Invalid).unwrap();
	assert_eq!(untouched.to_flags(), vec![StatusFlag::Clean, StatusFlag::Untouched, StatusFlag::Invalid]);
	assert!(!untouched.can(Transition::Invalid));

	let pending = status(StatusFlags::DIRTY | StatusFlags::TOUCHED | StatusFlags::PENDING);
	assert_eq!(
		pending.apply(Transition::Invalid).unwrap().flags(),
		StatusFlags::DIRTY | StatusFlags::TOUCHED | StatusFlags::INVALID
	);
}

proptest! {
	#[test]
	fn transitions_keep_states_well_formed(flags in any_well_formed(), transition in any_transition()) {
		if let Some(next) = next_flags(flags, transition) {
			prop_assert!(next.is_well_formed(), "{:?} --{}--> {:?}", flags, transition.as_str(), next);
		}
	}

	#[test]
	fn rejected_transitions_leave_state_alone(flags in any_well_formed(), transition in any_transition()) {
		let before = status(flags);
		match before.apply(transition) {
			Ok(after) => prop_assert!(before.can(transition) && after.flags().is_well_formed()),
			Err(err) => {
				prop_assert!(!before.can(transition));
				prop_assert_eq!(err.from, flags);
			}
		}
	}

	#[test]
	fn sequences_from_initial_stay_well_formed(seq in prop::collection::vec(any_transition(), 0..32)) {
		let mut current = Status::new();
		for transition in seq {
			if let Ok(next) = current.apply(transition) {
				current = next;
			}
			prop_assert!(current.flags().is_well_formed());
		}
	}
}
