use tokio_util::sync::CancellationToken;

/// Monotonic generation clock for validation attempts.
#[derive(Debug, Default)]
pub(crate) struct GenerationClock {
	last: u64,
}

impl GenerationClock {
	/// Returns the next generation ID, starting at 1.
	pub fn next(&mut self) -> u64 {
		self.last = self.last.wrapping_add(1);
		self.last
	}
}

/// Cancellation handle for one validation attempt.
///
/// The generation identifies the attempt a settlement belongs to, so a late
/// result from a superseded attempt can be told apart from the current one.
#[derive(Debug, Clone)]
pub(crate) struct GenerationToken {
	generation: u64,
	cancel: CancellationToken,
}

impl GenerationToken {
	pub fn new(generation: u64) -> Self {
		Self {
			generation,
			cancel: CancellationToken::new(),
		}
	}

	pub const fn generation(&self) -> u64 {
		self.generation
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}
}
