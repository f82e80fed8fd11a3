use std::future::Future;
use std::sync::LazyLock;

use tokio::runtime::{Builder, Handle, Runtime};

/// Runtime for validations started outside any Tokio context, such as a form
/// driven from a synchronous UI loop.
static DETACHED: LazyLock<Runtime> = LazyLock::new(|| {
	Builder::new_multi_thread()
		.enable_all()
		.worker_threads(1)
		.thread_name("arbor-validate")
		.build()
		.expect("failed to build arbor-validate detached tokio runtime")
});

/// Spawns the asynchronous attempt for `path`.
///
/// Attempts report back over a channel, so the join handle is not kept.
pub(crate) fn spawn_attempt(path: &str, generation: u64, attempt: impl Future<Output = ()> + Send + 'static) {
	let handle = Handle::try_current().unwrap_or_else(|_| {
		tracing::trace!(path, "validation.spawn.detached");
		DETACHED.handle().clone()
	});
	tracing::trace!(path, generation, "validation.spawn");
	drop(handle.spawn(attempt));
}
