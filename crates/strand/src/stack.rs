//! Native stack headroom for the recursive evaluator
//!
//! Every script call, statement and sub-expression recurses on the native
//! stack. Entry points wrap themselves in [`ensure_sufficient_stack`] so the
//! call-depth limit is what stops runaway recursion, whatever stack the host
//! thread was given.

/// Grow the stack before running `f` if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack to keep available (128KB red zone).
    const RED_ZONE: usize = 128 * 1024;

    /// Stack allocated per growth (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
