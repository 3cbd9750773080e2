//! Stack growth for the recursive stages.
//!
//! Parsing, resolving and evaluating all recurse once per nesting level of
//! the source. Wrapping those recursions in [`ensure_sufficient_stack`] moves
//! deep nesting onto heap-allocated stack segments instead of overflowing the
//! thread's stack. Unbounded user recursion is still cut off by the
//! evaluator's call depth limit.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
