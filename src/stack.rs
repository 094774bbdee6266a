//! Stack safety for the recursive passes.
//!
//! The parser, the resolver and the interpreter recurse once per nested
//! statement or expression, and the interpreter several times per user-level
//! call. Wrapping those recursion points in
//! [`ensure_sufficient_stack`] grows the host stack on demand instead of
//! overflowing it; the interpreter's own call-depth limit then decides when a
//! program has recursed too far.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
