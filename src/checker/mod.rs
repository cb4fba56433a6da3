// src/checker/mod.rs
// =============================================================================
// Link accessibility checking.
//
// Submodules:
// - probe: decides whether ONE link is reachable (retries with backoff)
// - validator: runs probes over a page's links with a bounded worker pool
//
// Unreachable links are data, not errors: they come back in a FailureSet.
// =============================================================================

mod probe;
mod validator;

pub use probe::Probe;
pub use validator::{FailureSet, LinkSet, Validator};
