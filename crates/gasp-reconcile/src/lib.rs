//! gasp-reconcile
//!
//! Key-based diff between desired settings and remote entities.
//!
//! Policy:
//! - Key absent remotely => notfound (caller creates it)
//! - Key present, desired fields contained in the remote entity => existing
//! - Key present, any desired field differs => different (caller aborts)
//!
//! Remote state is detected, never patched. Deterministic, pure logic. No IO.

mod engine;
mod types;

pub use engine::{compare_objects, handle_compare_result, is_containing, ExistingDifferentObject};
pub use types::*;
