//! Pattern matchers run over every isolated shell sub-command.
//!
//! Matchers are independent: one sub-command may install packages, create a
//! package group and carry a signing key at the same time.

pub mod actions;
pub mod groups;
pub mod packages;
pub mod trust;

pub use actions::{categorize, Categorized, Effect};
pub use groups::GroupTracker;
pub use packages::{interpreter_install, native_install, PackageManager};
pub use trust::{repository, signing_key};
