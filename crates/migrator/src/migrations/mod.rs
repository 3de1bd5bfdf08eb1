//! Migration System
//!
//! Sequencing, validation, tracking, and apply/revert of schema migrations.

pub mod definitions;
pub mod manager;
pub mod naming;
pub mod rollback;
pub mod runner;
pub mod sequence;
pub mod sql;
pub mod tracker;
pub mod validation;

pub use definitions::*;
pub use manager::{generate_version, MigrationManager};
pub use rollback::MigrationRollback;
pub use runner::Runner;
pub use sequence::Sequence;
pub use validation::{validate, InvalidMigration, InvalidReason};
