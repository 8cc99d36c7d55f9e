//! # Organize Module
//!
//! Turns classifications into a plan of file operations and applies it.
//!
//! Flow: [`OrganizationPlanner`] builds a plan, [`PlanValidator`] rejects
//! unsafe ones, [`ConflictResolver`] rewrites clashing destinations and
//! [`Executor`] snapshots the sources and runs the operations in order.

mod executor;
mod planner;
mod resolver;
mod types;
mod validator;

pub(crate) use executor::move_file;
pub use executor::Executor;
pub use planner::{truncate_filename, OrganizationPlanner, PlannerConfig};
pub use resolver::{numbered_path, ConflictResolver, DEFAULT_MAX_ATTEMPTS};
pub use types::*;
pub use validator::{DiskSpace, PlanValidator, SystemDiskSpace, PROTECTED_DIRS};
