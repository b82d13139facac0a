//! Binding storage for the distribution pipeline.
//!
//! This module provides access to the persisted channel bindings via the
//! Repository pattern, allowing different storage backends to be swapped
//! easily.
//!
//! Two kinds of bindings are stored:
//!
//! - destination bindings: which channel of a guild receives the schedule
//!   digest, and which course that guild follows
//! - lesson bindings: which channels homework is collected from, and the
//!   lesson each of them is tagged with
//!
//! # Repository Pattern
//! The module includes:
//! - `repository`: trait definition and error types
//! - `repositories::local`: in-memory implementation for unit testing and
//!   local development
//! - `repositories::postgres`: Diesel implementation behind the
//!   `postgres-repo` feature
//! - `factory`: factory for creating repository instances
//!
//! The binding tables are owned by the wider bot; this crate only reads and
//! updates rows, it does not manage schema or migrations.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repositories;
pub mod repository;

pub use factory::{RepositoryFactory, RepositoryType};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::{PostgresConfig, PostgresRepository};
pub use repository::{
    BindingRepository, LessonBinding, RepositoryError, RepositoryResult, ScheduleDestination,
    ScheduleToggle,
};
