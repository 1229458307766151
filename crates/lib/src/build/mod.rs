//! Build projects: roots, rules, tasks and the derivation graph.
//!
//! A [`BuildProject`] mounts a set of roots (sources, outputs, library
//! dependencies) and a list of [`BuildRule`]s. Refreshing the project applies
//! each rule to the current root contents, producing [`BuildTask`]s that bind
//! a [`Transform`] to concrete source and target entries. The tasks are then
//! ordered so producers precede consumers and handed to [`crate::execute`].
//!
//! Transforms and [`Platform`]s are contributed by modules through the
//! `build-task` and `build-platform` extension points, collected in a
//! [`BuildRegistry`].

mod error;
mod graph;
mod platform;
mod project;
mod registry;
mod repository;
mod rule;
mod task;

pub use error::{BuildError, TaskError};
pub use graph::BuildGraph;
pub use platform::Platform;
pub use project::BuildProject;
pub use registry::BuildRegistry;
pub use repository::{LocalRepository, Repository};
pub use rule::{AggregateRule, BuildRule, TransformRule};
pub use task::{BuildTask, TaskSignature, Transform, Unit};
