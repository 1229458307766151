//! kiln-lib: build orchestration for a compiler-collection toolchain.
//!
//! The crate composes independently developed modules into a running process
//! and uses what they contribute to drive an incremental build:
//! - `module`: module discovery, dependency resolution and activation
//! - `extension`: named extension points that modules contribute features to
//! - `content` and `path`: content types and the namespace of roots and entries
//! - `build`: projects, rules, tasks and the derivation graph
//! - `execute`: task ordering and sequential or pooled execution

pub mod builtin;
pub mod build;
pub mod config;
pub mod consts;
pub mod content;
pub mod execute;
pub mod extension;
pub mod module;
pub mod path;
pub mod util;
pub mod version;
