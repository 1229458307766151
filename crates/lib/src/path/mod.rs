//! Virtual namespace of entries spread over pluggable roots.
//!
//! A [`PathId`] names an entry within a root; together with a
//! [`ContentType`](crate::content::ContentType) it identifies one [`Entry`].
//! Roots come in three flavours:
//!
//! - [`DirectoryRoot`]: mutable, mirrors a directory tree
//! - [`ArchiveRoot`]: read-only, backed by a zip or jar file
//! - [`MemoryRoot`]: mutable, no backing store
//!
//! [`CompositeRoot`] stacks several roots into the single namespace a build
//! project works against.

mod archive;
mod composite;
mod directory;
mod entry;
mod error;
mod filter;
mod id;
mod memory;
mod root;

pub use archive::ArchiveRoot;
pub use composite::CompositeRoot;
pub use directory::DirectoryRoot;
pub use entry::{Entry, EntryKey};
pub use error::PathError;
pub use filter::{Filter, PathPattern, Selector};
pub use id::PathId;
pub use memory::MemoryRoot;
pub use root::Root;
