//! Module discovery, dependency resolution and activation.
//!
//! Modules are packaged as zip or jar archives carrying a
//! `META-INF/MANIFEST.MF`. The [`ModuleManager`] reads those manifests,
//! orders modules so each follows the modules it requires, and starts their
//! activators one at a time against a shared
//! [`ExtensionRegistry`](crate::extension::ExtensionRegistry).
//!
//! ```text
//! Discovered -> Ordered -> Activated -> Deactivated
//!                      \-> Failed
//! ```

mod activator;
mod manager;
pub mod manifest;
mod resolve;
mod types;

pub use activator::{Activator, ActivatorCatalog, ActivatorFactory, ModuleContext};
pub use manager::ModuleManager;
pub use resolve::resolve_order;
pub use types::{LifecycleReport, ModuleDescriptor, ModuleError, ModuleState, ModuleSummary};
