//! Dependency ordering of module descriptors.

use std::collections::HashMap;

use super::{ModuleDescriptor, ModuleError};
use crate::util::topo::{TopoError, depth_first_order};

/// Order `descriptors` so every module follows the modules it requires.
///
/// Returns indices into `descriptors`. Each declared dependency must name a
/// known module whose version falls inside the declared range.
pub fn resolve_order(descriptors: &[ModuleDescriptor]) -> Result<Vec<usize>, ModuleError> {
  let mut by_id: HashMap<&str, usize> = HashMap::new();
  for (index, descriptor) in descriptors.iter().enumerate() {
    if let Some(&first) = by_id.get(descriptor.id()) {
      return Err(ModuleError::DuplicateModule {
        id: descriptor.id().to_string(),
        first: describe(&descriptors[first]),
        second: describe(descriptor),
      });
    }
    by_id.insert(descriptor.id(), index);
  }

  let result = depth_first_order(descriptors.len(), |index| {
    let module = &descriptors[index];
    module
      .dependencies()
      .iter()
      .map(|dependency| {
        let Some(&target) = by_id.get(dependency.id()) else {
          return Err(ModuleError::MissingDependency {
            module: module.id().to_string(),
            dependency: dependency.id().to_string(),
          });
        };

        let found = descriptors[target].version();
        if !dependency.accepts(found) {
          return Err(ModuleError::IncompatibleVersion {
            module: module.id().to_string(),
            dependency: dependency.id().to_string(),
            required: dependency.range(),
            found: found.clone(),
          });
        }

        Ok(target)
      })
      .collect()
  });

  result.map_err(|e| match e {
    TopoError::Dependency(e) => e,
    TopoError::Cycle(cycle) => ModuleError::CyclicDependency {
      cycle: cycle
        .iter()
        .map(|&index| descriptors[index].id())
        .collect::<Vec<_>>()
        .join(" -> "),
    },
  })
}

fn describe(descriptor: &ModuleDescriptor) -> String {
  match descriptor.location() {
    Some(location) => location.display().to_string(),
    None => format!("built-in {}", descriptor),
  }
}
