use std::sync::{Arc, RwLock};

use super::{Entry, PathError, PathId, Root, Selector};
use crate::content::ContentType;
use crate::util::{read, write};

/// Ordered fan-out over delegate roots.
///
/// Point lookups return the first hit in delegate order, queries return the
/// union, and new entries land in the first writable delegate.
pub struct CompositeRoot {
  name: String,
  delegates: RwLock<Vec<Arc<dyn Root>>>,
}

impl CompositeRoot {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      delegates: RwLock::new(Vec::new()),
    }
  }

  pub fn push(&self, root: Arc<dyn Root>) {
    write(&self.delegates).push(root);
  }

  pub fn delegates(&self) -> Vec<Arc<dyn Root>> {
    read(&self.delegates).clone()
  }

  /// The delegate called `name`.
  pub fn delegate(&self, name: &str) -> Option<Arc<dyn Root>> {
    read(&self.delegates).iter().find(|root| root.name() == name).cloned()
  }
}

impl Root for CompositeRoot {
  fn name(&self) -> &str {
    &self.name
  }

  fn is_read_only(&self) -> bool {
    read(&self.delegates).iter().all(|root| root.is_read_only())
  }

  fn get(&self, id: &PathId, content_type: &ContentType) -> Option<Entry> {
    read(&self.delegates).iter().find_map(|root| root.get(id, content_type))
  }

  fn get_all(&self, selector: &Selector) -> Vec<Entry> {
    read(&self.delegates)
      .iter()
      .flat_map(|root| root.get_all(selector))
      .collect()
  }

  fn create(&self, id: &PathId, content_type: &ContentType) -> Result<Entry, PathError> {
    if let Some(existing) = self.get(id, content_type) {
      return Ok(existing);
    }

    let delegates = read(&self.delegates);
    let Some(writable) = delegates.iter().find(|root| !root.is_read_only()) else {
      return Err(PathError::UnsupportedOperation {
        root: self.name.clone(),
        operation: "create",
      });
    };
    writable.create(id, content_type)
  }

  fn refresh(&self) -> Result<(), PathError> {
    for root in self.delegates() {
      root.refresh()?;
    }
    Ok(())
  }

  fn flush(&self) -> Result<(), PathError> {
    for root in self.delegates() {
      root.flush()?;
    }
    Ok(())
  }
}
