use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use super::PathError;

/// Slash separated identifier of an entry within a namespace.
///
/// Segments are never empty and never `.` or `..`. The id with no segments
/// names the namespace root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathId {
  segments: Vec<String>,
}

impl PathId {
  pub fn root() -> Self {
    Self::default()
  }

  /// Parse `a/b/c`. The empty string is the root id.
  pub fn parse(id: &str) -> Result<Self, PathError> {
    if id.is_empty() {
      return Ok(Self::root());
    }
    Self::from_segments(id.split('/')).map_err(|reason| PathError::InvalidId {
      id: id.to_string(),
      reason,
    })
  }

  fn from_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Result<Self, String> {
    let segments = segments
      .into_iter()
      .map(|segment| validate_segment(segment).map(|_| segment.to_string()))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { segments })
  }

  pub fn segments(&self) -> &[String] {
    &self.segments
  }

  pub fn len(&self) -> usize {
    self.segments.len()
  }

  pub fn is_root(&self) -> bool {
    self.segments.is_empty()
  }

  pub fn last(&self) -> Option<&str> {
    self.segments.last().map(String::as_str)
  }

  /// The id one level up, or `None` for the root.
  pub fn parent(&self) -> Option<PathId> {
    let (_, parent) = self.segments.split_last()?;
    Some(Self {
      segments: parent.to_vec(),
    })
  }

  pub fn child(&self, segment: &str) -> Result<PathId, PathError> {
    validate_segment(segment).map_err(|reason| PathError::InvalidId {
      id: format!("{self}/{segment}"),
      reason,
    })?;
    let mut segments = self.segments.clone();
    segments.push(segment.to_string());
    Ok(Self { segments })
  }

  pub fn join(&self, other: &PathId) -> PathId {
    let mut segments = self.segments.clone();
    segments.extend(other.segments.iter().cloned());
    Self { segments }
  }

  /// Segments `start..end` as a new id, or `None` when out of range.
  pub fn subpath(&self, start: usize, end: usize) -> Option<PathId> {
    self.segments.get(start..end).map(|slice| Self {
      segments: slice.to_vec(),
    })
  }

  pub fn starts_with(&self, prefix: &PathId) -> bool {
    self.segments.starts_with(&prefix.segments)
  }

  pub fn strip_prefix(&self, prefix: &PathId) -> Option<PathId> {
    self.segments.strip_prefix(prefix.segments.as_slice()).map(|rest| Self {
      segments: rest.to_vec(),
    })
  }

  /// Relative file path of this id stored with `suffix`, e.g. `a/b/foo.src`.
  pub fn to_relative_path(&self, suffix: &str) -> PathBuf {
    let mut path: PathBuf = self.segments.iter().collect();
    if let Some(last) = self.segments.last() {
      path.set_file_name(format!("{last}.{suffix}"));
    }
    path
  }

  /// Slash separated archive name of this id stored with `suffix`.
  pub fn to_name(&self, suffix: &str) -> String {
    format!("{self}.{suffix}")
  }
}

fn validate_segment(segment: &str) -> Result<(), String> {
  match segment {
    "" => Err("empty segment".to_string()),
    "." | ".." => Err(format!("relative segment '{segment}'")),
    s if s.contains(['/', '\\']) => Err(format!("segment '{s}' contains a separator")),
    _ => Ok(()),
  }
}

impl fmt::Display for PathId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.segments.join("/"))
  }
}

impl Serialize for PathId {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl FromStr for PathId {
  type Err = PathError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}
