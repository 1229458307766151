//! Semantic versions and version-constrained dependencies.
//!
//! Module manifests declare a `major.minor.micro` version and may constrain the
//! modules they require with a minimum version or an inclusive `(min,max)`
//! range:
//!
//! ```text
//! Require-Bundle: kiln.core;bundle-version="1.0.0",kiln.lang;bundle-version="(1.2.0,2.0.0)"
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::trace;

/// Errors raised while parsing versions and dependency expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
  #[error("malformed version '{input}': {reason}")]
  Malformed { input: String, reason: String },

  #[error("malformed dependency expression '{input}': {reason}")]
  MalformedDependency { input: String, reason: String },
}

/// A `major.minor.micro` version.
///
/// Ordering is lexicographic on the triple. Pre-release and build metadata are
/// rejected at parse time, so every value orders purely by its three numbers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion(semver::Version);

impl SemanticVersion {
  pub fn new(major: u64, minor: u64, micro: u64) -> Self {
    Self(semver::Version::new(major, minor, micro))
  }

  /// Parse a `"major.minor.micro"` string.
  pub fn parse(input: &str) -> Result<Self, VersionError> {
    let trimmed = input.trim();
    let version = semver::Version::parse(trimmed).map_err(|e| VersionError::Malformed {
      input: input.to_string(),
      reason: e.to_string(),
    })?;

    if !version.pre.is_empty() || !version.build.is_empty() {
      return Err(VersionError::Malformed {
        input: input.to_string(),
        reason: "expected major.minor.micro without pre-release or build metadata".to_string(),
      });
    }

    Ok(Self(version))
  }

  pub fn major(&self) -> u64 {
    self.0.major
  }

  pub fn minor(&self) -> u64 {
    self.0.minor
  }

  pub fn micro(&self) -> u64 {
    self.0.patch
  }
}

impl fmt::Display for SemanticVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.0.major, self.0.minor, self.0.patch)
  }
}

impl FromStr for SemanticVersion {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

/// A requirement on another module: its id plus optional inclusive bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
  id: String,
  min: Option<SemanticVersion>,
  max: Option<SemanticVersion>,
}

impl Dependency {
  /// A dependency on any version of `id`.
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      min: None,
      max: None,
    }
  }

  pub fn at_least(mut self, min: SemanticVersion) -> Self {
    self.min = Some(min);
    self
  }

  pub fn at_most(mut self, max: SemanticVersion) -> Self {
    self.max = Some(max);
    self
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn min(&self) -> Option<&SemanticVersion> {
    self.min.as_ref()
  }

  pub fn max(&self) -> Option<&SemanticVersion> {
    self.max.as_ref()
  }

  /// Whether `version` lies within the bounds, ignoring the id.
  pub fn accepts(&self, version: &SemanticVersion) -> bool {
    self.min.as_ref().is_none_or(|min| version >= min) && self.max.as_ref().is_none_or(|max| version <= max)
  }

  /// Whether module `id` at `version` satisfies this dependency.
  pub fn matches(&self, id: &str, version: &SemanticVersion) -> bool {
    self.id == id && self.accepts(version)
  }

  /// Human readable form of the bounds, e.g. `>= 1.0.0` or `[1.0.0, 2.0.0]`.
  pub fn range(&self) -> String {
    match (&self.min, &self.max) {
      (None, None) => "*".to_string(),
      (Some(min), None) => format!(">= {}", min),
      (None, Some(max)) => format!("<= {}", max),
      (Some(min), Some(max)) => format!("[{}, {}]", min, max),
    }
  }

  /// Parse one dependency term: `id` followed by optional `;key=value` attributes.
  ///
  /// Only `bundle-version` is interpreted. Its value is either a single minimum
  /// version or a bracketed `(min,max)` pair whose bounds are both inclusive.
  /// Other attributes and `key:=value` directives are ignored.
  pub fn parse(term: &str) -> Result<Self, VersionError> {
    let malformed = |reason: &str| VersionError::MalformedDependency {
      input: term.to_string(),
      reason: reason.to_string(),
    };

    let mut parts = term.split(';');
    let id = parts.next().unwrap_or_default().trim();
    if id.is_empty() {
      return Err(malformed("missing module id"));
    }
    if id.chars().any(char::is_whitespace) {
      return Err(malformed("module id contains whitespace"));
    }

    let mut dependency = Dependency::new(id);

    for attribute in parts {
      let attribute = attribute.trim();
      if attribute.is_empty() {
        continue;
      }

      if let Some((key, _)) = attribute.split_once(":=") {
        trace!(dependency = id, directive = key.trim(), "ignoring dependency directive");
        continue;
      }

      let Some((key, value)) = attribute.split_once('=') else {
        return Err(malformed("attribute must have the form key=value"));
      };

      if !key.trim().eq_ignore_ascii_case("bundle-version") {
        trace!(dependency = id, attribute = key.trim(), "ignoring dependency attribute");
        continue;
      }

      let value = value.trim().trim_matches('"').trim();
      let (min, max) = parse_version_range(value).map_err(|e| match e {
        VersionError::Malformed { reason, .. } => malformed(&reason),
        other => other,
      })?;
      dependency.min = Some(min);
      dependency.max = max;
    }

    Ok(dependency)
  }

  /// Parse a comma separated list of dependency terms.
  ///
  /// Commas inside double quotes belong to a version range and do not split
  /// terms. An empty expression yields no dependencies.
  pub fn parse_list(expression: &str) -> Result<Vec<Self>, VersionError> {
    if expression.trim().is_empty() {
      return Ok(Vec::new());
    }

    let mut terms = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in expression.chars() {
      match c {
        '"' => {
          in_quotes = !in_quotes;
          current.push(c);
        }
        ',' if !in_quotes => terms.push(std::mem::take(&mut current)),
        _ => current.push(c),
      }
    }

    if in_quotes {
      return Err(VersionError::MalformedDependency {
        input: expression.to_string(),
        reason: "unterminated quote".to_string(),
      });
    }
    terms.push(current);

    terms.iter().map(|term| Self::parse(term)).collect()
  }
}

impl fmt::Display for Dependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.id, self.range())
  }
}

/// Parse `1.0.0` or `(1.0.0,2.0.0)` / `[1.0.0,2.0.0]` into bounds.
fn parse_version_range(value: &str) -> Result<(SemanticVersion, Option<SemanticVersion>), VersionError> {
  let opens = value.starts_with('(') || value.starts_with('[');
  let closes = value.ends_with(')') || value.ends_with(']');

  if !opens && !closes {
    return Ok((SemanticVersion::parse(value)?, None));
  }

  let malformed = |reason: &str| VersionError::Malformed {
    input: value.to_string(),
    reason: reason.to_string(),
  };

  if !(opens && closes) || value.len() < 2 {
    return Err(malformed("unbalanced version range brackets"));
  }

  let inner = &value[1..value.len() - 1];
  let Some((min, max)) = inner.split_once(',') else {
    return Err(malformed("version range needs a minimum and a maximum"));
  };

  let min = SemanticVersion::parse(min)?;
  let max = SemanticVersion::parse(max)?;
  if max < min {
    return Err(malformed("range maximum is below its minimum"));
  }

  Ok((min, Some(max)))
}
