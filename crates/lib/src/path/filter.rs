//! Entry selection by id pattern and content type.
//!
//! Patterns are matched segment by segment. Within a segment `*` matches any
//! run of characters and `?` matches exactly one; a segment consisting of `**`
//! matches any number of whole segments, including none.

use std::fmt;

use super::{PathError, PathId};
use crate::content::ContentType;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  AnyDepth,
  Glob(String),
}

/// A compiled glob over [`PathId`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
  source: String,
  segments: Vec<Segment>,
}

impl PathPattern {
  pub fn parse(pattern: &str) -> Result<Self, PathError> {
    let mut segments: Vec<Segment> = Vec::new();

    for segment in pattern.split('/') {
      match segment {
        "" => {
          return Err(PathError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: "empty segment".to_string(),
          });
        }
        "**" => {
          if segments.last() != Some(&Segment::AnyDepth) {
            segments.push(Segment::AnyDepth);
          }
        }
        glob => segments.push(Segment::Glob(glob.to_string())),
      }
    }

    Ok(Self {
      source: pattern.to_string(),
      segments,
    })
  }

  /// Pattern matching every id.
  pub fn any() -> Self {
    Self {
      source: "**".to_string(),
      segments: vec![Segment::AnyDepth],
    }
  }

  pub fn as_str(&self) -> &str {
    &self.source
  }

  pub fn matches(&self, id: &PathId) -> bool {
    match_segments(&self.segments, id.segments())
  }
}

impl fmt::Display for PathPattern {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.source)
  }
}

fn match_segments(pattern: &[Segment], segments: &[String]) -> bool {
  match pattern.split_first() {
    None => segments.is_empty(),
    Some((Segment::AnyDepth, rest)) => (0..=segments.len()).any(|skip| match_segments(rest, &segments[skip..])),
    Some((Segment::Glob(glob), rest)) => match segments.split_first() {
      Some((segment, tail)) => glob_match(glob, segment) && match_segments(rest, tail),
      None => false,
    },
  }
}

/// Wildcard match of a single segment, backtracking to the last `*`.
fn glob_match(pattern: &str, text: &str) -> bool {
  let pattern: Vec<char> = pattern.chars().collect();
  let text: Vec<char> = text.chars().collect();

  let (mut p, mut t) = (0, 0);
  let mut star: Option<(usize, usize)> = None;

  while t < text.len() {
    if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
      p += 1;
      t += 1;
    } else if p < pattern.len() && pattern[p] == '*' {
      star = Some((p, t));
      p += 1;
    } else if let Some((star_p, star_t)) = star {
      p = star_p + 1;
      t = star_t + 1;
      star = Some((star_p, star_t + 1));
    } else {
      return false;
    }
  }

  pattern[p..].iter().all(|&c| c == '*')
}

/// Predicate over an entry's id and content type.
#[derive(Debug, Clone)]
pub enum Filter {
  Path {
    pattern: PathPattern,
    content_type: Option<ContentType>,
  },
  And(Box<Filter>, Box<Filter>),
  Or(Box<Filter>, Box<Filter>),
}

impl Filter {
  /// Ids matching `pattern`, optionally restricted to one content type.
  pub fn path(pattern: &str, content_type: Option<ContentType>) -> Result<Self, PathError> {
    Ok(Filter::Path {
      pattern: PathPattern::parse(pattern)?,
      content_type,
    })
  }

  pub fn any() -> Self {
    Filter::Path {
      pattern: PathPattern::any(),
      content_type: None,
    }
  }

  /// Every entry of `content_type`, at any depth.
  pub fn of_type(content_type: ContentType) -> Self {
    Filter::Path {
      pattern: PathPattern::any(),
      content_type: Some(content_type),
    }
  }

  pub fn and(self, other: Filter) -> Self {
    Filter::And(Box::new(self), Box::new(other))
  }

  pub fn or(self, other: Filter) -> Self {
    Filter::Or(Box::new(self), Box::new(other))
  }

  pub fn matches(&self, id: &PathId, content_type: &ContentType) -> bool {
    match self {
      Filter::Path {
        pattern,
        content_type: wanted,
      } => wanted.as_ref().is_none_or(|wanted| wanted == content_type) && pattern.matches(id),
      Filter::And(a, b) => a.matches(id, content_type) && b.matches(id, content_type),
      Filter::Or(a, b) => a.matches(id, content_type) || b.matches(id, content_type),
    }
  }
}

/// Include filter plus optional exclude filter.
#[derive(Debug, Clone)]
pub struct Selector {
  include: Filter,
  exclude: Option<Filter>,
}

impl Selector {
  pub fn new(include: Filter) -> Self {
    Self { include, exclude: None }
  }

  pub fn any() -> Self {
    Self::new(Filter::any())
  }

  /// Drop matches of `filter`. Repeated calls accumulate.
  pub fn excluding(mut self, filter: Filter) -> Self {
    self.exclude = Some(match self.exclude.take() {
      Some(existing) => existing.or(filter),
      None => filter,
    });
    self
  }

  pub fn include(&self) -> &Filter {
    &self.include
  }

  pub fn exclude(&self) -> Option<&Filter> {
    self.exclude.as_ref()
  }

  pub fn matches(&self, id: &PathId, content_type: &ContentType) -> bool {
    self.include.matches(id, content_type) && !self.exclude.as_ref().is_some_and(|e| e.matches(id, content_type))
  }
}

impl From<Filter> for Selector {
  fn from(include: Filter) -> Self {
    Self::new(include)
  }
}
