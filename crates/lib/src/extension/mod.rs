//! Named extension points and the features modules contribute to them.
//!
//! A subsystem that owns a capability creates an extension point with
//! [`ExtensionRegistry::create`] and a handler that receives every
//! [`Feature`] registered against it. Modules then call
//! [`ExtensionRegistry::register`] during activation. Registering against a
//! point nobody created is an error, never a silent no-op.

mod function;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::build::{Platform, Transform};
use crate::content::ContentType;

pub use function::{Function, FunctionDef, FunctionRegistry};

/// Errors raised by the extension registry and its handlers.
#[derive(Debug, Error)]
pub enum ExtensionError {
  #[error("extension point '{0}' is already defined")]
  DuplicatePoint(String),

  #[error("unknown extension point '{0}'")]
  UnknownPoint(String),

  #[error("extension point '{point}' expects a {expected}, got a {found}")]
  TypeMismatch {
    point: String,
    expected: &'static str,
    found: &'static str,
  },

  #[error("extension point '{point}' rejected the feature: {reason}")]
  Rejected { point: String, reason: String },

  #[error("unknown function '{0}'")]
  UnknownFunction(String),

  #[error("function '{name}' failed: {message}")]
  FunctionFailed { name: String, message: String },
}

/// A capability contributed to an extension point.
#[derive(Clone)]
pub enum Feature {
  ContentType(ContentType),
  Transform(Arc<dyn Transform>),
  Platform(Arc<dyn Platform>),
  Function(FunctionDef),
}

impl Feature {
  /// Short name of the variant, used in diagnostics.
  pub fn kind(&self) -> &'static str {
    match self {
      Feature::ContentType(_) => "content type",
      Feature::Transform(_) => "transform",
      Feature::Platform(_) => "platform",
      Feature::Function(_) => "function",
    }
  }

  fn label(&self) -> String {
    match self {
      Feature::ContentType(ty) => ty.name().to_string(),
      Feature::Transform(transform) => transform.id().to_string(),
      Feature::Platform(platform) => platform.id().to_string(),
      Feature::Function(function) => function.name().to_string(),
    }
  }
}

impl fmt::Debug for Feature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Feature::{}({})", self.kind(), self.label())
  }
}

type Handler = Box<dyn FnMut(Feature) -> Result<(), ExtensionError> + Send>;

/// Table of extension points.
///
/// Populated while modules activate, one at a time, and only read afterwards.
#[derive(Default)]
pub struct ExtensionRegistry {
  points: BTreeMap<String, Handler>,
  staging: Option<Staging>,
}

/// Changes made by the module currently activating.
///
/// Points it creates are live immediately. Features it registers against
/// points that existed before are held back until [`ExtensionRegistry::commit`].
#[derive(Default)]
struct Staging {
  created: Vec<String>,
  deferred: Vec<(String, Feature)>,
}

impl ExtensionRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Define extension point `point`, routing its registrations to `handler`.
  pub fn create<F>(&mut self, point: &str, handler: F) -> Result<(), ExtensionError>
  where
    F: FnMut(Feature) -> Result<(), ExtensionError> + Send + 'static,
  {
    if self.points.contains_key(point) {
      return Err(ExtensionError::DuplicatePoint(point.to_string()));
    }
    debug!(point, "created extension point");
    self.points.insert(point.to_string(), Box::new(handler));
    if let Some(staging) = &mut self.staging {
      staging.created.push(point.to_string());
    }
    Ok(())
  }

  /// Hand `feature` to the handler of `point`.
  ///
  /// While staging, features for points created before staging began are
  /// queued instead and delivered by [`commit`](Self::commit).
  pub fn register(&mut self, point: &str, feature: Feature) -> Result<(), ExtensionError> {
    let Some(handler) = self.points.get_mut(point) else {
      return Err(ExtensionError::UnknownPoint(point.to_string()));
    };
    if let Some(staging) = &mut self.staging
      && !staging.created.iter().any(|created| created == point)
    {
      trace!(point, feature = ?feature, "deferring feature");
      staging.deferred.push((point.to_string(), feature));
      return Ok(());
    }
    trace!(point, feature = ?feature, "registering feature");
    handler(feature)
  }

  /// Start recording changes so they can be undone by [`rollback`](Self::rollback).
  pub fn begin(&mut self) {
    self.staging = Some(Staging::default());
  }

  /// Deliver the queued features and stop recording.
  ///
  /// If a handler rejects a queued feature, the points created since
  /// [`begin`](Self::begin) are removed and the error is returned. Features
  /// already delivered before the rejection stay with their handlers.
  pub fn commit(&mut self) -> Result<(), ExtensionError> {
    let Some(staging) = self.staging.take() else {
      return Ok(());
    };

    for (point, feature) in staging.deferred {
      let delivered = match self.points.get_mut(&point) {
        Some(handler) => handler(feature),
        None => Err(ExtensionError::UnknownPoint(point)),
      };
      if let Err(e) = delivered {
        self.remove_all(&staging.created);
        return Err(e);
      }
    }
    Ok(())
  }

  /// Drop the queued features and remove the points created since [`begin`](Self::begin).
  pub fn rollback(&mut self) {
    if let Some(staging) = self.staging.take() {
      self.remove_all(&staging.created);
    }
  }

  fn remove_all(&mut self, points: &[String]) {
    for point in points {
      if self.points.remove(point).is_some() {
        debug!(point = %point, "removed extension point");
      }
    }
  }

  pub fn contains(&self, point: &str) -> bool {
    self.points.contains_key(point)
  }

  /// Ids of every defined point, sorted.
  pub fn points(&self) -> Vec<String> {
    self.points.keys().cloned().collect()
  }
}

impl fmt::Debug for ExtensionRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ExtensionRegistry").field("points", &self.points()).finish()
  }
}
