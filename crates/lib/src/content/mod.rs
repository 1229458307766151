//! Content types and codecs.
//!
//! Every entry in a namespace root carries a [`ContentType`]. The type names a
//! canonical file suffix and the [`Codec`] that turns stored bytes into
//! [`Content`] and back. Types compare by identity: two types built from the
//! same name and suffix are still distinct unless they are clones of one
//! another.

mod registry;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::string::FromUtf8Error;
use std::sync::Arc;

use thiserror::Error;

pub use registry::ContentRegistry;

/// Decoded payload of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
  Binary(Vec<u8>),
  Text(String),
}

impl Content {
  pub fn as_bytes(&self) -> &[u8] {
    match self {
      Content::Binary(bytes) => bytes,
      Content::Text(text) => text.as_bytes(),
    }
  }

  pub fn into_bytes(self) -> Vec<u8> {
    match self {
      Content::Binary(bytes) => bytes,
      Content::Text(text) => text.into_bytes(),
    }
  }

  pub fn len(&self) -> usize {
    self.as_bytes().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Failure inside a codec.
#[derive(Debug, Error)]
pub enum CodecError {
  #[error("content is not valid UTF-8: {0}")]
  InvalidUtf8(#[from] FromUtf8Error),

  #[error("{0}")]
  Other(String),
}

/// Errors raised by content types and the content registry.
#[derive(Debug, Error)]
pub enum ContentError {
  #[error("cannot convert {content_type} content: {source}")]
  Codec {
    content_type: String,
    #[source]
    source: CodecError,
  },

  #[error("suffix '{suffix}' is already registered to content type '{existing}'")]
  DuplicateSuffix { suffix: String, existing: String },
}

/// Converts between stored bytes and decoded [`Content`].
pub trait Codec: Send + Sync {
  fn decode(&self, bytes: Vec<u8>) -> Result<Content, CodecError>;

  fn encode(&self, content: &Content) -> Result<Vec<u8>, CodecError>;
}

/// Stores bytes untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl Codec for BinaryCodec {
  fn decode(&self, bytes: Vec<u8>) -> Result<Content, CodecError> {
    Ok(Content::Binary(bytes))
  }

  fn encode(&self, content: &Content) -> Result<Vec<u8>, CodecError> {
    Ok(content.as_bytes().to_vec())
  }
}

/// UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
  fn decode(&self, bytes: Vec<u8>) -> Result<Content, CodecError> {
    Ok(Content::Text(String::from_utf8(bytes)?))
  }

  fn encode(&self, content: &Content) -> Result<Vec<u8>, CodecError> {
    match content {
      Content::Text(text) => Ok(text.as_bytes().to_vec()),
      Content::Binary(bytes) => Ok(String::from_utf8(bytes.clone())?.into_bytes()),
    }
  }
}

struct ContentTypeInner {
  name: String,
  suffix: String,
  codec: Box<dyn Codec>,
}

/// Handle to a registered content type.
///
/// Cloning is cheap and clones compare equal. Independently constructed types
/// never do, even with the same name and suffix.
#[derive(Clone)]
pub struct ContentType(Arc<ContentTypeInner>);

impl ContentType {
  pub fn new(name: impl Into<String>, suffix: impl Into<String>, codec: impl Codec + 'static) -> Self {
    Self(Arc::new(ContentTypeInner {
      name: name.into(),
      suffix: suffix.into(),
      codec: Box::new(codec),
    }))
  }

  /// A UTF-8 text type.
  pub fn text(name: impl Into<String>, suffix: impl Into<String>) -> Self {
    Self::new(name, suffix, TextCodec)
  }

  /// A raw byte type.
  pub fn binary(name: impl Into<String>, suffix: impl Into<String>) -> Self {
    Self::new(name, suffix, BinaryCodec)
  }

  pub fn name(&self) -> &str {
    &self.0.name
  }

  /// Canonical file suffix, without the leading dot.
  pub fn suffix(&self) -> &str {
    &self.0.suffix
  }

  pub fn decode(&self, bytes: Vec<u8>) -> Result<Content, ContentError> {
    self.0.codec.decode(bytes).map_err(|source| self.codec_error(source))
  }

  pub fn encode(&self, content: &Content) -> Result<Vec<u8>, ContentError> {
    self.0.codec.encode(content).map_err(|source| self.codec_error(source))
  }

  fn codec_error(&self, source: CodecError) -> ContentError {
    ContentError::Codec {
      content_type: self.0.name.clone(),
      source,
    }
  }
}

impl PartialEq for ContentType {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl Eq for ContentType {}

impl Hash for ContentType {
  fn hash<H: Hasher>(&self, state: &mut H) {
    std::ptr::hash(Arc::as_ptr(&self.0), state);
  }
}

impl fmt::Debug for ContentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContentType")
      .field("name", &self.0.name)
      .field("suffix", &self.0.suffix)
      .finish()
  }
}

impl fmt::Display for ContentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0.name)
  }
}
