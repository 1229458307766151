//! Module manifests in JAR manifest syntax.
//!
//! Only the main section is read. Header names are case-insensitive, and a
//! line that starts with a single space continues the previous header's value.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{ModuleDescriptor, ModuleError};
use crate::consts::MODULE_MANIFEST_PATH;
use crate::version::{Dependency, SemanticVersion};

/// Parse the main section into lower-cased header names and their values.
pub fn parse_headers(text: &str, location: &str) -> Result<BTreeMap<String, String>, ModuleError> {
  let mut headers: BTreeMap<String, String> = BTreeMap::new();
  let mut current: Option<String> = None;

  for (number, line) in text.lines().enumerate() {
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line.is_empty() {
      if current.is_some() {
        break;
      }
      continue;
    }

    if let Some(continuation) = line.strip_prefix(' ') {
      let Some(value) = current.as_ref().and_then(|key| headers.get_mut(key)) else {
        return Err(invalid(location, format!("line {}: continuation without a header", number + 1)));
      };
      value.push_str(continuation);
      continue;
    }

    let Some((key, value)) = line.split_once(':') else {
      return Err(invalid(location, format!("line {}: expected 'Name: value'", number + 1)));
    };
    let key = key.trim();
    if key.is_empty() {
      return Err(invalid(location, format!("line {}: empty header name", number + 1)));
    }

    let key = key.to_ascii_lowercase();
    headers.insert(key.clone(), value.strip_prefix(' ').unwrap_or(value).to_string());
    current = Some(key);
  }

  Ok(headers)
}

/// Build a descriptor from manifest text.
pub fn parse_descriptor(text: &str, location: &str) -> Result<ModuleDescriptor, ModuleError> {
  let headers = parse_headers(text, location)?;
  let header = |name: &str| {
    headers
      .get(&name.to_ascii_lowercase())
      .map(|v| v.trim())
      .filter(|v| !v.is_empty())
  };

  let id = header("Bundle-SymbolicName")
    .and_then(|value| value.split(';').next())
    .map(str::trim)
    .filter(|id| !id.is_empty())
    .ok_or_else(|| invalid(location, "missing Bundle-SymbolicName".to_string()))?;

  let version = header("Bundle-Version").ok_or_else(|| invalid(location, "missing Bundle-Version".to_string()))?;
  let version = SemanticVersion::parse(version).map_err(|source| ModuleError::MalformedVersion {
    location: location.to_string(),
    source,
  })?;

  let activator = header("Bundle-Activator").ok_or_else(|| invalid(location, "missing Bundle-Activator".to_string()))?;

  let dependencies = match header("Require-Bundle") {
    Some(expression) => Dependency::parse_list(expression).map_err(|source| ModuleError::MalformedVersion {
      location: location.to_string(),
      source,
    })?,
    None => Vec::new(),
  };

  let mut descriptor = ModuleDescriptor::new(id, version, activator).with_dependencies(dependencies);
  if let Some(name) = header("Bundle-Name") {
    descriptor = descriptor.with_name(name);
  }
  Ok(descriptor)
}

/// Read the descriptor of a module archive.
pub fn read_archive(path: &Path) -> Result<ModuleDescriptor, ModuleError> {
  let file = File::open(path).map_err(|source| ModuleError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let mut archive = zip::ZipArchive::new(file).map_err(|source| ModuleError::Archive {
    path: path.to_path_buf(),
    source,
  })?;

  let mut manifest = match archive.by_name(MODULE_MANIFEST_PATH) {
    Ok(manifest) => manifest,
    Err(zip::result::ZipError::FileNotFound) => {
      return Err(ModuleError::MissingManifest {
        path: path.to_path_buf(),
      });
    }
    Err(source) => {
      return Err(ModuleError::Archive {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  let mut text = String::new();
  manifest.read_to_string(&mut text).map_err(|source| ModuleError::Io {
    path: path.to_path_buf(),
    source,
  })?;

  let location = path.display().to_string();
  Ok(parse_descriptor(&text, &location)?.with_location(path))
}

fn invalid(location: &str, reason: String) -> ModuleError {
  ModuleError::InvalidManifest {
    location: location.to_string(),
    reason,
  }
}
