use crate::error::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HEADER_SUFFIX: &str = ".h";

/// Settings shared by the locator and the interpreter chain.
///
/// ```toml
/// header_suffixes = [".h", ".hh"]
/// search_string = "xref-metadata"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Filenames ending in one of these are headers that open with an
    /// encoded comment block. The suffix is stripped before interpreters see
    /// the filename.
    pub header_suffixes: Vec<String>,
    /// Token to scan for after a comment marker and a single space.
    pub search_string: Option<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            header_suffixes: vec![DEFAULT_HEADER_SUFFIX.to_string()],
            search_string: None,
        }
    }
}

impl MetadataConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The header suffix `filename` ends with, if any.
    pub fn header_suffix<'a>(&'a self, filename: &str) -> Option<&'a str> {
        self.header_suffixes
            .iter()
            .map(String::as_str)
            .filter(|suffix| !suffix.is_empty())
            .find(|suffix| filename.ends_with(suffix))
    }

    /// `filename` with its header suffix removed.
    pub fn strip_header_suffix<'f>(&self, filename: &'f str) -> &'f str {
        match self.header_suffix(filename) {
            Some(suffix) => &filename[..filename.len() - suffix.len()],
            None => filename,
        }
    }

    /// Explicit search string wins over the configured one.
    pub fn effective_search_string<'a>(&'a self, explicit: &'a str) -> &'a str {
        if explicit.is_empty() {
            self.search_string.as_deref().unwrap_or("")
        } else {
            explicit
        }
    }
}
