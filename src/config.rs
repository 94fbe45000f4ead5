//! Reader configuration and validation.
//!
//! Holds the separator characters, optional required extension and payload
//! offset a reader is driven with. Configuration takes effect for reads
//! started after it is applied.

use crate::constants::{DEFAULT_OFFSET, DEFAULT_SEPARATORS};
use crate::error::{CloudError, Result};
use crate::tokenizer::SeparatorSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for an [`AsciiReader`](crate::reader::AsciiReader)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Characters that separate tokens on a line
    pub separators: String,

    /// Extension (including the leading dot) a path must carry, if any
    pub required_extension: Option<String>,

    /// Byte offset at which the text payload starts
    pub offset: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            separators: DEFAULT_SEPARATORS.to_string(),
            required_extension: None,
            offset: DEFAULT_OFFSET,
        }
    }
}

impl ReaderConfig {
    /// Set the separator characters
    pub fn with_separators(mut self, separators: impl Into<String>) -> Self {
        self.separators = separators.into();
        self
    }

    /// Require paths to carry `extension` (e.g. ".xyz")
    pub fn with_required_extension(mut self, extension: impl Into<String>) -> Self {
        self.required_extension = Some(extension.into());
        self
    }

    /// Start reading at `offset` bytes into the file
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Check the configuration for values no read could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.separators.is_empty() {
            return Err(CloudError::Configuration {
                message: "separator set must contain at least one character".to_string(),
            });
        }

        if let Some(extension) = &self.required_extension {
            validate_extension(extension)?;
        }

        debug!(
            "Validated reader config: separators={:?}, extension={:?}, offset={}",
            self.separators, self.required_extension, self.offset
        );
        Ok(())
    }

    /// Separator set described by this configuration
    pub fn separator_set(&self) -> Result<SeparatorSet> {
        SeparatorSet::new(&self.separators)
    }
}

/// Extensions are written with their leading dot and at least one more character
pub(crate) fn validate_extension(extension: &str) -> Result<()> {
    if extension.len() < 2 || !extension.starts_with('.') {
        return Err(CloudError::Configuration {
            message: format!(
                "extension '{}' must start with '.' followed by at least one character",
                extension
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReaderConfig::default();
        assert_eq!(config.separators, " \t\n,");
        assert_eq!(config.required_extension, None);
        assert_eq!(config.offset, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ReaderConfig::default()
            .with_separators(";")
            .with_required_extension(".xyz")
            .with_offset(513);

        assert_eq!(config.separators, ";");
        assert_eq!(config.required_extension.as_deref(), Some(".xyz"));
        assert_eq!(config.offset, 513);
        assert!(config.validate().is_ok());
        assert!(config.separator_set().unwrap().contains(';'));
    }

    #[test]
    fn test_validation_failures() {
        let empty = ReaderConfig::default().with_separators("");
        assert!(matches!(
            empty.validate(),
            Err(CloudError::Configuration { .. })
        ));

        let no_dot = ReaderConfig::default().with_required_extension("xyz");
        assert!(no_dot.validate().is_err());

        let bare_dot = ReaderConfig::default().with_required_extension(".");
        assert!(bare_dot.validate().is_err());
    }
}
