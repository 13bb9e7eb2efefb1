//! Configuration for authoring and validation.

use crate::compliance::types::{PdfALevel, PdfVersion};
use crate::content::checker::DEFAULT_MAX_FORM_DEPTH;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Document authoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Target profile.
    pub level: PdfALevel,

    /// Producer written to XMP and the Info dictionary.
    pub producer: String,

    /// Document title for XMP.
    pub title: Option<String>,

    /// Flate-compress content streams.
    pub compress: bool,

    /// Write the XMP metadata stream at close.
    pub generate_xmp: bool,

    /// Write a trailer /ID at close.
    pub generate_trailer_id: bool,

    /// Header version, e.g. "1.7". The profile default when unset.
    pub header_version: Option<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::new(PdfALevel::A2b)
    }
}

impl DocumentConfig {
    /// Create configuration with defaults for a level.
    pub fn new(level: PdfALevel) -> Self {
        Self {
            level,
            producer: concat!("pdfa_conformance ", env!("CARGO_PKG_VERSION")).to_string(),
            title: None,
            compress: true,
            generate_xmp: true,
            generate_trailer_id: true,
            header_version: None,
        }
    }

    /// Load configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the producer string.
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = producer.into();
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Enable or disable content stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Enable or disable XMP generation.
    pub fn with_xmp(mut self, enable: bool) -> Self {
        self.generate_xmp = enable;
        self
    }

    /// Enable or disable the trailer /ID.
    pub fn with_trailer_id(mut self, enable: bool) -> Self {
        self.generate_trailer_id = enable;
        self
    }

    /// Override the header version.
    pub fn with_header_version(mut self, version: impl Into<String>) -> Self {
        self.header_version = Some(version.into());
        self
    }

    /// The parsed header version override, if any.
    pub fn parsed_header_version(&self) -> Result<Option<PdfVersion>> {
        self.header_version
            .as_deref()
            .map(|v| PdfVersion::parse(v).ok_or_else(|| Error::Config(format!("invalid header version '{}'", v))))
            .transpose()
    }
}

/// Options for validating existing files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Replay page content streams through the content checks.
    pub replay_content: bool,

    /// Nesting limit for form XObjects and patterns during replay.
    pub max_form_depth: usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self {
            replay_content: true,
            max_form_depth: DEFAULT_MAX_FORM_DEPTH,
        }
    }

    /// Enable or disable content replay.
    pub fn with_replay_content(mut self, enable: bool) -> Self {
        self.replay_content = enable;
        self
    }

    /// Set the form nesting limit.
    pub fn with_max_form_depth(mut self, depth: usize) -> Self {
        self.max_form_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocumentConfig::new(PdfALevel::A3u);
        assert_eq!(config.level, PdfALevel::A3u);
        assert!(config.compress);
        assert!(config.generate_xmp);
        assert!(config.producer.starts_with("pdfa_conformance"));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = DocumentConfig::from_json(r#"{"level": "a4f", "compress": false}"#).unwrap();
        assert_eq!(config.level, PdfALevel::A4f);
        assert!(!config.compress);
        assert!(config.generate_trailer_id);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(DocumentConfig::from_json("{"), Err(Error::Config(_))));
    }

    #[test]
    fn test_header_version_override() {
        let config = DocumentConfig::new(PdfALevel::A1b).with_header_version("1.4");
        assert_eq!(config.parsed_header_version().unwrap(), Some(PdfVersion::V1_4));
        let bad = DocumentConfig::new(PdfALevel::A1b).with_header_version("one");
        assert!(bad.parsed_header_version().is_err());
    }

    #[test]
    fn test_validator_options_builder() {
        let options = ValidatorOptions::new().with_replay_content(false).with_max_form_depth(4);
        assert!(!options.replay_content);
        assert_eq!(options.max_form_depth, 4);
    }
}
