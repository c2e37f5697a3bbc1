//! Archive core tuning knobs.
//!
//! # Invariants
//! - `1 <= default_page_size <= max_page_size`.
//! - `max_search_chars` and `description_preview_chars` are non-zero.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_SEARCH_CHARS: usize = 200;
pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;

/// Runtime configuration for list limits and summary rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Page size applied when a caller does not pass one.
    pub default_page_size: u32,
    /// Largest page size a caller may request.
    pub max_page_size: u32,
    /// Longest accepted search text, in characters.
    pub max_search_chars: usize,
    /// Note body characters kept when deriving a description.
    pub description_preview_chars: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            max_search_chars: MAX_SEARCH_CHARS,
            description_preview_chars: DESCRIPTION_PREVIEW_CHARS,
        }
    }
}

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid archive config: {}", self.0)
    }
}

impl Error for ConfigError {}

impl ArchiveConfig {
    /// Checks cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError("max_page_size must be positive".to_string()));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError(format!(
                "default_page_size must be within 1..={}, got {}",
                self.max_page_size, self.default_page_size
            )));
        }
        if self.max_search_chars == 0 {
            return Err(ConfigError("max_search_chars must be positive".to_string()));
        }
        if self.description_preview_chars == 0 {
            return Err(ConfigError(
                "description_preview_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ArchiveConfig;

    #[test]
    fn default_config_is_valid() {
        ArchiveConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn default_page_size_must_fit_under_max() {
        let config = ArchiveConfig {
            default_page_size: 500,
            ..ArchiveConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_page_size"));
    }
}
