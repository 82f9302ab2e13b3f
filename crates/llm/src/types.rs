//! Provider identification.

use filings_core::config::canonical_provider;

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Claude,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    ///
    /// Accepts the same spellings as the configuration layer (any case,
    /// `anthropic` for Claude).
    pub fn parse(s: &str) -> Option<Self> {
        match canonical_provider(s).as_str() {
            "claude" => Some(Self::Claude),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Ollama => "ollama",
        }
    }
}
