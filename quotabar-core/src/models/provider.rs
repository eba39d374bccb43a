//! Provider-related types.
//!
//! - [`ProviderKind`] - Stable identifier of a usage provider
//! - [`ProviderIdentity`] - Account identity (siloed per provider)
//! - [`LoginMethod`] - How the account authenticated

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Provider Kind
// ============================================================================

/// Supported usage providers.
///
/// Identifiers are persisted in settings and must never be reused for a
/// different provider once shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI Codex
    Codex,
    /// Anthropic Claude
    Claude,
    /// Cursor IDE
    Cursor,
    /// Google Gemini
    Gemini,
    /// GitHub Copilot
    Copilot,
    /// Factory AI
    Factory,
    /// Google Cloud Vertex AI
    VertexAI,
    /// z.ai
    Zai,
    /// Augment Code
    Augment,
    /// Kiro AI
    Kiro,
    /// Antigravity AI
    Antigravity,
    /// MiniMax
    MiniMax,
}

impl ProviderKind {
    /// Returns the display name for this provider.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Codex => "Codex",
            Self::Claude => "Claude",
            Self::Cursor => "Cursor",
            Self::Gemini => "Gemini",
            Self::Copilot => "Copilot",
            Self::Factory => "Factory",
            Self::VertexAI => "Vertex AI",
            Self::Zai => "z.ai",
            Self::Augment => "Augment",
            Self::Kiro => "Kiro",
            Self::Antigravity => "Antigravity",
            Self::MiniMax => "MiniMax",
        }
    }

    /// Returns all known provider kinds.
    pub fn all() -> &'static [ProviderKind] {
        &[
            Self::Codex,
            Self::Claude,
            Self::Cursor,
            Self::Gemini,
            Self::Copilot,
            Self::Factory,
            Self::VertexAI,
            Self::Zai,
            Self::Augment,
            Self::Kiro,
            Self::Antigravity,
            Self::MiniMax,
        ]
    }

    /// Returns the CLI name for this provider (lowercase, no spaces).
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Claude => "claude",
            Self::Cursor => "cursor",
            Self::Gemini => "gemini",
            Self::Copilot => "copilot",
            Self::Factory => "factory",
            Self::VertexAI => "vertexai",
            Self::Zai => "zai",
            Self::Augment => "augment",
            Self::Kiro => "kiro",
            Self::Antigravity => "antigravity",
            Self::MiniMax => "minimax",
        }
    }

    /// Looks up a provider by its CLI name (case-insensitive).
    pub fn from_cli_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::all().iter().copied().find(|k| k.cli_name() == name)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Provider Identity
// ============================================================================

/// Account identity information for a provider.
///
/// **Important**: This is siloed per provider - never mix identity from
/// different providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderIdentity {
    /// Account email address.
    #[serde(default)]
    pub account_email: Option<String>,
    /// Organization name (if applicable).
    #[serde(default)]
    pub account_organization: Option<String>,
    /// Plan/subscription name.
    #[serde(default)]
    pub plan_name: Option<String>,
    /// How the user authenticated.
    #[serde(default)]
    pub login_method: Option<LoginMethod>,
}

impl ProviderIdentity {
    /// Creates an empty identity.
    pub fn new() -> Self {
        Self {
            account_email: None,
            account_organization: None,
            plan_name: None,
            login_method: None,
        }
    }

    /// Returns a display string, falling back to the provider name.
    pub fn display_string(&self, provider: ProviderKind) -> String {
        match (&self.account_email, &self.account_organization) {
            (Some(email), Some(org)) => format!("{email} ({org})"),
            (Some(email), None) => email.clone(),
            (None, Some(org)) => org.clone(),
            (None, None) => provider.display_name().to_string(),
        }
    }
}

impl Default for ProviderIdentity {
    fn default() -> Self {
        Self::new()
    }
}

/// How the user authenticated with a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    /// OAuth 2.0 flow.
    OAuth,
    /// API key authentication.
    ApiKey,
    /// Browser cookies.
    BrowserCookies,
    /// CLI tool authentication.
    CLI,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_display_name() {
        assert_eq!(ProviderKind::Claude.display_name(), "Claude");
        assert_eq!(ProviderKind::VertexAI.to_string(), "Vertex AI");
    }

    #[test]
    fn test_from_cli_name() {
        assert_eq!(ProviderKind::from_cli_name("claude"), Some(ProviderKind::Claude));
        assert_eq!(ProviderKind::from_cli_name(" VertexAI "), Some(ProviderKind::VertexAI));
        assert_eq!(ProviderKind::from_cli_name("nope"), None);
    }

    #[test]
    fn test_cli_names_are_unique() {
        let mut names: Vec<_> = ProviderKind::all().iter().map(|k| k.cli_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ProviderKind::all().len());
    }

    #[test]
    fn test_identity_display_string() {
        let mut identity = ProviderIdentity::new();
        assert_eq!(identity.display_string(ProviderKind::Codex), "Codex");

        identity.account_email = Some("test@example.com".to_string());
        identity.account_organization = Some("Acme Inc".to_string());
        assert_eq!(
            identity.display_string(ProviderKind::Claude),
            "test@example.com (Acme Inc)"
        );
    }
}
