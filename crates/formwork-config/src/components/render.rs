//! Render, undo and registry configuration
//!
//! These three sections configure the in-process rendering core and are kept
//! together because a host application always sets them up at the same time.

use serde::{Deserialize, Serialize};

/// Default bound on the undo stack
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Default recursion limit for nested schemas
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Schema renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum nesting depth before a subtree is replaced by a placeholder
    pub max_depth: usize,
    /// Active locale for translated labels
    pub locale: String,
    /// Locale consulted when a key is missing in the active locale
    pub fallback_locale: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            locale: "en".to_string(),
            fallback_locale: "en".to_string(),
        }
    }
}

/// Undo manager configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UndoConfig {
    /// Number of operations kept on the undo stack
    pub max_history: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

/// Component registry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Log overrides of an existing registration at `warn` instead of `debug`
    pub warn_on_override: bool,
    /// Namespace used for unqualified type names
    pub default_namespace: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            warn_on_override: false,
            default_namespace: "default".to_string(),
        }
    }
}
