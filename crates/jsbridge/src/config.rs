//! Configuration for bridge contexts.

use serde::Deserialize;

/// Engine limits and evaluation settings applied when a context is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Heap limit for the engine instance in bytes.
    /// Default: None (unlimited)
    pub memory_limit: Option<usize>,

    /// Native stack limit for script execution in bytes.
    /// Default: None (engine default)
    pub max_stack_size: Option<usize>,

    /// Allocation threshold that triggers a garbage collection, in bytes.
    /// Default: None (engine default)
    pub gc_threshold: Option<usize>,

    /// Evaluate top-level source in strict mode.
    /// Default: false, so undeclared assignments create globals
    pub strict: bool,

    /// Route `Date.prototype.getTimezoneOffset` through the host environment.
    /// Default: true
    pub timezone_trampoline: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            memory_limit: None,
            max_stack_size: None,
            gc_threshold: None,
            strict: false,
            timezone_trampoline: true,
        }
    }
}

impl BridgeConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine heap limit.
    pub fn memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Set the native stack limit.
    pub fn max_stack_size(mut self, bytes: usize) -> Self {
        self.max_stack_size = Some(bytes);
        self
    }

    /// Set the garbage collection threshold.
    pub fn gc_threshold(mut self, bytes: usize) -> Self {
        self.gc_threshold = Some(bytes);
        self
    }

    /// Enable or disable strict-mode evaluation.
    pub fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }

    /// Enable or disable the time-zone trampoline.
    pub fn timezone_trampoline(mut self, enabled: bool) -> Self {
        self.timezone_trampoline = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert!(config.memory_limit.is_none());
        assert!(config.max_stack_size.is_none());
        assert!(config.gc_threshold.is_none());
        assert!(!config.strict);
        assert!(config.timezone_trampoline);
    }

    #[test]
    fn test_builder_pattern() {
        let config = BridgeConfig::new()
            .memory_limit(64 * 1024 * 1024)
            .strict(true)
            .timezone_trampoline(false);

        assert_eq!(config.memory_limit, Some(64 * 1024 * 1024));
        assert!(config.strict);
        assert!(!config.timezone_trampoline);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"max_stack_size": 1048576, "strict": true}"#).unwrap();
        assert_eq!(config.max_stack_size, Some(1_048_576));
        assert!(config.strict);
        assert!(config.timezone_trampoline);
    }
}
