//! Versioning layer configuration.

/// How a save clears the latest flag on older versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatestDemotion {
    /// Clear the flag on every other version of the model.
    ///
    /// A slow writer finishing after a faster one with a higher version
    /// can briefly leave the model without a latest version.
    Unconditional,
    /// Clear the flag only on lower versions, and clear our own flag if a
    /// higher version already exists.
    #[default]
    Conditional,
}

/// Configuration shared by every versioned collection of a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Page size used when a pagination request asks for 0 items.
    pub default_per_page: u64,

    /// Upper bound on page size.
    pub max_per_page: u64,

    /// Latest-flag demotion strategy.
    pub demotion: LatestDemotion,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_per_page: 25,
            max_per_page: 1000,
            demotion: LatestDemotion::Conditional,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default page size.
    #[must_use]
    pub const fn default_per_page(mut self, value: u64) -> Self {
        self.default_per_page = value;
        self
    }

    /// Sets the maximum page size.
    #[must_use]
    pub const fn max_per_page(mut self, value: u64) -> Self {
        self.max_per_page = value;
        self
    }

    /// Sets the demotion strategy.
    #[must_use]
    pub const fn demotion(mut self, value: LatestDemotion) -> Self {
        self.demotion = value;
        self
    }

    /// Resolves a requested page size against the defaults and the cap.
    #[must_use]
    pub fn effective_per_page(&self, requested: u64) -> u64 {
        let per_page = if requested == 0 {
            self.default_per_page
        } else {
            requested
        };
        per_page.clamp(1, self.max_per_page.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.default_per_page, 25);
        assert_eq!(config.max_per_page, 1000);
        assert_eq!(config.demotion, LatestDemotion::Conditional);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .default_per_page(10)
            .max_per_page(50)
            .demotion(LatestDemotion::Unconditional);

        assert_eq!(config.default_per_page, 10);
        assert_eq!(config.max_per_page, 50);
        assert_eq!(config.demotion, LatestDemotion::Unconditional);
    }

    #[test]
    fn per_page_resolution() {
        let config = Config::new().default_per_page(10).max_per_page(50);
        assert_eq!(config.effective_per_page(0), 10);
        assert_eq!(config.effective_per_page(7), 7);
        assert_eq!(config.effective_per_page(500), 50);
    }
}
