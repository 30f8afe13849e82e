//! Resolver configuration.

/// Default upper bound on entries carried by a single mutation call.
pub const DEFAULT_MAX_BATCH_LEN: usize = 256;

/// Tunables for a [`Resolver`](crate::registry::Resolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum entries per registration, configuration or blacklist call.
    ///
    /// Large configurations are split across several batched calls.
    pub max_batch_len: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverConfig {
    /// Create the default configuration.
    pub const fn new() -> Self {
        Self {
            max_batch_len: DEFAULT_MAX_BATCH_LEN,
        }
    }

    /// Set the per-call entry limit.
    pub const fn with_max_batch_len(mut self, max_batch_len: usize) -> Self {
        self.max_batch_len = max_batch_len;
        self
    }
}
