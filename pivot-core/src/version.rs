//! Version counters.

/// Registry-wide snapshot counter. `0` means "nothing registered".
pub type GlobalVersion = u64;

/// Per-configuration counter of finalized batches. `0` means "none finalized".
pub type ConfigurationVersion = u64;

/// Lifecycle status of a global version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VersionStatus {
    /// The version was never created.
    #[default]
    None,
    /// The version may be selected by new configurations.
    Activated,
    /// Soft-disabled; still resolvable for historical lookups.
    Deactivated,
}
