//! Version-gated features.

use crate::RemoteVersion;

/// Minimum release version for each gated feature.
///
/// Features not listed here are treated as available.
pub const FEATURE_MINIMUMS: &[(&str, (u32, u32, u32))] = &[
    ("course_pacing", (2022, 9, 0)),
    ("smart_search", (2023, 7, 0)),
    ("discussion_checkpoints", (2024, 1, 0)),
    ("block_editor", (2024, 6, 0)),
    ("ai_grading_assistance", (2025, 2, 0)),
];

/// Minimum version for a feature, if it is gated.
pub fn minimum_version(feature: &str) -> Option<(u32, u32, u32)> {
    FEATURE_MINIMUMS
        .iter()
        .find(|(name, _)| *name == feature)
        .map(|(_, minimum)| *minimum)
}

impl RemoteVersion {
    /// Whether the feature is available at this version.
    ///
    /// Unlisted features fail open.
    ///
    /// # Examples
    ///
    /// ```
    /// use lectern_version::RemoteVersion;
    ///
    /// let v = RemoteVersion::new(2023, 8, 0, "2023.8");
    /// assert!(v.supports_feature("smart_search"));
    /// assert!(!v.supports_feature("discussion_checkpoints"));
    /// assert!(v.supports_feature("something_new"));
    /// ```
    pub fn supports_feature(&self, feature: &str) -> bool {
        match minimum_version(feature) {
            Some((major, minor, patch)) => self.is_at_least(major, minor, patch),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_at_exact_minimum() {
        let v = RemoteVersion::new(2024, 1, 0, "2024.1");
        assert!(v.supports_feature("discussion_checkpoints"));
        assert!(!v.supports_feature("block_editor"));
    }

    #[test]
    fn test_unknown_feature_fails_open() {
        let ancient = RemoteVersion::new(2000, 1, 1, "2000.1.1");
        assert!(ancient.supports_feature("not_in_table"));
        assert!(!ancient.supports_feature("course_pacing"));
    }

    #[test]
    fn test_unknown_version_supports_everything() {
        let unknown = RemoteVersion::unknown();
        assert!(FEATURE_MINIMUMS.iter().all(|(name, _)| unknown.supports_feature(name)));
    }
}
