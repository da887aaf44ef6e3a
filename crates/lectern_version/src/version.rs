//! Remote service release versions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Placeholder major version used when detection fails ("assume latest").
pub const UNKNOWN_MAJOR: u32 = 9999;

/// A release version of the remote service.
///
/// Ordering and equality use the `(major, minor, patch)` tuple only; `raw`
/// is kept for display.
///
/// # Examples
///
/// ```
/// use lectern_version::RemoteVersion;
///
/// let v = RemoteVersion::parse("2024-01-05").unwrap();
/// assert!(v.is_at_least(2023, 9, 9));
/// assert!(!v.is_at_least(2024, 1, 6));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, derive_more::Display)]
#[display("{}", raw)]
pub struct RemoteVersion {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
    /// Version string as reported
    pub raw: String,
}

impl RemoteVersion {
    /// Create a version from its parts.
    pub fn new(major: u32, minor: u32, patch: u32, raw: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            patch,
            raw: raw.into(),
        }
    }

    /// Placeholder for a version that could not be detected.
    ///
    /// Compares above any real release so version gates stay open.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_MAJOR, 0, 0, "unknown")
    }

    /// Parse a version string.
    ///
    /// The first three runs of digits become major, minor and patch; missing
    /// components default to zero. `"v2024.1.5"`, `"2024-01-05"` and
    /// `"2024.01.05-stable"` all parse to `(2024, 1, 5)`. Returns `None` when
    /// the string holds no digits or a component overflows.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw
            .split(|c: char| !c.is_ascii_digit())
            .filter(|s| !s.is_empty())
            .map(str::parse::<u32>);

        let major = parts.next()?.ok()?;
        let minor = parts.next().transpose().ok()?.unwrap_or(0);
        let patch = parts.next().transpose().ok()?.unwrap_or(0);
        Some(Self::new(major, minor, patch, raw.trim()))
    }

    /// The `(major, minor, patch)` tuple.
    pub fn as_tuple(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }

    /// True iff this version is at or above `(major, minor, patch)`.
    pub fn is_at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        self.as_tuple() >= (major, minor, patch)
    }

    /// Whether this is the detection-failure placeholder.
    pub fn is_unknown(&self) -> bool {
        self.major >= UNKNOWN_MAJOR
    }
}

impl PartialEq for RemoteVersion {
    fn eq(&self, other: &Self) -> bool {
        self.as_tuple() == other.as_tuple()
    }
}

impl Eq for RemoteVersion {}

impl PartialOrd for RemoteVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RemoteVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_tuple().cmp(&other.as_tuple())
    }
}
