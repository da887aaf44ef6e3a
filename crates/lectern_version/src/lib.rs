//! Remote version detection and feature gating.
//!
//! The remote service reports its release in a JSON object carried by the
//! `X-Canvas-Meta` response header. [`VersionDetector`] probes for it once per
//! base address and persists the result through a [`VersionStore`] for 24
//! hours. [`RemoteVersion::supports_feature`] gates behaviour on the
//! [`FEATURE_MINIMUMS`] table.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod detector;
mod features;
mod record;
mod store;
mod version;

pub use detector::{META_HEADER, VersionDetector, version_from_headers};
pub use features::{FEATURE_MINIMUMS, minimum_version};
pub use record::{CachedVersionRecord, record_key};
pub use store::{FileVersionStore, MemoryVersionStore, VersionStore};
pub use version::{RemoteVersion, UNKNOWN_MAJOR};
