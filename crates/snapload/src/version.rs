//! Native library version check
//!
//! Advisory only: a mismatch is logged but the library stays usable, since
//! compatibility is decided by the symbol table, not the version string.

use std::fmt;

use crate::native::LinkedLibrary;

/// Version of the native library this crate was built against
pub const EXPECTED_NATIVE_VERSION: &str = "1.1.10";

/// Version string reported by a native library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        VersionToken(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as semver, tolerating a leading `v`.
    pub fn semver(&self) -> Option<semver::Version> {
        let s = self.0.strip_prefix('v').unwrap_or(&self.0);
        semver::Version::parse(s).ok()
    }

    /// Whether this token denotes the same version as `expected`.
    ///
    /// Semver-shaped tokens compare by version (so `v1.1.10` matches
    /// `1.1.10`); anything else compares as text.
    pub fn matches(&self, expected: &VersionToken) -> bool {
        match (self.semver(), expected.semver()) {
            (Some(a), Some(b)) => a == b,
            _ => self.0 == expected.0,
        }
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of comparing the loaded library's version with the expected one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReport {
    /// `None` when the library returned no version string
    pub found: Option<VersionToken>,
    pub expected: VersionToken,
}

impl VersionReport {
    pub fn is_match(&self) -> bool {
        self.found
            .as_ref()
            .is_some_and(|found| found.matches(&self.expected))
    }
}

/// Query the version entry point of a freshly linked library.
pub fn check_version(library: &LinkedLibrary, expected: &str) -> VersionReport {
    let report = VersionReport {
        found: library.api().version_string().map(VersionToken::new),
        expected: VersionToken::new(expected),
    };

    match &report.found {
        Some(found) if report.is_match() => {
            tracing::debug!(version = %found, "native library version verified");
        }
        Some(found) => {
            tracing::warn!(
                found = %found,
                expected = %report.expected,
                path = %library.path().display(),
                "native library version mismatch"
            );
        }
        None => {
            tracing::warn!(
                expected = %report.expected,
                path = %library.path().display(),
                "native library reported no version"
            );
        }
    }

    report
}
