/// Fetch outcome definitions
///
/// Every attempt to process a single resource ends in exactly one of these.
use crate::logging::Severity;
use std::fmt;
use std::path::PathBuf;

/// Result of one fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    // ===== Success =====
    /// Resource written to the given destination
    Saved(PathBuf),

    // ===== Skips =====
    /// URL was already claimed by an earlier or concurrent fetch
    SkippedDuplicateVisit,

    /// Destination was already written during this run
    SkippedDuplicatePath(PathBuf),

    /// Resource lives (or redirects) outside the mirrored host
    SkippedOutOfDomain(String),

    /// Reference could not be turned into a fetchable URL
    SkippedInvalidUrl(String),

    // ===== Failures =====
    /// Server answered with a non-success status
    FailedHttpStatus(u16),

    /// Request timed out; eligible for retry
    FailedTransient(String),

    /// Any other failure (connection, body read, write)
    FailedOther(String),
}

impl FetchOutcome {
    /// Returns true if the resource was written
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    /// Returns true if the resource was deliberately not fetched or not written
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            Self::SkippedDuplicateVisit
                | Self::SkippedDuplicatePath(_)
                | Self::SkippedOutOfDomain(_)
                | Self::SkippedInvalidUrl(_)
        )
    }

    /// Returns true if this is a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::FailedHttpStatus(_) | Self::FailedTransient(_) | Self::FailedOther(_)
        )
    }

    /// Returns true if a retry may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FailedTransient(_))
    }

    /// Severity this outcome is logged at when it comes out of a fetch
    pub fn severity(&self) -> Severity {
        match self {
            Self::Saved(_) => Severity::Success,
            Self::SkippedDuplicateVisit | Self::SkippedInvalidUrl(_) => Severity::Insignificant,
            Self::SkippedDuplicatePath(_) | Self::SkippedOutOfDomain(_) => Severity::Warning,
            Self::FailedHttpStatus(_) | Self::FailedTransient(_) | Self::FailedOther(_) => {
                Severity::Error
            }
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved(path) => write!(f, "saved to {}", path.display()),
            Self::SkippedDuplicateVisit => write!(f, "already visited"),
            Self::SkippedDuplicatePath(path) => {
                write!(f, "destination {} already written", path.display())
            }
            Self::SkippedOutOfDomain(host) => write!(f, "host {} is outside the mirrored domain", host),
            Self::SkippedInvalidUrl(reason) => write!(f, "invalid URL: {}", reason),
            Self::FailedHttpStatus(code) => write!(f, "server returned HTTP {}", code),
            Self::FailedTransient(reason) => write!(f, "timed out: {}", reason),
            Self::FailedOther(reason) => write!(f, "{}", reason),
        }
    }
}
