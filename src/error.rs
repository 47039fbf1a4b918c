//! Error type shared by the singleton and guarded-resource primitives.

use core::fmt;
use std::error::Error;
use std::time::Duration;

/// Boxed error returned by a fallible initializer.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Recoverable failures surfaced by this crate.
///
/// None of these are fatal to the primitive that reported them: a singleton
/// stays retryable after `InitializationFailed`, nothing is mutated on
/// `LockTimeout`, and a poisoned resource can be recovered explicitly.
#[derive(Debug)]
pub enum SyncError {
    /// The initializer returned an error; the cell is uninitialized again.
    InitializationFailed(BoxError),
    /// The lock was not obtained within the given bound.
    LockTimeout(Duration),
    /// A previous holder panicked while mutating the payload.
    ResourcePoisoned,
}

impl SyncError {
    /// Returns `true` for [`SyncError::LockTimeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout(_))
    }

    /// Returns `true` for [`SyncError::ResourcePoisoned`].
    pub fn is_poisoned(&self) -> bool {
        matches!(self, Self::ResourcePoisoned)
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(source) => write!(f, "initialization failed: {source}"),
            Self::LockTimeout(waited) => write!(f, "lock not acquired within {waited:?}"),
            Self::ResourcePoisoned => f.write_str("resource poisoned by a panicking holder"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InitializationFailed(source) => Some(source.as_ref()),
            Self::LockTimeout(_) | Self::ResourcePoisoned => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_chain() {
        let err = SyncError::InitializationFailed("disk unavailable".into());
        assert_eq!(err.to_string(), "initialization failed: disk unavailable");
        assert_eq!(err.source().unwrap().to_string(), "disk unavailable");
        assert!(SyncError::ResourcePoisoned.source().is_none());
    }

    #[test]
    fn test_predicates() {
        assert!(SyncError::LockTimeout(Duration::from_millis(5)).is_timeout());
        assert!(SyncError::ResourcePoisoned.is_poisoned());
        assert!(!SyncError::ResourcePoisoned.is_timeout());
    }
}
