//! Tagged outcome of a backend lookup

/// Result of asking one backend for media.
///
/// `Found` and `NotFound` end a request. `BackendUnavailable` means the next
/// backend in the chain should be asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome<T> {
    Found(T),
    NotFound,
    BackendUnavailable,
}

impl<T> ResolutionOutcome<T> {
    /// Whether the backend could not be asked.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable)
    }

    /// The found value, if any.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_extracts_value() {
        assert_eq!(ResolutionOutcome::Found("x").found(), Some("x"));
        assert_eq!(ResolutionOutcome::<i32>::NotFound.found(), None);
        assert_eq!(ResolutionOutcome::<i32>::BackendUnavailable.found(), None);
    }

    #[test]
    fn test_only_unavailable_is_unavailable() {
        assert!(ResolutionOutcome::<i32>::BackendUnavailable.is_unavailable());
        assert!(!ResolutionOutcome::<i32>::NotFound.is_unavailable());
        assert!(!ResolutionOutcome::Found(1).is_unavailable());
    }
}
