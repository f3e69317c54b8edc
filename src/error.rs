//! Error types shared across the crate.
//!
//! Every fallible operation returns [`TreeResult`]. Structural rule breaches,
//! missing nodes, bad path input, and backend failures are all distinguishable
//! variants so callers can map them to their own status codes.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Error, Debug)]
pub enum TreeError {
    /// A caller-supplied path segment was empty or contained the reserved
    /// separator character.
    #[error("Invalid path segment {segment:?}: {reason}")]
    InvalidSegment { segment: String, reason: &'static str },

    /// The mutation would leave the index structurally inconsistent
    /// (orphaned children, a leaf root, a leaf parent, a group collapsed
    /// into a leaf).
    #[error("Structural violation: {0}")]
    StructuralViolation(String),

    /// The operation required a node that does not exist.
    #[error("No node at path '{0}'")]
    NotFound(String),

    /// The backing index failed or was unreachable. Never retried here;
    /// retry policy belongs to the caller.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// The resource store collaborator failed; its message is surfaced
    /// unchanged.
    #[error("Resource store failure: {0}")]
    ResourceStoreFailure(String),
}

impl TreeError {
    /// Stable lowercase tag for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TreeError::InvalidSegment { .. } => "invalid_segment",
            TreeError::StructuralViolation(_) => "structural_violation",
            TreeError::NotFound(_) => "not_found",
            TreeError::IndexUnavailable(_) => "index_unavailable",
            TreeError::ResourceStoreFailure(_) => "resource_store_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = TreeError::InvalidSegment {
            segment: "a\u{1}b".to_string(),
            reason: "contains the reserved separator",
        };
        assert!(err.to_string().contains("Invalid path segment"));

        let err = TreeError::NotFound("/pages/home".to_string());
        assert_eq!(err.to_string(), "No node at path '/pages/home'");
    }

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(
            TreeError::StructuralViolation("x".into()).kind(),
            "structural_violation"
        );
        assert_eq!(
            TreeError::IndexUnavailable("boom".into()).kind(),
            "index_unavailable"
        );
    }
}
