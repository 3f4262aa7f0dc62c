use crate::document::DocumentId;
use thiserror::Error;

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

/// Failures raised by the engine. Both kinds are reported before any index
/// mutation happens for the call that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("document {0} not found")]
    DocumentNotFound(DocumentId),
}

impl SearchError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SearchError::InvalidInput(msg.into())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, SearchError::InvalidInput(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchError::DocumentNotFound(_))
    }
}
