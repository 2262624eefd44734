use thiserror::Error;
use uuid::Uuid;

use founderhub_db::{is_transient, is_unique_violation};

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("invalid relation kind: {0}")]
    InvalidKind(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A uniqueness violation that reached the caller instead of being
    /// absorbed by a conditional write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient store error: {0}")]
    TransientStore(#[source] anyhow::Error),

    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

pub type SocialResult<T> = Result<T, SocialError>;

impl SocialError {
    /// Classify an error coming out of the store layer.
    pub fn from_store(err: anyhow::Error) -> Self {
        if is_transient(&err) {
            Self::TransientStore(err)
        } else if is_unique_violation(&err) {
            Self::Conflict(err.to_string())
        } else {
            Self::Store(err)
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use founderhub_db::StoreUnavailable;

    #[test]
    fn test_from_store_classification() {
        let unavailable = anyhow::Error::new(StoreUnavailable("timeout".into()));
        let transient = SocialError::from_store(unavailable);
        assert!(transient.is_transient());

        let other = SocialError::from_store(anyhow::anyhow!("disk full"));
        assert!(matches!(other, SocialError::Store(_)));
        assert!(!other.is_transient());
    }
}
