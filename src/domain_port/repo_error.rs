use crate::context::ContextError;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{entity} already exists")]
    Conflict { entity: &'static str },
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl RepoError {
    pub fn store<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        RepoError::Store(err.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound { .. })
    }
}
