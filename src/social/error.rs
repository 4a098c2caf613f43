use thiserror::Error;

/// Failure of a social engine command.
///
/// `Validation`, `NotFound`, `Forbidden` and `Conflict` are decided before (or
/// instead of) a mutating statement. `Store` and `Pool` come from the
/// substrate; the transaction has already been rolled back when they surface.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not allowed to modify this {0}")]
    Forbidden(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("SQL error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl SocialError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// True for failures of the store itself rather than of the command.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Pool(_))
    }
}

pub type SocialResult<T> = Result<T, SocialError>;

/// True when `err` is SQLite rejecting a UNIQUE or PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// Reject non-positive identifiers before touching the store.
pub(crate) fn require_id(id: i64, what: &str) -> SocialResult<()> {
    if id <= 0 {
        return Err(SocialError::validation(format!("{what} id must be positive")));
    }
    Ok(())
}
