use karmafeed_ledger::LedgerError;

/// Unique constraint on `(user_id, target)` in the likes table.
pub const LIKES_USER_TARGET_UNIQUE: &str = "likes_user_target_key";

/// Unique constraint on usernames.
pub const USERS_USERNAME_UNIQUE: &str = "users_username_key";

/// Check constraint: a reply's parent is a comment on the same post.
pub const COMMENTS_PARENT_SAME_POST: &str = "comments_parent_same_post";

/// Errors from feed store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A write would duplicate a unique key.
    #[error("unique constraint {constraint} violated: {detail}")]
    UniqueViolation {
        constraint: &'static str,
        detail: String,
    },

    /// A write references a row that does not exist.
    #[error("foreign key {constraint} violated: {detail}")]
    ForeignKeyViolation {
        constraint: &'static str,
        detail: String,
    },

    /// A write breaks a row-level check.
    #[error("check constraint {constraint} violated: {detail}")]
    CheckViolation {
        constraint: &'static str,
        detail: String,
    },

    /// The table has handed out its largest possible id.
    #[error("{table} ids exhausted after {last}")]
    IdsExhausted { table: &'static str, last: String },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("unsupported snapshot version {0}")]
    UnsupportedSnapshot(u32),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns the violated constraint name, if this is a constraint error.
    pub fn constraint(&self) -> Option<&'static str> {
        match self {
            StoreError::UniqueViolation { constraint, .. }
            | StoreError::ForeignKeyViolation { constraint, .. }
            | StoreError::CheckViolation { constraint, .. } => Some(constraint),
            _ => None,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
