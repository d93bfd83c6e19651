use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw row number.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw row number.
            pub const fn get(self) -> u64 {
                self.0
            }

            /// The id following this one in its table, or `None` once the
            /// id space is used up.
            pub const fn next(self) -> Option<Self> {
                match self.0.checked_add(1) {
                    Some(raw) => Some(Self(raw)),
                    None => None,
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            /// Accepts both the bare number and the prefixed display form.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.strip_prefix($prefix).unwrap_or(s);
                digits
                    .parse::<u64>()
                    .ok()
                    .filter(|raw| *raw > 0)
                    .map(Self)
                    .ok_or_else(|| TypeError::InvalidId {
                        kind: $kind,
                        input: s.to_string(),
                    })
            }
        }
    };
}

row_id!(
    /// Identifier of a user. Users are owned by the external auth collaborator;
    /// the feed only holds them by id.
    UserId, "u:", "user"
);
row_id!(
    /// Identifier of a post.
    PostId, "p:", "post"
);
row_id!(
    /// Identifier of a comment. Comment ids grow with creation order, so a
    /// parent always has a smaller id than its replies.
    CommentId, "c:", "comment"
);
row_id!(
    /// Identifier of a like row.
    LikeId, "l:", "like"
);
row_id!(
    /// Identifier of a karma ledger entry.
    TransactionId, "k:", "transaction"
);
