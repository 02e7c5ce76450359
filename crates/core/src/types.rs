use serde::{Deserialize, Serialize};
use std::fmt;

use crate::digest::random_token;

macro_rules! newtype_token {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a fresh identifier from 128 random bits, hex-encoded.
            #[must_use]
            pub fn random() -> Self {
                Self(random_token())
            }

            /// Return the inner string as a str slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_token!(ObjectId, "Identifier of one stored object, also its base storage key.");
newtype_token!(JobId, "Identifier of a job, unique for the lifetime of one queue.");

impl ObjectId {
    /// Storage key of the chunk at `index` (`"<id>-<index>"`).
    #[must_use]
    pub fn chunk_key(&self, index: usize) -> String {
        format!("{}-{index}", self.0)
    }
}
