// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prefixed random identifiers.
//!
//! Run ids are UUIDv7 ([`crate::run::RunId`]); the substrate-internal
//! entities (queue jobs, workers) get a short prefixed nanoid so log lines
//! and Redis keys are self-describing.

/// Random suffix length for generated ids.
pub const ID_SUFFIX_LEN: usize = 19;

/// Define a prefixed-id newtype over `String`.
///
/// Generates `new()` (random suffix), `from_string()`, `as_str()`, plus
/// `Display`, `Default`, `From<&str>`, `From<String>`, `AsRef<str>`, and
/// transparent serde. The prefix is four characters so every generated id
/// is `4 + 19` bytes.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct QueueJobId("qj--");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new random id with the type prefix.
            pub fn new() -> Self {
                Self(format!("{}{}", Self::PREFIX, nanoid::nanoid!(($crate::id::ID_SUFFIX_LEN))))
            }

            /// Wrap an existing id (parsing, wire decoding).
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
