//! Strongly typed identifiers
//!
//! Newtype wrappers around UUIDs for every syncable entity. The newtype
//! pattern prevents passing a `CustomerId` where a `BookId` is expected.
//!
//! # Example
//!
//! ```
//! use tomo_core::{BookId, TermId};
//!
//! let book = BookId::new();
//! let term = TermId::new();
//!
//! fn requires_book(id: BookId) -> String {
//!     id.to_string()
//! }
//!
//! let result = requires_book(book);
//! // requires_book(term); // This would not compile!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Error type for ID parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The underlying UUID parse error message.
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define a strongly-typed ID type.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random ID using UUID v4.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns a reference to the underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Consumes the ID and returns the underlying UUID.
            #[must_use]
            pub fn into_uuid(self) -> Uuid {
                self.0
            }

            /// Returns the hyphen-free lowercase hex form.
            ///
            /// This is the stable, rename-proof identity used as the slug
            /// source on the external platform.
            #[must_use]
            pub fn as_simple(&self) -> String {
                self.0.simple().to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self).map_err(|e| ParseIdError {
                    id_type: stringify!($name),
                    message: e.to_string(),
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier for a book (product) in the internal catalog.
    BookId
);

define_id!(
    /// Identifier for a customer.
    CustomerId
);

define_id!(
    /// Identifier for an order.
    OrderId
);

define_id!(
    /// Identifier for a coupon.
    CouponId
);

define_id!(
    /// Identifier for a taxonomy term (author, publisher, imprint, ...).
    TermId
);

define_id!(
    /// Identifier for a person record.
    PersonId
);
