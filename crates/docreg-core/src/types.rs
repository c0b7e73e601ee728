//! Strong identifier types for the document registry.
//!
//! All identifiers are 32-byte newtypes so a user id can never be passed
//! where a document id is expected.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Length in bytes of every registry identifier.
pub const ID_LENGTH: usize = 32;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; ID_LENGTH]);

        impl $name {
            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; ID_LENGTH]) -> Self {
                Self(bytes)
            }

            /// Derive an identifier deterministically from a seed string.
            pub fn derive(seed: &str) -> Self {
                Self(Sha256::digest(seed.as_bytes()).into())
            }

            /// Generate a random identifier.
            pub fn random() -> Self {
                Self(rand::random())
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; ID_LENGTH] {
                &self.0
            }

            /// Convert to hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from hex string.
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let bytes = hex::decode(s)?;
                Self::try_from(bytes.as_slice())
                    .map_err(|_| hex::FromHexError::InvalidStringLength)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", &self.to_hex()[..16])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; ID_LENGTH]> for $name {
            fn from(bytes: [u8; ID_LENGTH]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; ID_LENGTH] = slice.try_into()?;
                Ok(Self(arr))
            }
        }
    };
}

define_id!(
    /// Identifier of a registered document.
    DocumentId
);

define_id!(
    /// Identifier of a user in the identity directory.
    UserId
);

define_id!(
    /// Content address of a ledger transaction, computed as Blake3 of its body.
    TransactionId
);

define_id!(
    /// Identifier grouping related transaction labels.
    LabelGroupId
);

define_id!(
    /// Identifier of a single transaction label within its group.
    LabelId
);
