//! Signed document envelope.
//!
//! When a document root carries `sig`, its file bytes become
//!
//! ```text
//! SHA-256(unsigned file) ‖ public key ‖ key type (u16 LE) ‖ signature
//! ```
//!
//! This layer checks structure only. Whether the signature is valid is up
//! to whoever consumes the envelope.

use std::fmt;
use std::str::FromStr;

use crate::crypto::Sha256Digest;
use crate::error::DocumentError;
use crate::section::Attributes;

/// Root attribute holding the hex signature.
pub const SIG_ATTRIBUTE: &str = "sig";
/// Root attribute holding the hex public key.
pub const PUBKEY_ATTRIBUTE: &str = "pubkey";
/// Root attribute naming the signature algorithm.
pub const ALGO_ATTRIBUTE: &str = "algo";

/// Signature algorithms with their wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum KeyType {
    EcdsaSecp256k1 = 1,
    #[default]
    EcdsaP256v1 = 2,
    Ed25519 = 3,
}

impl KeyType {
    pub const ALL: [KeyType; 3] = [KeyType::EcdsaSecp256k1, KeyType::EcdsaP256v1, KeyType::Ed25519];

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::EcdsaSecp256k1),
            2 => Some(Self::EcdsaP256v1),
            3 => Some(Self::Ed25519),
            _ => None,
        }
    }

    /// Name used in the `algo` attribute.
    pub fn name(self) -> &'static str {
        match self {
            Self::EcdsaSecp256k1 => "ecdsa-secp256k1",
            Self::EcdsaP256v1 => "ecdsa-p256v1",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl FromStr for KeyType {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kt| kt.name() == s)
            .ok_or_else(|| DocumentError::UnknownAlgorithm(s.to_string()))
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The assembled signed layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub digest: Sha256Digest,
    pub public_key: Vec<u8>,
    pub key_type: KeyType,
    pub signature: Vec<u8>,
}

impl SignedEnvelope {
    /// Build an envelope from root attributes.
    ///
    /// Returns `Ok(None)` when the root is unsigned.
    pub fn from_attributes(
        digest: Sha256Digest,
        attributes: &Attributes,
    ) -> Result<Option<Self>, DocumentError> {
        let Some(sig_hex) = attributes.get(SIG_ATTRIBUTE) else {
            return Ok(None);
        };
        let pubkey_hex = attributes.get(PUBKEY_ATTRIBUTE).ok_or_else(|| {
            DocumentError::Structural("signature present without public key".into())
        })?;
        let key_type = match attributes.get(ALGO_ATTRIBUTE) {
            Some(name) => name.parse()?,
            None => KeyType::default(),
        };
        let signature = hex::decode(sig_hex)
            .map_err(|e| DocumentError::Structural(format!("signature is not hex: {e}")))?;
        let public_key = hex::decode(pubkey_hex)
            .map_err(|e| DocumentError::Structural(format!("public key is not hex: {e}")))?;

        Ok(Some(Self {
            digest,
            public_key,
            key_type,
            signature,
        }))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(Sha256Digest::LEN + self.public_key.len() + 2 + self.signature.len());
        out.extend_from_slice(self.digest.as_bytes());
        out.extend_from_slice(&self.public_key);
        out.extend_from_slice(&self.key_type.code().to_le_bytes());
        out.extend_from_slice(&self.signature);
        out
    }

    /// Split envelope bytes back into parts.
    ///
    /// The public key length depends on the key encoding, so the caller
    /// supplies it. Everything after the algorithm code is the signature.
    pub fn parse(bytes: &[u8], public_key_len: usize) -> Result<Self, DocumentError> {
        let too_short = || {
            DocumentError::Structural(format!(
                "envelope of {} bytes too short for a {public_key_len}-byte key",
                bytes.len()
            ))
        };
        let code_at = Sha256Digest::LEN
            .checked_add(public_key_len)
            .ok_or_else(too_short)?;
        let sig_at = code_at.checked_add(2).ok_or_else(too_short)?;
        if bytes.len() <= sig_at {
            return Err(too_short());
        }

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes[..Sha256Digest::LEN]);
        let code = u16::from_le_bytes([bytes[code_at], bytes[code_at + 1]]);
        let key_type = KeyType::from_code(code)
            .ok_or_else(|| DocumentError::UnknownAlgorithm(format!("code {code}")))?;

        Ok(Self {
            digest: Sha256Digest::from_bytes(digest),
            public_key: bytes[Sha256Digest::LEN..code_at].to_vec(),
            key_type,
            signature: bytes[sig_at..].to_vec(),
        })
    }
}
