//! The payload of a registry transaction.
//!
//! ```text
//! owner (32) ‖ identity digest (32) ‖ DocumentSpec record
//! ```
//!
//! The spec record is self-delimiting and starts at offset 64.

use docreg_core::{DocumentSpec, Sha256Digest, UserId, ValidationError, ID_LENGTH};

/// Offset of the spec record inside the payload.
pub const SPEC_OFFSET: usize = ID_LENGTH + Sha256Digest::LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRecord {
    pub owner: UserId,
    pub digest: Sha256Digest,
    pub spec: DocumentSpec,
}

impl RegistryRecord {
    pub fn new(owner: UserId, digest: Sha256Digest, spec: DocumentSpec) -> Self {
        Self { owner, digest, spec }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let spec = self.spec.serialize();
        let mut out = Vec::with_capacity(SPEC_OFFSET + spec.len());
        out.extend_from_slice(self.owner.as_bytes());
        out.extend_from_slice(self.digest.as_bytes());
        out.extend_from_slice(&spec);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.len() < SPEC_OFFSET {
            return Err(ValidationError::Malformed(format!(
                "registry record of {} bytes is shorter than {SPEC_OFFSET}",
                bytes.len()
            )));
        }
        let mut owner = [0u8; ID_LENGTH];
        owner.copy_from_slice(&bytes[..ID_LENGTH]);
        let mut digest = [0u8; Sha256Digest::LEN];
        digest.copy_from_slice(&bytes[ID_LENGTH..SPEC_OFFSET]);

        let (end, spec) = DocumentSpec::from_serialized_data(SPEC_OFFSET, bytes)?;
        if end != bytes.len() {
            return Err(ValidationError::Malformed(format!(
                "{} trailing bytes after registry record",
                bytes.len() - end
            )));
        }

        Ok(Self {
            owner: UserId::from_bytes(owner),
            digest: Sha256Digest::from_bytes(digest),
            spec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let record = RegistryRecord::new(
            UserId::from_bytes([0x11; 32]),
            Sha256Digest::from_bytes([0x22; 32]),
            DocumentSpec::default(),
        );
        let bytes = record.to_bytes();
        assert_eq!(&bytes[..32], &[0x11; 32]);
        assert_eq!(&bytes[32..64], &[0x22; 32]);
        assert_eq!(&bytes[64..], &[0xa3, 0x00, 0xf6, 0x01, 0x00, 0x02, 0xf5]);
        assert_eq!(RegistryRecord::from_bytes(&bytes).unwrap(), record);
    }

    #[test]
    fn test_rejects_short_and_trailing() {
        assert!(matches!(
            RegistryRecord::from_bytes(&[0u8; 63]),
            Err(ValidationError::Malformed(_))
        ));
        let mut bytes = RegistryRecord::new(
            UserId::derive("owner"),
            Sha256Digest::hash(b"doc"),
            DocumentSpec::default(),
        )
        .to_bytes();
        bytes.push(0);
        assert!(matches!(
            RegistryRecord::from_bytes(&bytes),
            Err(ValidationError::Malformed(_))
        ));
    }
}
