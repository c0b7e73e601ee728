//! Registry transactions.
//!
//! A transaction records one registration or update of a document. Its body
//! (header, labels, payload) is encoded canonically; every signature covers
//! the same body, and the transaction id is the Blake3 hash of it. Adding a
//! signature therefore never changes the id.

use bytes::Bytes;
use ciborium::value::Value;

use docreg_core::{
    encode_canonical, Blake3Hash, CoreError, DocumentId, Ed25519PublicKey, Ed25519Signature,
    Keypair, TransactionId, UserId,
};

use crate::label::TransactionLabel;

/// The current transaction schema version.
pub const TRANSACTION_VERSION: u8 = 0;

/// CBOR map keys of the canonical body.
mod keys {
    pub const VERSION: u64 = 0;
    pub const KIND: u64 = 1;
    pub const DOCUMENT_ID: u64 = 2;
    pub const TIMESTAMP: u64 = 3;
    pub const PREV: u64 = 4;
    pub const PAYLOAD_HASH: u64 = 5;
    pub const LABELS: u64 = 6;
}

/// What a transaction does to its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TransactionKind {
    /// First transaction of a document. Has no `prev`.
    Register = 0x0001,
    /// Later transaction. `prev` is the head it extends.
    Update = 0x0002,
}

impl TransactionKind {
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Register),
            0x0002 => Some(Self::Update),
            _ => None,
        }
    }
}

/// Transaction metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHeader {
    /// Schema version (currently 0).
    pub version: u8,

    pub kind: TransactionKind,

    pub document_id: DocumentId,

    /// Submitter-claimed time (Unix milliseconds).
    pub timestamp: i64,

    /// Head this transaction extends (None for Register).
    pub prev: Option<TransactionId>,

    /// Blake3 hash of the payload bytes.
    pub payload_hash: Blake3Hash,
}

/// One signer's endorsement of a transaction body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSignature {
    pub signer: UserId,
    pub public_key: Ed25519PublicKey,
    pub signature: Ed25519Signature,
}

/// A complete transaction: header, labels, payload, signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub header: TransactionHeader,
    pub labels: Vec<TransactionLabel>,
    pub payload: Bytes,
    pub signatures: Vec<TransactionSignature>,
}

impl Transaction {
    /// The bytes every signer signs: canonical body followed by the payload.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut message = encode_canonical(&body_to_cbor_value(&self.header, &self.labels));
        message.extend_from_slice(&self.payload);
        message
    }

    /// Blake3 of [`Transaction::signing_bytes`].
    pub fn compute_id(&self) -> TransactionId {
        TransactionId::from_bytes(Blake3Hash::hash(&self.signing_bytes()).0)
    }

    /// Append a signature by `signer` over the body.
    pub fn sign(&mut self, signer: UserId, keypair: &Keypair) {
        let signature = keypair.sign(&self.signing_bytes());
        self.signatures.push(TransactionSignature {
            signer,
            public_key: keypair.public_key(),
            signature,
        });
    }

    /// Builder-style [`Transaction::sign`].
    pub fn signed_by(mut self, signer: UserId, keypair: &Keypair) -> Self {
        self.sign(signer, keypair);
        self
    }

    /// Check every signature against the body.
    pub fn verify_signatures(&self) -> Result<(), CoreError> {
        let message = self.signing_bytes();
        for sig in &self.signatures {
            sig.public_key.verify(&message, &sig.signature)?;
        }
        Ok(())
    }

    pub fn payload_matches_hash(&self) -> bool {
        Blake3Hash::hash(&self.payload) == self.header.payload_hash
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.header.document_id
    }

    pub fn kind(&self) -> TransactionKind {
        self.header.kind
    }

    pub fn prev(&self) -> Option<TransactionId> {
        self.header.prev
    }

    pub fn timestamp(&self) -> i64 {
        self.header.timestamp
    }

    pub fn signers(&self) -> impl Iterator<Item = &UserId> {
        self.signatures.iter().map(|s| &s.signer)
    }

    pub fn signature_for(&self, signer: &UserId) -> Option<&TransactionSignature> {
        self.signatures.iter().find(|s| &s.signer == signer)
    }
}

/// Builder for unsigned transactions.
pub struct TransactionBuilder {
    kind: TransactionKind,
    document_id: DocumentId,
    timestamp: i64,
    prev: Option<TransactionId>,
    labels: Vec<TransactionLabel>,
    payload: Bytes,
}

impl TransactionBuilder {
    pub fn new(kind: TransactionKind, document_id: DocumentId) -> Self {
        Self {
            kind,
            document_id,
            timestamp: 0,
            prev: None,
            labels: Vec::new(),
            payload: Bytes::new(),
        }
    }

    pub fn register(document_id: DocumentId) -> Self {
        Self::new(TransactionKind::Register, document_id)
    }

    pub fn update(document_id: DocumentId, prev: TransactionId) -> Self {
        Self::new(TransactionKind::Update, document_id).prev(prev)
    }

    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    pub fn prev(mut self, prev: TransactionId) -> Self {
        self.prev = Some(prev);
        self
    }

    pub fn label(mut self, label: TransactionLabel) -> Self {
        self.labels.push(label);
        self
    }

    pub fn payload(mut self, p: impl Into<Bytes>) -> Self {
        self.payload = p.into();
        self
    }

    /// Finish without signatures. Sign with [`Transaction::sign`].
    pub fn build(self) -> Transaction {
        let payload_hash = Blake3Hash::hash(&self.payload);
        Transaction {
            header: TransactionHeader {
                version: TRANSACTION_VERSION,
                kind: self.kind,
                document_id: self.document_id,
                timestamp: self.timestamp,
                prev: self.prev,
                payload_hash,
            },
            labels: self.labels,
            payload: self.payload,
            signatures: Vec::new(),
        }
    }
}

fn body_to_cbor_value(header: &TransactionHeader, labels: &[TransactionLabel]) -> Value {
    let prev = match &header.prev {
        Some(id) => Value::Bytes(id.as_bytes().to_vec()),
        None => Value::Null,
    };
    let labels = labels
        .iter()
        .map(|l| {
            Value::Array(vec![
                Value::Bytes(l.group_id().as_bytes().to_vec()),
                Value::Bytes(l.label_id().as_bytes().to_vec()),
            ])
        })
        .collect();

    Value::Map(vec![
        (Value::Integer(keys::VERSION.into()), Value::Integer(header.version.into())),
        (Value::Integer(keys::KIND.into()), Value::Integer(header.kind.to_u16().into())),
        (
            Value::Integer(keys::DOCUMENT_ID.into()),
            Value::Bytes(header.document_id.as_bytes().to_vec()),
        ),
        (Value::Integer(keys::TIMESTAMP.into()), Value::Integer(header.timestamp.into())),
        (Value::Integer(keys::PREV.into()), prev),
        (
            Value::Integer(keys::PAYLOAD_HASH.into()),
            Value::Bytes(header.payload_hash.as_bytes().to_vec()),
        ),
        (Value::Integer(keys::LABELS.into()), Value::Array(labels)),
    ])
}
