//! Transaction labels.
//!
//! A label is an opaque (group, label) pair stored in a transaction body so
//! applications can find their transactions later. The registry only embeds
//! labels; reading them back happens here.

use docreg_core::{LabelGroupId, LabelId, Sha256Digest};

use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionLabel {
    group_id: LabelGroupId,
    label_id: LabelId,
}

impl TransactionLabel {
    pub fn new(group_id: LabelGroupId, label_id: LabelId) -> Self {
        Self { group_id, label_id }
    }

    /// A label whose id is regenerated from `name` and `salt`.
    pub fn named(group_id: LabelGroupId, name: &str, salt: &[u8]) -> Self {
        Self::new(group_id, Self::create_label_id(name, salt))
    }

    /// Deterministic label id: SHA-256 over the length-prefixed name and salt.
    pub fn create_label_id(name: &str, salt: &[u8]) -> LabelId {
        let name_len = (name.len() as u32).to_be_bytes();
        let salt_len = (salt.len() as u32).to_be_bytes();
        let digest = Sha256Digest::hash_concat([
            name_len.as_slice(),
            name.as_bytes(),
            salt_len.as_slice(),
            salt,
        ]);
        LabelId::from_bytes(digest.0)
    }

    pub fn group_id(&self) -> &LabelGroupId {
        &self.group_id
    }

    pub fn label_id(&self) -> &LabelId {
        &self.label_id
    }

    /// Whether `tx` carries a label in this label's group.
    pub fn is_labeled(&self, tx: &Transaction) -> bool {
        tx.labels.iter().any(|l| l.group_id == self.group_id)
    }

    /// The label id `tx` carries in this label's group.
    pub fn get_label_id(&self, tx: &Transaction) -> Option<LabelId> {
        tx.labels
            .iter()
            .find(|l| l.group_id == self.group_id)
            .map(|l| l.label_id)
    }
}
