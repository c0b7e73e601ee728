//! Registry configuration.

use docreg_core::UserId;

/// Configuration for a [`Registry`](crate::Registry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// The registry authority. Co-signs every update.
    pub registry_id: UserId,
    /// Whether the authority's key may sign a registration on an owner's
    /// behalf.
    pub authority_may_register: bool,
}

impl RegistryConfig {
    pub fn new(registry_id: UserId) -> Self {
        Self {
            registry_id,
            authority_may_register: true,
        }
    }
}
