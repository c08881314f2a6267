//! Possessable hosts bound from the live level.

use parasite_lost_core::{HostId, HostSize, HostSpawn};

/// Possessable creature present in the live level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostEntity {
    id: HostId,
    size: HostSize,
    interactable: bool,
}

impl HostEntity {
    /// Binds a host reported by the scene loader. New hosts are interactable.
    #[must_use]
    pub const fn from_spawn(spawn: HostSpawn) -> Self {
        Self {
            id: spawn.id,
            size: spawn.size,
            interactable: true,
        }
    }

    /// Identifier of the host.
    #[must_use]
    pub const fn id(&self) -> HostId {
        self.id
    }

    /// Size class of the host.
    #[must_use]
    pub const fn size(&self) -> HostSize {
        self.size
    }

    /// Whether touching the host can start a battle.
    #[must_use]
    pub const fn is_interactable(&self) -> bool {
        self.interactable
    }

    /// Stops the host from starting battles. Returns whether it was interactable.
    pub(crate) fn disable_interaction(&mut self) -> bool {
        let was_interactable = self.interactable;
        self.interactable = false;
        was_interactable
    }
}
