//! Level progress persistence across battle round trips.
//!
//! The store keeps a single [`LevelSnapshot`] for the level that is currently
//! active. Entering a battle overwrites it with the parasite's progress,
//! settling the battle folds the reward into it, and reloading the level reads
//! it back out. Nothing here survives the process.

use std::{collections::BTreeSet, time::Duration};

use log::{debug, info, warn};
use parasite_lost_core::{BattleTarget, HostId, HostSize, LevelId, Position, RejectionReason};

use crate::hosts::HostEntity;

/// Lifespan rewards granted for possessing a host of each size class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeBonuses {
    /// Reward for a small host.
    pub small: Duration,
    /// Reward for a medium host.
    pub medium: Duration,
    /// Reward for a large host.
    pub large: Duration,
}

impl SizeBonuses {
    /// Reward granted for possessing a host of the provided size.
    #[must_use]
    pub const fn for_size(&self, size: HostSize) -> Duration {
        match size {
            HostSize::Small => self.small,
            HostSize::Medium => self.medium,
            HostSize::Large => self.large,
        }
    }
}

impl Default for SizeBonuses {
    fn default() -> Self {
        Self {
            small: Duration::from_secs(5),
            medium: Duration::from_secs(10),
            large: Duration::from_secs(20),
        }
    }
}

/// Progress of the parasite captured when saving a level.
#[derive(Clone, Debug, PartialEq)]
pub struct Progress {
    /// Level the parasite is in.
    pub level: LevelId,
    /// Location of the parasite.
    pub position: Position,
    /// Remaining lifespan of the parasite.
    pub lifespan: Duration,
    /// Time spent in the level since the previous save.
    pub elapsed: Duration,
}

/// Saved progress for the active level.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelSnapshot {
    /// Level the snapshot belongs to.
    pub level: LevelId,
    /// Location of the parasite when the snapshot was taken.
    pub position: Position,
    /// Remaining lifespan, including any battle reward.
    pub lifespan: Duration,
    /// Hosts that were possessed in this level.
    pub interacted: BTreeSet<HostId>,
    /// Total time spent in the level across saves.
    pub elapsed: Duration,
}

/// Result of settling a battle.
#[derive(Clone, Debug, PartialEq)]
pub struct BattleSettlement {
    /// Battle that was settled.
    pub target: BattleTarget,
    /// Lifespan reward, present only for a won battle.
    pub bonus: Option<Duration>,
    /// Level the parasite returns to.
    pub return_to: Option<LevelId>,
}

/// Progress read back from the store after a level reload.
#[derive(Clone, Debug, PartialEq)]
pub struct RestoredState {
    /// Level the progress belongs to.
    pub level: LevelId,
    /// Location to place the parasite at.
    pub position: Position,
    /// Lifespan to give the parasite.
    pub lifespan: Duration,
}

#[derive(Clone, Copy, Debug)]
struct Cooldown {
    host: HostId,
    remaining: Duration,
}

/// Owner of the single active [`LevelSnapshot`] and the battle-in-progress flag.
#[derive(Debug)]
pub struct LevelStateStore {
    bonuses: SizeBonuses,
    cooldown_duration: Duration,
    snapshot: Option<LevelSnapshot>,
    battle: Option<BattleTarget>,
    last_battle_host: Option<HostId>,
    cooldown: Option<Cooldown>,
}

impl LevelStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(bonuses: SizeBonuses, cooldown_duration: Duration) -> Self {
        Self {
            bonuses,
            cooldown_duration,
            snapshot: None,
            battle: None,
            last_battle_host: None,
            cooldown: None,
        }
    }

    /// Overwrites the snapshot with the provided progress.
    ///
    /// Saving the same level again keeps its possessed hosts and accumulates
    /// the elapsed time; saving a different level starts a fresh snapshot.
    pub fn save(&mut self, progress: Progress) {
        match self.snapshot.as_mut() {
            Some(snapshot) if snapshot.level == progress.level => {
                snapshot.position = progress.position;
                snapshot.lifespan = progress.lifespan;
                snapshot.elapsed = snapshot.elapsed.saturating_add(progress.elapsed);
            }
            _ => {
                self.snapshot = Some(LevelSnapshot {
                    level: progress.level,
                    position: progress.position,
                    lifespan: progress.lifespan,
                    interacted: BTreeSet::new(),
                    elapsed: progress.elapsed,
                });
            }
        }
    }

    /// Saves progress and records the host that is about to be fought.
    ///
    /// Rejected without touching the snapshot while another battle is in
    /// progress.
    pub fn begin_battle(
        &mut self,
        host: &HostEntity,
        progress: Progress,
    ) -> Result<BattleTarget, RejectionReason> {
        if let Some(current) = self.battle {
            warn!(
                "battle against host {} requested while fighting host {}",
                host.id(),
                current.host()
            );
            return Err(RejectionReason::AlreadyInBattle);
        }

        self.save(progress);
        let target = BattleTarget::new(host.id(), host.size());
        self.battle = Some(target);
        info!("battle started against {:?} host {}", host.size(), host.id());
        Ok(target)
    }

    /// Settles the battle in progress.
    ///
    /// A win adds the size reward to the stored lifespan and marks the host as
    /// possessed. The battle flag is cleared either way.
    pub fn end_battle(&mut self, won: bool) -> Result<BattleSettlement, RejectionReason> {
        let Some(target) = self.battle.take() else {
            warn!("battle end reported while no battle is in progress");
            return Err(RejectionReason::NotInBattle);
        };

        let mut bonus = None;
        if won {
            let amount = self.bonuses.for_size(target.size());
            if let Some(snapshot) = self.snapshot.as_mut() {
                snapshot.lifespan = snapshot.lifespan.saturating_add(amount);
                bonus = Some(amount);
            } else {
                warn!("battle won without a saved level; lifespan reward dropped");
            }
            self.mark_interacted(target.host());
        }

        self.last_battle_host = Some(target.host());
        let return_to = self.snapshot.as_ref().map(|snapshot| snapshot.level.clone());
        info!("battle against host {} ended, won: {won}", target.host());

        Ok(BattleSettlement {
            target,
            bonus,
            return_to,
        })
    }

    /// Reads the snapshot back after a reload.
    ///
    /// Hosts listed as possessed are made non-interactable again and the host
    /// fought last is put on cooldown so the restored parasite does not
    /// immediately retrigger the battle it just left.
    pub fn restore(&mut self, hosts: &mut [HostEntity]) -> Option<RestoredState> {
        let Some(snapshot) = self.snapshot.as_ref() else {
            debug!("restore requested without a saved level");
            return None;
        };

        for host in hosts.iter_mut() {
            if snapshot.interacted.contains(&host.id()) && host.disable_interaction() {
                debug!("host {} restored as possessed", host.id());
            }
        }

        self.cooldown = self.last_battle_host.map(|host| Cooldown {
            host,
            remaining: self.cooldown_duration,
        });

        Some(RestoredState {
            level: snapshot.level.clone(),
            position: snapshot.position,
            lifespan: snapshot.lifespan,
        })
    }

    /// Records a host as possessed. Adding a host twice has no further effect.
    pub fn mark_interacted(&mut self, host: HostId) {
        match self.snapshot.as_mut() {
            Some(snapshot) => {
                if snapshot.interacted.insert(host) {
                    debug!("host {host} marked as possessed");
                }
            }
            None => warn!("cannot mark host {host} as possessed without a saved level"),
        }
    }

    /// Reports whether the host was possessed in the saved level.
    #[must_use]
    pub fn has_interacted(&self, host: HostId) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.interacted.contains(&host))
    }

    /// Runs the restore cooldown gate.
    pub fn advance(&mut self, dt: Duration) {
        if let Some(cooldown) = self.cooldown.as_mut() {
            cooldown.remaining = cooldown.remaining.saturating_sub(dt);
            if cooldown.remaining.is_zero() {
                self.cooldown = None;
            }
        }
    }

    /// Reports whether battles against the host are suppressed.
    #[must_use]
    pub fn is_on_cooldown(&self, host: HostId) -> bool {
        self.cooldown.is_some_and(|cooldown| cooldown.host == host)
    }

    /// Clears the snapshot and any battle state.
    pub fn reset(&mut self) {
        self.snapshot = None;
        self.battle = None;
        self.last_battle_host = None;
        self.cooldown = None;
    }

    /// Reports whether a battle is in progress.
    #[must_use]
    pub fn in_battle(&self) -> bool {
        self.battle.is_some()
    }

    /// Battle in progress, if any.
    #[must_use]
    pub fn battle_target(&self) -> Option<BattleTarget> {
        self.battle
    }

    /// Saved progress, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<&LevelSnapshot> {
        self.snapshot.as_ref()
    }
}
