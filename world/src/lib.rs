#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game state for Parasite Lost.
//!
//! The [`World`] is the game state machine: it owns the current
//! [`GameMode`], the parasite, the hosts of the live level and the
//! [`LevelStateStore`]. Every mutation goes through [`apply`], which either
//! performs a documented transition or rejects the command with
//! [`Event::CommandRejected`] and leaves state untouched.

mod hosts;
mod level_state;
mod levels;

use std::time::Duration;

use log::{debug, info, warn};
use parasite_lost_core::{
    Command, Event, GameMode, HostId, HostSpawn, LevelId, Position, RejectionReason,
    WELCOME_BANNER,
};

pub use hosts::HostEntity;
pub use level_state::{
    BattleSettlement, LevelSnapshot, LevelStateStore, Progress, RestoredState, SizeBonuses,
};
pub use levels::{infer_next_level, LevelCatalog};

const DEFAULT_BASE_LIFESPAN: Duration = Duration::from_secs(10);
const DEFAULT_RESTORE_COOLDOWN: Duration = Duration::from_millis(1_500);

/// Configuration parameters required to construct the world.
#[derive(Clone, Debug)]
pub struct Config {
    base_lifespan: Duration,
    bonuses: SizeBonuses,
    restore_cooldown: Duration,
    catalog: LevelCatalog,
}

impl Config {
    /// Creates a configuration with the provided lifespan rules and no level catalog.
    #[must_use]
    pub fn new(base_lifespan: Duration, bonuses: SizeBonuses, restore_cooldown: Duration) -> Self {
        Self {
            base_lifespan,
            bonuses,
            restore_cooldown,
            catalog: LevelCatalog::default(),
        }
    }

    /// Restricts level loads to the provided catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: LevelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Lifespan the parasite starts every level with.
    #[must_use]
    pub const fn base_lifespan(&self) -> Duration {
        self.base_lifespan
    }

    /// Lifespan rewards per host size.
    #[must_use]
    pub const fn bonuses(&self) -> SizeBonuses {
        self.bonuses
    }

    /// Time a restored host stays unable to retrigger its battle.
    #[must_use]
    pub const fn restore_cooldown(&self) -> Duration {
        self.restore_cooldown
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_BASE_LIFESPAN,
            SizeBonuses::default(),
            DEFAULT_RESTORE_COOLDOWN,
        )
    }
}

#[derive(Clone, Copy, Debug)]
struct Parasite {
    position: Position,
    lifespan: Duration,
    expired: bool,
}

impl Parasite {
    fn new(lifespan: Duration) -> Self {
        Self {
            position: Position::ORIGIN,
            lifespan,
            expired: false,
        }
    }

    fn reset(&mut self, lifespan: Duration) {
        self.lifespan = lifespan;
        self.expired = false;
    }
}

/// Represents the authoritative Parasite Lost game state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: Config,
    mode: GameMode,
    paused_from: Option<GameMode>,
    parasite: Parasite,
    level: Option<LevelId>,
    awaiting_level: Option<LevelId>,
    hosts: Vec<HostEntity>,
    store: LevelStateStore,
    unsaved_elapsed: Duration,
}

impl World {
    /// Creates a world sitting in the main menu with default rules.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a world sitting in the main menu with the provided rules.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            banner: WELCOME_BANNER,
            parasite: Parasite::new(config.base_lifespan),
            store: LevelStateStore::new(config.bonuses, config.restore_cooldown),
            config,
            mode: GameMode::MainMenu,
            paused_from: None,
            level: None,
            awaiting_level: None,
            hosts: Vec::new(),
            unsaved_elapsed: Duration::ZERO,
        }
    }

    fn set_mode(&mut self, to: GameMode, out_events: &mut Vec<Event>) {
        let from = self.mode;
        if from == to {
            return;
        }
        self.mode = to;
        debug!("game mode {from:?} -> {to:?}");
        out_events.push(Event::GameModeChanged { from, to });
    }

    fn request_level(&mut self, level: LevelId, out_events: &mut Vec<Event>) {
        info!("requesting level {level}");
        self.awaiting_level = Some(level.clone());
        out_events.push(Event::LevelRequested { level });
    }

    fn host_mut(&mut self, host: HostId) -> Option<&mut HostEntity> {
        self.hosts.iter_mut().find(|entity| entity.id() == host)
    }

    fn progress(&self, level: LevelId) -> Progress {
        Progress {
            level,
            position: self.parasite.position,
            lifespan: self.parasite.lifespan,
            elapsed: self.unsaved_elapsed,
        }
    }

    fn start_game(&mut self, out_events: &mut Vec<Event>) {
        match self.mode {
            GameMode::Playing => debug!("start requested while already playing"),
            GameMode::MainMenu | GameMode::GameOver => {
                self.parasite.reset(self.config.base_lifespan);
                self.set_mode(GameMode::Playing, out_events);
                if self.level.is_none() {
                    if let Some(first) = self.config.catalog.first().cloned() {
                        self.request_level(first, out_events);
                    }
                }
            }
            mode => reject(RejectionReason::InvalidMode { mode }, out_events),
        }
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        match self.mode {
            GameMode::Battle => out_events.push(Event::TimeAdvanced { dt }),
            GameMode::Playing => {
                out_events.push(Event::TimeAdvanced { dt });
                self.store.advance(dt);
                self.unsaved_elapsed = self.unsaved_elapsed.saturating_add(dt);
                if self.awaiting_level.is_none() {
                    self.parasite.lifespan = self.parasite.lifespan.saturating_sub(dt);
                    if self.parasite.lifespan.is_zero() {
                        self.lifespan_expired(out_events);
                    }
                }
            }
            GameMode::MainMenu | GameMode::Paused | GameMode::GameOver => {}
        }
    }

    fn host_encountered(&mut self, host: HostId, out_events: &mut Vec<Event>) {
        if self.mode != GameMode::Playing {
            reject(RejectionReason::InvalidMode { mode: self.mode }, out_events);
            return;
        }
        if let Some(level) = self.awaiting_level.clone() {
            reject(RejectionReason::LevelLoading(level), out_events);
            return;
        }

        let Some(entity) = self.hosts.iter().find(|entity| entity.id() == host).copied() else {
            reject(RejectionReason::UnknownHost(host), out_events);
            return;
        };
        if !entity.is_interactable() {
            reject(RejectionReason::HostNotInteractable(host), out_events);
            return;
        }
        if self.store.is_on_cooldown(host) {
            reject(RejectionReason::HostOnCooldown(host), out_events);
            return;
        }
        let Some(level) = self.level.clone() else {
            warn!("host {host} touched before any level was loaded");
            reject(RejectionReason::MalformedLevel, out_events);
            return;
        };

        match self.store.begin_battle(&entity, self.progress(level)) {
            Ok(target) => {
                self.unsaved_elapsed = Duration::ZERO;
                self.set_mode(GameMode::Battle, out_events);
                out_events.push(Event::BattleStarted { target });
            }
            Err(reason) => reject(reason, out_events),
        }
    }

    fn finish_battle(&mut self, won: bool, out_events: &mut Vec<Event>) {
        if self.mode != GameMode::Battle {
            reject(RejectionReason::InvalidMode { mode: self.mode }, out_events);
            return;
        }

        let settlement = match self.store.end_battle(won) {
            Ok(settlement) => settlement,
            Err(reason) => {
                reject(reason, out_events);
                return;
            }
        };

        if let Some(amount) = settlement.bonus {
            self.parasite.lifespan = self.parasite.lifespan.saturating_add(amount);
            out_events.push(Event::LifespanBonus { amount });
        }
        if won {
            let host = settlement.target.host();
            if let Some(entity) = self.host_mut(host) {
                if !entity.disable_interaction() {
                    debug!("host {host} was already possessed");
                }
            }
            out_events.push(Event::HostPossessed { host });
        }

        out_events.push(Event::BattleEnded { won });
        self.set_mode(GameMode::Playing, out_events);

        match settlement.return_to {
            Some(level) => self.request_level(level, out_events),
            None => warn!("no saved level to return to after battle"),
        }
    }

    fn pause(&mut self, out_events: &mut Vec<Event>) {
        match self.mode {
            GameMode::Playing | GameMode::Battle => {
                self.paused_from = Some(self.mode);
                self.set_mode(GameMode::Paused, out_events);
            }
            GameMode::Paused => debug!("pause requested while already paused"),
            mode => reject(RejectionReason::InvalidMode { mode }, out_events),
        }
    }

    fn resume(&mut self, out_events: &mut Vec<Event>) {
        if self.mode != GameMode::Paused {
            reject(RejectionReason::InvalidMode { mode: self.mode }, out_events);
            return;
        }
        let resume_to = self.paused_from.take().unwrap_or(GameMode::Playing);
        self.set_mode(resume_to, out_events);
    }

    fn lifespan_expired(&mut self, out_events: &mut Vec<Event>) {
        if self.parasite.expired || self.mode == GameMode::GameOver {
            debug!("lifespan expiry already handled");
            return;
        }
        if self.mode != GameMode::Playing {
            reject(RejectionReason::InvalidMode { mode: self.mode }, out_events);
            return;
        }

        self.parasite.expired = true;
        info!("parasite lifespan expired");
        self.set_mode(GameMode::GameOver, out_events);
        out_events.push(Event::GameOver);
    }

    fn restart_level(&mut self, out_events: &mut Vec<Event>) {
        self.set_mode(GameMode::MainMenu, out_events);
        self.store.reset();
        self.paused_from = None;
        self.unsaved_elapsed = Duration::ZERO;
        self.parasite.reset(self.config.base_lifespan);
        self.set_mode(GameMode::Playing, out_events);

        match self.level.clone() {
            Some(level) => self.request_level(level, out_events),
            None => warn!("restart requested before any level was loaded"),
        }
    }

    fn level_loaded(
        &mut self,
        level: LevelId,
        player_spawn: Option<Position>,
        hosts: Vec<HostSpawn>,
        out_events: &mut Vec<Event>,
    ) {
        if level.is_blank() {
            warn!("scene loader reported a level without a name");
            reject(RejectionReason::MalformedLevel, out_events);
            return;
        }
        if !self.config.catalog.contains(&level) {
            warn!("scene loader reported level {level}, which is not in the catalog");
            reject(RejectionReason::UnknownLevel(level), out_events);
            return;
        }

        self.hosts = hosts.into_iter().map(HostEntity::from_spawn).collect();
        self.awaiting_level = None;
        self.unsaved_elapsed = Duration::ZERO;

        let saved_here = self
            .store
            .snapshot()
            .is_some_and(|snapshot| snapshot.level == level);
        if saved_here {
            if let Some(restored) = self.store.restore(&mut self.hosts) {
                self.parasite.position = restored.position;
                self.parasite.lifespan = restored.lifespan;
                info!(
                    "restored level {} with {:?} lifespan",
                    restored.level, restored.lifespan
                );
                out_events.push(Event::LevelRestored {
                    level: restored.level,
                    position: restored.position,
                    lifespan: restored.lifespan,
                });
            }
        } else {
            self.store.reset();
            self.parasite.reset(self.config.base_lifespan);
            self.parasite.position = player_spawn.unwrap_or_else(|| {
                warn!("level {level} has no parasite spawn; placing parasite at the origin");
                Position::ORIGIN
            });
            info!("entered level {level}");
        }

        self.level = Some(level);
    }

    fn move_player(&mut self, position: Position, out_events: &mut Vec<Event>) {
        if self.mode != GameMode::Playing {
            reject(RejectionReason::InvalidMode { mode: self.mode }, out_events);
            return;
        }
        self.parasite.position = position;
    }

    fn exit_reached(&mut self, next: Option<LevelId>, out_events: &mut Vec<Event>) {
        if self.mode != GameMode::Playing {
            reject(RejectionReason::InvalidMode { mode: self.mode }, out_events);
            return;
        }

        let destination = match (next, self.level.as_ref()) {
            (Some(next), _) => Some(next),
            (None, Some(current)) => infer_next_level(current),
            (None, None) => None,
        };
        let Some(destination) = destination.filter(|level| !level.is_blank()) else {
            warn!("could not determine the level after the exit");
            reject(RejectionReason::MalformedLevel, out_events);
            return;
        };
        if !self.config.catalog.contains(&destination) {
            warn!("exit leads to level {destination}, which is not in the catalog");
            reject(RejectionReason::UnknownLevel(destination), out_events);
            return;
        }

        self.store.reset();
        self.request_level(destination, out_events);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn reject(reason: RejectionReason, out_events: &mut Vec<Event>) {
    warn!("command rejected: {reason}");
    out_events.push(Event::CommandRejected { reason });
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartGame => world.start_game(out_events),
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::MovePlayer { position } => world.move_player(position, out_events),
        Command::HostEncountered { host } => world.host_encountered(host, out_events),
        Command::FinishBattle { won } => world.finish_battle(won, out_events),
        Command::Pause => world.pause(out_events),
        Command::Resume => world.resume(out_events),
        Command::LifespanExpired => world.lifespan_expired(out_events),
        Command::RestartLevel => world.restart_level(out_events),
        Command::LevelLoaded {
            level,
            player_spawn,
            hosts,
        } => world.level_loaded(level, player_spawn, hosts, out_events),
        Command::ExitReached { next } => world.exit_reached(next, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use parasite_lost_core::{BattleTarget, GameMode, HostId, LevelId, Position};

    use super::{HostEntity, LevelSnapshot, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Current game mode.
    #[must_use]
    pub fn mode(world: &World) -> GameMode {
        world.mode
    }

    /// Current location of the parasite.
    #[must_use]
    pub fn player_position(world: &World) -> Position {
        world.parasite.position
    }

    /// Remaining lifespan of the parasite.
    #[must_use]
    pub fn player_lifespan(world: &World) -> Duration {
        world.parasite.lifespan
    }

    /// Level that is currently live, if any.
    #[must_use]
    pub fn current_level(world: &World) -> Option<&LevelId> {
        world.level.as_ref()
    }

    /// Level requested from the scene loader and not yet reported loaded.
    #[must_use]
    pub fn awaiting_level(world: &World) -> Option<&LevelId> {
        world.awaiting_level.as_ref()
    }

    /// Hosts of the live level.
    #[must_use]
    pub fn hosts(world: &World) -> &[HostEntity] {
        &world.hosts
    }

    /// Looks up a host of the live level.
    #[must_use]
    pub fn host(world: &World, host: HostId) -> Option<&HostEntity> {
        world.hosts.iter().find(|entity| entity.id() == host)
    }

    /// Saved progress of the active level.
    #[must_use]
    pub fn level_snapshot(world: &World) -> Option<&LevelSnapshot> {
        world.store.snapshot()
    }

    /// Battle in progress, if any.
    #[must_use]
    pub fn battle_target(world: &World) -> Option<BattleTarget> {
        world.store.battle_target()
    }

    /// Reports whether battles against the host are suppressed after a restore.
    #[must_use]
    pub fn is_on_cooldown(world: &World, host: HostId) -> bool {
        world.store.is_on_cooldown(host)
    }
}
