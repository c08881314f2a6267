#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Parasite Lost gameplay core.
//!
//! This crate defines the message surface that connects host adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems and
//! presentation layers to react to. Systems consume event streams and respond
//! exclusively with new command batches or further notifications.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Parasite Lost: find a host before your time runs out.";

/// Top-level mode of the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    /// Title screen; nothing ticks.
    MainMenu,
    /// Exploration where the parasite's lifespan drains.
    Playing,
    /// A rhythm battle against a host is running.
    Battle,
    /// Time is frozen for every core component.
    Paused,
    /// The parasite died; only a restart leaves this mode.
    GameOver,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Leaves the main menu or game over screen and begins play.
    StartGame,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Reports the parasite's current location as moved by the movement layer.
    MovePlayer {
        /// New location of the parasite within the level.
        position: Position,
    },
    /// Reports that the parasite entered a host's interaction zone.
    HostEncountered {
        /// Identifier of the host that was touched.
        host: HostId,
    },
    /// Reports the outcome of the rhythm battle that is in progress.
    FinishBattle {
        /// Whether the parasite won the battle.
        won: bool,
    },
    /// Freezes the simulation clock.
    Pause,
    /// Unfreezes the simulation clock.
    Resume,
    /// External signal that the parasite's lifespan ran out.
    LifespanExpired,
    /// Discards level progress and starts the current level over.
    RestartLevel,
    /// Notifies the world that the scene loader finished loading a level.
    LevelLoaded {
        /// Level that is now live.
        level: LevelId,
        /// Spawn location of the parasite, if the level provides one.
        player_spawn: Option<Position>,
        /// Hosts placed in the level.
        hosts: Vec<HostSpawn>,
    },
    /// Reports that the parasite reached the level exit.
    ExitReached {
        /// Explicit destination; inferred from the current level when absent.
        next: Option<LevelId>,
    },
}

/// Events broadcast by the world and systems after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that the game entered a new mode.
    GameModeChanged {
        /// Mode that was active before the transition.
        from: GameMode,
        /// Mode that is active after the transition.
        to: GameMode,
    },
    /// Requests that the battle launcher start a rhythm battle.
    BattleStarted {
        /// Descriptor selecting the battle variant.
        target: BattleTarget,
    },
    /// Confirms that the battle in progress was settled.
    BattleEnded {
        /// Whether the parasite won.
        won: bool,
    },
    /// Confirms that a note entered the lane.
    NoteSpawned {
        /// Identifier of the new note.
        note: NoteId,
    },
    /// Confirms that a hit attempt connected with a note.
    NoteHit {
        /// Identifier of the note that was hit.
        note: NoteId,
        /// Hit quality in the range `0.0..=1.0`.
        accuracy: f32,
    },
    /// Reports that a note crossed the hit line without being hit.
    NoteMissed {
        /// Identifier of the note that was missed.
        note: NoteId,
    },
    /// Reports that a missed note left the lane.
    NoteExpired {
        /// Identifier of the note that left the lane.
        note: NoteId,
    },
    /// Reports a hit attempt with no note inside the hit window.
    HitWhiffed,
    /// Reports that a heart was lost.
    LifeLost {
        /// Hearts remaining after the loss.
        remaining: u32,
    },
    /// Reports that the last heart was lost.
    LivesDepleted,
    /// Reports that the rhythm session finished.
    RhythmSessionEnded {
        /// Final result of the session.
        outcome: BattleOutcome,
        /// Condition that ended the session.
        reason: SessionEndReason,
    },
    /// Reports that the parasite's lifespan was extended.
    LifespanBonus {
        /// Lifespan added to the parasite.
        amount: Duration,
    },
    /// Confirms that a host was possessed and can no longer be interacted with.
    HostPossessed {
        /// Identifier of the possessed host.
        host: HostId,
    },
    /// Requests that the scene loader load a level.
    LevelRequested {
        /// Level that should be loaded.
        level: LevelId,
    },
    /// Confirms that saved level progress was applied to the live level.
    LevelRestored {
        /// Level whose snapshot was restored.
        level: LevelId,
        /// Restored location of the parasite.
        position: Position,
        /// Restored lifespan of the parasite.
        lifespan: Duration,
    },
    /// Announces that the parasite died.
    GameOver,
    /// Reports that a command was rejected without changing state.
    CommandRejected {
        /// Specific reason the command failed.
        reason: RejectionReason,
    },
}

/// Reasons a command may be rejected by the world.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum RejectionReason {
    /// The command is not valid in the current game mode.
    #[error("command not allowed while in {mode:?}")]
    InvalidMode {
        /// Mode that was active when the command arrived.
        mode: GameMode,
    },
    /// A battle is already in progress.
    #[error("a battle is already in progress")]
    AlreadyInBattle,
    /// No battle is in progress.
    #[error("no battle is in progress")]
    NotInBattle,
    /// The host is not part of the live level.
    #[error("host {0} is not present in the level")]
    UnknownHost(HostId),
    /// The host was already possessed.
    #[error("host {0} can no longer be interacted with")]
    HostNotInteractable(HostId),
    /// The host was battled moments ago and is still cooling down.
    #[error("host {0} is on cooldown")]
    HostOnCooldown(HostId),
    /// A level name was empty or could not be inferred.
    #[error("level name is missing or malformed")]
    MalformedLevel,
    /// The level is not part of the configured catalog.
    #[error("level `{0}` is not in the level catalog")]
    UnknownLevel(LevelId),
    /// The requested level has not been reported loaded yet.
    #[error("level `{0}` is still loading")]
    LevelLoading(LevelId),
}

/// Location within a level expressed in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Position {
    /// Level origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Creates a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Stable identifier of a possessable host, preserved across level reloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(u32);

impl HostId {
    /// Creates a new host identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Size class of a host; selects both the battle variant and the lifespan reward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HostSize {
    /// Small fish.
    Small,
    /// Medium fish.
    Medium,
    /// Large fish.
    Large,
}

/// Host placement reported by the scene loader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSpawn {
    /// Identifier of the host.
    pub id: HostId,
    /// Size class of the host.
    pub size: HostSize,
}

/// Opaque descriptor of a battle, used to pick which battle variant to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleTarget {
    host: HostId,
    size: HostSize,
}

impl BattleTarget {
    /// Creates a descriptor for a battle against the provided host.
    #[must_use]
    pub const fn new(host: HostId, size: HostSize) -> Self {
        Self { host, size }
    }

    /// Host being fought.
    #[must_use]
    pub const fn host(&self) -> HostId {
        self.host
    }

    /// Size class of the host being fought.
    #[must_use]
    pub const fn size(&self) -> HostSize {
        self.size
    }
}

/// Name of a level as understood by the scene loader.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelId(String);

impl LevelId {
    /// Creates a level identifier from its scene name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Scene name of the level.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reports whether the name is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier assigned to a note within one rhythm session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(u32);

impl NoteId {
    /// Creates a new note identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Lifecycle of a note travelling down the lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoteState {
    /// Travelling toward the hit line and still hittable.
    Active,
    /// Hit by the player; removed immediately.
    Hit,
    /// Crossed the hit line unhit; keeps moving until it leaves the lane.
    Missed,
    /// Left the lane.
    Expired,
}

/// Final result of a rhythm session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleOutcome {
    /// Whether any hearts remained when the session ended.
    pub won: bool,
    /// Ratio of hit notes to spawned notes; zero when nothing spawned.
    pub accuracy: f32,
}

/// Condition that ended a rhythm session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionEndReason {
    /// Every heart was lost.
    LivesDepleted,
    /// The configured battle duration elapsed.
    DurationElapsed,
    /// The music track reported that it finished.
    TrackFinished,
}
