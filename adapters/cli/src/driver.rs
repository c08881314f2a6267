//! Headless frame loop wiring the world, the rhythm battle and the result
//! coordinator together, driven by a seeded autoplayer.

use std::{collections::VecDeque, fmt, time::Duration};

use log::{debug, info, warn};
use parasite_lost_core::{Command, Event, GameMode, LevelId, Position, RejectionReason};
use parasite_lost_system_battle_result::BattleResultCoordinator;
use parasite_lost_system_rhythm::{BattleVariants, RhythmSession};
use parasite_lost_world::{self as world, query, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{LevelLayout, Settings};

const ENCOUNTER_CHANCE: f64 = 0.02;
const WANDER_STEP: f32 = 0.25;
const PRESS_WINDOW: f32 = 0.1;

/// How a headless run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RunOutcome {
    /// The parasite left the last level in the catalog.
    Cleared,
    /// The parasite's lifespan ran out.
    GameOver,
    /// The frame budget was exhausted first.
    OutOfFrames,
}

/// Totals reported at the end of a run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) outcome: RunOutcome,
    pub(crate) frames: u64,
    pub(crate) levels: Vec<LevelId>,
    pub(crate) battles_won: u32,
    pub(crate) battles_lost: u32,
    pub(crate) notes_hit: u32,
    pub(crate) notes_missed: u32,
    pub(crate) lifespan: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels: Vec<&str> = self.levels.iter().map(LevelId::as_str).collect();
        writeln!(f, "outcome:   {:?} after {} frames", self.outcome, self.frames)?;
        writeln!(f, "levels:    {}", levels.join(" -> "))?;
        writeln!(
            f,
            "battles:   {} won, {} lost",
            self.battles_won, self.battles_lost
        )?;
        writeln!(
            f,
            "notes:     {} hit, {} missed",
            self.notes_hit, self.notes_missed
        )?;
        write!(f, "lifespan:  {:.1}s left", self.lifespan.as_secs_f32())
    }
}

/// Seeded stand-in for a human player.
#[derive(Debug)]
struct AutoPlayer {
    rng: ChaCha8Rng,
    skill: f64,
}

impl AutoPlayer {
    fn new(seed: u64, skill: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            skill,
        }
    }

    fn decide(&mut self, world: &World) -> Vec<Command> {
        match query::mode(world) {
            GameMode::MainMenu => vec![Command::StartGame],
            GameMode::Playing if query::awaiting_level(world).is_none() => self.explore(world),
            _ => Vec::new(),
        }
    }

    fn explore(&mut self, world: &World) -> Vec<Command> {
        let position = query::player_position(world);
        let mut commands = vec![Command::MovePlayer {
            position: Position::new(
                position.x + self.rng.gen_range(-WANDER_STEP..=WANDER_STEP),
                position.y + self.rng.gen_range(-WANDER_STEP..=WANDER_STEP),
            ),
        }];
        if !self.rng.gen_bool(ENCOUNTER_CHANCE) {
            return commands;
        }

        let available = query::hosts(world)
            .iter()
            .find(|host| host.is_interactable() && !query::is_on_cooldown(world, host.id()));
        match available {
            Some(host) => commands.push(Command::HostEncountered { host: host.id() }),
            None if query::hosts(world).iter().all(|host| !host.is_interactable()) => {
                commands.push(Command::ExitReached { next: None });
            }
            None => {}
        }
        commands
    }

    fn press(&mut self, session: &RhythmSession) -> bool {
        let in_reach = session
            .notes()
            .iter()
            .any(|note| note.can_be_hit() && note.distance_to_hit_line() <= PRESS_WINDOW);
        in_reach && self.rng.gen_bool(self.skill)
    }
}

/// Options that shape a run beyond the configuration file.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunOptions {
    pub(crate) seed: u64,
    pub(crate) frame: Duration,
    pub(crate) skill: f64,
}

/// Owns every component of a headless run.
#[derive(Debug)]
pub(crate) struct Driver {
    world: World,
    session: RhythmSession,
    variants: BattleVariants,
    coordinator: BattleResultCoordinator,
    levels: Vec<LevelLayout>,
    player: AutoPlayer,
    frame: Duration,
    summary: RunSummary,
}

impl Driver {
    /// Creates a driver in the main menu.
    pub(crate) fn new(settings: Settings, options: RunOptions) -> Self {
        Self {
            world: World::with_config(settings.world),
            session: RhythmSession::new(),
            variants: settings.variants,
            coordinator: BattleResultCoordinator::new(settings.coordinator),
            levels: settings.levels,
            player: AutoPlayer::new(options.seed, options.skill),
            frame: options.frame,
            summary: RunSummary {
                outcome: RunOutcome::OutOfFrames,
                frames: 0,
                levels: Vec::new(),
                battles_won: 0,
                battles_lost: 0,
                notes_hit: 0,
                notes_missed: 0,
                lifespan: Duration::ZERO,
            },
        }
    }

    /// Read-only view of the world.
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Runs frames until the game ends or `max_frames` is reached.
    pub(crate) fn run(mut self, max_frames: u64) -> RunSummary {
        while self.summary.frames < max_frames {
            self.summary.frames += 1;
            if let Some(outcome) = self.step() {
                self.summary.outcome = outcome;
                break;
            }
        }
        self.summary.lifespan = query::player_lifespan(&self.world);
        info!("run finished: {:?}", self.summary.outcome);
        self.summary
    }

    fn step(&mut self) -> Option<RunOutcome> {
        let mut commands = self.player.decide(&self.world);
        commands.push(Command::Tick { dt: self.frame });

        let mut frame_events = Vec::new();
        let mut first_pass = true;
        while !commands.is_empty() {
            let world_events = self.apply_all(commands);
            for event in &world_events {
                if let Event::BattleStarted { target } = event {
                    self.session.start(self.variants.for_target(target));
                }
            }
            let pressed = first_pass && self.player.press(&self.session);
            first_pass = false;

            let mut battle_events = Vec::new();
            self.session.handle(&world_events, pressed, &mut battle_events);

            let seen = frame_events.len();
            frame_events.extend(world_events);
            frame_events.extend(battle_events);
            commands = Vec::new();
            self.coordinator.handle(&frame_events[seen..], &mut commands);
        }

        self.record(&frame_events)
    }

    fn apply_all(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut queue: VecDeque<Command> = commands.into();
        let mut events = Vec::new();
        while let Some(command) = queue.pop_front() {
            let mut produced = Vec::new();
            world::apply(&mut self.world, command, &mut produced);
            for event in &produced {
                if let Event::LevelRequested { level } = event {
                    match self.levels.iter().find(|layout| &layout.name == level) {
                        Some(layout) => queue.push_back(layout.load_command()),
                        None => warn!("no layout for requested level {level}"),
                    }
                }
            }
            events.extend(produced);
        }
        events
    }

    fn record(&mut self, events: &[Event]) -> Option<RunOutcome> {
        let mut outcome = None;
        for event in events {
            match event {
                Event::LevelRequested { level } => {
                    if self.summary.levels.last() != Some(level) {
                        info!("entering {level}");
                        self.summary.levels.push(level.clone());
                    }
                }
                Event::BattleEnded { won: true } => self.summary.battles_won += 1,
                Event::BattleEnded { won: false } => self.summary.battles_lost += 1,
                Event::NoteHit { .. } => self.summary.notes_hit += 1,
                Event::NoteMissed { .. } => self.summary.notes_missed += 1,
                Event::GameOver => outcome = Some(RunOutcome::GameOver),
                Event::CommandRejected {
                    reason: RejectionReason::UnknownLevel(level),
                } => {
                    info!("no level after {level}; run cleared");
                    outcome = Some(RunOutcome::Cleared);
                }
                Event::CommandRejected { reason } => debug!("command rejected: {reason}"),
                _ => {}
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn options(seed: u64) -> RunOptions {
        RunOptions {
            seed,
            frame: Duration::from_millis(16),
            skill: 0.9,
        }
    }

    fn run(seed: u64, max_frames: u64) -> RunSummary {
        let settings = config::load(None, seed).expect("default settings");
        Driver::new(settings, options(seed)).run(max_frames)
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        assert_eq!(run(11, 3_000), run(11, 3_000));
    }

    #[test]
    fn run_enters_the_first_level_and_respects_the_frame_budget() {
        let summary = run(3, 500);

        assert!(summary.frames <= 500);
        assert_eq!(summary.levels.first().map(LevelId::as_str), Some("Level1"));
    }

    #[test]
    fn rhythm_session_stops_once_the_world_leaves_the_battle() {
        let mut settings = config::load(None, 5).expect("default settings");
        settings.coordinator = settings.coordinator.with_auto_win_threshold(0.5);
        let mut driver = Driver::new(settings, options(5));

        for _ in 0..4_000 {
            if driver.step().is_some() {
                break;
            }
            if query::mode(driver.world()) == GameMode::Playing {
                assert!(!driver.session.is_running());
                assert!(!driver.coordinator.is_tracking_battle());
            }
        }

        assert!(driver.summary.battles_won + driver.summary.battles_lost > 0);
    }

    #[test]
    fn summary_lists_visited_levels() {
        let summary = RunSummary {
            outcome: RunOutcome::Cleared,
            frames: 42,
            levels: vec![LevelId::new("Level1"), LevelId::new("Level2")],
            battles_won: 3,
            battles_lost: 1,
            notes_hit: 20,
            notes_missed: 4,
            lifespan: Duration::from_millis(2_500),
        };

        let rendered = summary.to_string();
        assert!(rendered.contains("Cleared after 42 frames"));
        assert!(rendered.contains("Level1 -> Level2"));
        assert!(rendered.contains("2.5s left"));
    }
}
