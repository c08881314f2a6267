#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rhythm battle system: spawns timed notes, scores hit attempts, counts
//! misses against a heart budget and reports the battle outcome.

mod health;
mod note;

use std::time::Duration;

use log::{debug, info};
use parasite_lost_core::{
    BattleOutcome, BattleTarget, Event, GameMode, HostSize, NoteId, SessionEndReason,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub use health::{HealthTracker, LifeLoss};
pub use note::Note;

/// Geometry of the single lane notes travel along.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lane {
    /// Coordinate notes appear at.
    pub spawn_position: f32,
    /// Coordinate the player aims hits at.
    pub hit_line: f32,
    /// Coordinate beyond which missed notes are removed.
    pub end_position: f32,
    /// Distance covered per second.
    pub note_speed: f32,
}

impl Default for Lane {
    fn default() -> Self {
        Self {
            spawn_position: 10.0,
            hit_line: 0.0,
            end_position: -10.0,
            note_speed: 5.0,
        }
    }
}

/// Tuning for a single battle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    /// Battle length before it ends on its own.
    pub duration: Duration,
    /// Gap between consecutive notes.
    pub spawn_interval: Duration,
    /// Maximum distance from the hit line that still counts as a hit.
    pub hit_tolerance: f32,
    /// Misses allowed before the battle is lost.
    pub lives: u32,
    /// Delay before the first note.
    pub lead_time: Duration,
    /// Upper bound of the random delay added to each spawn gap.
    pub spawn_jitter: Duration,
    /// Seed for the spawn jitter.
    pub rng_seed: u64,
    /// Time before a finished backing track may end the battle.
    pub track_end_grace: Duration,
    /// Lane geometry.
    pub lane: Lane,
}

impl SessionConfig {
    /// Creates a configuration with the default lane and pacing extras.
    #[must_use]
    pub fn new(
        duration: Duration,
        spawn_interval: Duration,
        hit_tolerance: f32,
        lives: u32,
    ) -> Self {
        Self {
            duration,
            spawn_interval,
            hit_tolerance,
            lives,
            ..Self::default()
        }
    }

    /// Replaces the lane geometry.
    #[must_use]
    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = lane;
        self
    }

    /// Enables seeded spawn jitter.
    #[must_use]
    pub fn with_jitter(mut self, spawn_jitter: Duration, rng_seed: u64) -> Self {
        self.spawn_jitter = spawn_jitter;
        self.rng_seed = rng_seed;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(40),
            spawn_interval: Duration::from_secs(2),
            hit_tolerance: 0.5,
            lives: 3,
            lead_time: Duration::from_secs(1),
            spawn_jitter: Duration::ZERO,
            rng_seed: 0,
            track_end_grace: Duration::from_secs(2),
            lane: Lane::default(),
        }
    }
}

/// Battle tuning per host size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BattleVariants {
    /// Battle against a small host.
    pub small: SessionConfig,
    /// Battle against a medium host.
    pub medium: SessionConfig,
    /// Battle against a large host.
    pub large: SessionConfig,
}

impl BattleVariants {
    /// Uses the same tuning for every host size.
    #[must_use]
    pub const fn uniform(config: SessionConfig) -> Self {
        Self {
            small: config,
            medium: config,
            large: config,
        }
    }

    /// Tuning for a battle against the provided target.
    #[must_use]
    pub fn for_target(&self, target: &BattleTarget) -> SessionConfig {
        match target.size() {
            HostSize::Small => self.small,
            HostSize::Medium => self.medium,
            HostSize::Large => self.large,
        }
    }
}

impl Default for BattleVariants {
    fn default() -> Self {
        let base = SessionConfig::default();
        Self {
            small: SessionConfig {
                duration: Duration::from_secs(20),
                ..base
            },
            medium: SessionConfig {
                duration: Duration::from_secs(30),
                spawn_interval: Duration::from_millis(1_600),
                ..base
            },
            large: SessionConfig {
                spawn_interval: Duration::from_millis(1_200),
                lane: Lane {
                    note_speed: 7.0,
                    ..base.lane
                },
                ..base
            },
        }
    }
}

/// Lifecycle of a rhythm session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No battle has been started.
    NotStarted,
    /// Notes are spawning and being scored.
    Running,
    /// The battle produced its outcome.
    Ended,
}

/// Deterministic rhythm battle driven by elapsed time and hit attempts.
#[derive(Debug)]
pub struct RhythmSession {
    phase: SessionPhase,
    config: SessionConfig,
    elapsed: Duration,
    next_spawn: Duration,
    next_note: u32,
    notes: Vec<Note>,
    health: HealthTracker,
    total_spawned: u32,
    total_hit: u32,
    track_finished: bool,
    rng: ChaCha8Rng,
    outcome: Option<BattleOutcome>,
}

impl RhythmSession {
    /// Creates an idle session.
    #[must_use]
    pub fn new() -> Self {
        let config = SessionConfig::default();
        Self {
            phase: SessionPhase::NotStarted,
            config,
            elapsed: Duration::ZERO,
            next_spawn: config.lead_time,
            next_note: 0,
            notes: Vec::new(),
            health: HealthTracker::new(config.lives),
            total_spawned: 0,
            total_hit: 0,
            track_finished: false,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            outcome: None,
        }
    }

    /// Resets every counter and starts a battle with the provided tuning.
    pub fn start(&mut self, config: SessionConfig) {
        info!(
            "rhythm battle started: duration {:?}, interval {:?}, {} lives",
            config.duration, config.spawn_interval, config.lives
        );
        self.phase = SessionPhase::Running;
        self.config = config;
        self.elapsed = Duration::ZERO;
        self.next_spawn = config.lead_time;
        self.next_note = 0;
        self.notes.clear();
        self.health.reset(config.lives);
        self.total_spawned = 0;
        self.total_hit = 0;
        self.track_finished = false;
        self.rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        self.outcome = None;
    }

    /// Consumes world events, advancing the battle by the time they report.
    ///
    /// A batch without `TimeAdvanced` leaves the session untouched, so a
    /// paused game freezes the battle and drops hit attempts. A batch in
    /// which the world leaves the battle aborts the session instead.
    pub fn handle(&mut self, events: &[Event], hit_pressed: bool, out: &mut Vec<Event>) {
        let mut advanced: Option<Duration> = None;
        let mut left_battle = false;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    advanced = Some(advanced.unwrap_or(Duration::ZERO).saturating_add(*dt));
                }
                Event::BattleStarted { .. } => left_battle = false,
                Event::BattleEnded { .. } => left_battle = true,
                Event::GameModeChanged { to, .. } => {
                    if !matches!(to, GameMode::Battle | GameMode::Paused) {
                        left_battle = true;
                    }
                }
                _ => {}
            }
        }

        if left_battle {
            self.abort();
            return;
        }
        if let Some(dt) = advanced {
            self.tick(dt, hit_pressed, out);
        }
    }

    /// Advances the battle by `dt`, applying at most one hit attempt.
    pub fn tick(&mut self, dt: Duration, hit_pressed: bool, out: &mut Vec<Event>) {
        if self.phase != SessionPhase::Running {
            return;
        }

        self.elapsed = self.elapsed.saturating_add(dt);

        for note in &mut self.notes {
            note.advance(dt);
        }
        self.notes.retain_mut(|note| {
            if note.expire() {
                out.push(Event::NoteExpired { note: note.id() });
                false
            } else {
                true
            }
        });

        if hit_pressed {
            self.resolve_hit(out);
        }

        for note in &mut self.notes {
            if !note.check_missed() {
                continue;
            }
            debug!("note {:?} missed", note.id());
            out.push(Event::NoteMissed { note: note.id() });
            match self.health.lose_life() {
                LifeLoss::Remaining(remaining) => out.push(Event::LifeLost { remaining }),
                LifeLoss::Depleted => {
                    out.push(Event::LifeLost { remaining: 0 });
                    out.push(Event::LivesDepleted);
                }
                LifeLoss::AlreadyDepleted => {}
            }
        }

        if self.elapsed >= self.next_spawn {
            self.spawn_note(out);
            self.next_spawn = self
                .elapsed
                .saturating_add(self.config.spawn_interval)
                .saturating_add(self.roll_jitter());
        }

        if let Some(reason) = self.end_reason() {
            self.end(reason, out);
        }
    }

    /// Stops a running battle without reporting an outcome.
    ///
    /// Every note on the lane is destroyed. Sessions that are not running
    /// are left untouched.
    pub fn abort(&mut self) {
        if self.phase != SessionPhase::Running {
            return;
        }
        info!(
            "rhythm battle aborted after {:?}, {}/{} notes hit",
            self.elapsed, self.total_hit, self.total_spawned
        );
        self.phase = SessionPhase::Ended;
        self.notes.clear();
    }

    /// Records that the backing track stopped playing.
    ///
    /// The battle ends on the first tick after the grace period.
    pub fn signal_track_finished(&mut self) {
        self.track_finished = true;
    }

    /// Outcome of the last finished battle.
    #[must_use]
    pub const fn result(&self) -> Option<BattleOutcome> {
        self.outcome
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Reports whether a battle is in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    /// Notes currently on the lane, oldest first.
    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Hearts left.
    #[must_use]
    pub const fn lives(&self) -> u32 {
        self.health.lives()
    }

    /// Notes spawned since the battle started.
    #[must_use]
    pub const fn total_spawned(&self) -> u32 {
        self.total_spawned
    }

    /// Notes hit since the battle started.
    #[must_use]
    pub const fn total_hit(&self) -> u32 {
        self.total_hit
    }

    /// Battle time elapsed.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Fraction of the battle duration elapsed, in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.config.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.config.duration.as_secs_f32()).min(1.0)
    }

    fn resolve_hit(&mut self, out: &mut Vec<Event>) {
        let target = self
            .notes
            .iter()
            .enumerate()
            .filter(|(_, note)| note.can_be_hit())
            .min_by(|(_, a), (_, b)| {
                a.distance_to_hit_line()
                    .total_cmp(&b.distance_to_hit_line())
            })
            .map(|(index, _)| index);

        let Some(index) = target else {
            debug!("hit attempt with no note in range");
            out.push(Event::HitWhiffed);
            return;
        };

        let mut note = self.notes.remove(index);
        if let Some(accuracy) = note.attempt_hit() {
            self.total_hit += 1;
            debug!("note {:?} hit with accuracy {accuracy:.2}", note.id());
            out.push(Event::NoteHit {
                note: note.id(),
                accuracy,
            });
        }
    }

    fn spawn_note(&mut self, out: &mut Vec<Event>) {
        let id = NoteId::new(self.next_note);
        self.next_note += 1;
        self.notes
            .push(Note::spawn(id, &self.config.lane, self.config.hit_tolerance));
        self.total_spawned += 1;
        out.push(Event::NoteSpawned { note: id });
    }

    fn roll_jitter(&mut self) -> Duration {
        if self.config.spawn_jitter.is_zero() {
            return Duration::ZERO;
        }
        let bound = u64::try_from(self.config.spawn_jitter.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(self.rng.gen_range(0..=bound))
    }

    fn end_reason(&self) -> Option<SessionEndReason> {
        if !self.health.has_lives_remaining() {
            Some(SessionEndReason::LivesDepleted)
        } else if self.elapsed >= self.config.duration {
            Some(SessionEndReason::DurationElapsed)
        } else if self.track_finished && self.elapsed > self.config.track_end_grace {
            Some(SessionEndReason::TrackFinished)
        } else {
            None
        }
    }

    fn end(&mut self, reason: SessionEndReason, out: &mut Vec<Event>) {
        let accuracy = if self.total_spawned == 0 {
            0.0
        } else {
            self.total_hit as f32 / self.total_spawned as f32
        };
        let outcome = BattleOutcome {
            won: self.health.has_lives_remaining(),
            accuracy,
        };
        info!(
            "rhythm battle ended ({reason:?}): won {}, {}/{} notes hit",
            outcome.won, self.total_hit, self.total_spawned
        );

        self.phase = SessionPhase::Ended;
        self.notes.clear();
        self.outcome = Some(outcome);
        out.push(Event::RhythmSessionEnded { outcome, reason });
    }
}

impl Default for RhythmSession {
    fn default() -> Self {
        Self::new()
    }
}
