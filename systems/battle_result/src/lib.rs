#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Battle result coordinator that turns rhythm battle outcomes into
//! `FinishBattle` commands for the world.

use std::time::Duration;

use log::{debug, info};
use parasite_lost_core::{Command, Event, GameMode};

/// Configuration parameters for the battle result coordinator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    return_delay: Duration,
    auto_win_threshold: Option<f32>,
}

impl Config {
    /// Creates a configuration that reports results after `return_delay`
    /// of battle time.
    #[must_use]
    pub const fn new(return_delay: Duration) -> Self {
        Self {
            return_delay,
            auto_win_threshold: None,
        }
    }

    /// Ends the battle as a win as soon as a single hit reaches `threshold`.
    #[must_use]
    pub fn with_auto_win_threshold(mut self, threshold: f32) -> Self {
        self.auto_win_threshold = Some(threshold);
        self
    }

    /// Battle time between the session ending and the result being reported.
    #[must_use]
    pub const fn return_delay(&self) -> Duration {
        self.return_delay
    }

    /// Hit accuracy that wins the battle outright, if enabled.
    #[must_use]
    pub const fn auto_win_threshold(&self) -> Option<f32> {
        self.auto_win_threshold
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[derive(Clone, Copy, Debug)]
struct PendingResult {
    won: bool,
    remaining: Duration,
}

/// Pure system reporting exactly one result per battle.
#[derive(Debug)]
pub struct BattleResultCoordinator {
    config: Config,
    in_battle: bool,
    reported: bool,
    pending: Option<PendingResult>,
}

impl BattleResultCoordinator {
    /// Creates a coordinator using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self {
            config,
            in_battle: false,
            reported: false,
            pending: None,
        }
    }

    /// Consumes world and battle events and emits `FinishBattle` once the
    /// return delay has elapsed.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::BattleStarted { target } => {
                    debug!("tracking battle against host {}", target.host());
                    self.in_battle = true;
                    self.reported = false;
                    self.pending = None;
                }
                Event::BattleEnded { .. } => self.forget_battle(),
                Event::GameModeChanged { to, .. } => {
                    if !matches!(to, GameMode::Battle | GameMode::Paused) {
                        self.forget_battle();
                    }
                }
                Event::RhythmSessionEnded { outcome, reason } => {
                    info!(
                        "battle finished ({reason:?}): won {}, accuracy {:.2}",
                        outcome.won, outcome.accuracy
                    );
                    self.latch(outcome.won, self.config.return_delay);
                }
                Event::NoteHit { accuracy, .. } => {
                    if let Some(threshold) = self.config.auto_win_threshold {
                        if *accuracy >= threshold {
                            info!("hit accuracy {accuracy:.2} wins the battle outright");
                            self.latch(true, Duration::ZERO);
                        }
                    }
                }
                Event::TimeAdvanced { dt } => {
                    if let Some(pending) = self.pending.as_mut() {
                        pending.remaining = pending.remaining.saturating_sub(*dt);
                    }
                }
                _ => {}
            }
        }

        if let Some(pending) = self.pending {
            if pending.remaining.is_zero() {
                self.pending = None;
                self.reported = true;
                out.push(Command::FinishBattle { won: pending.won });
            }
        }
    }

    /// Reports whether a result is waiting for the return delay.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Reports whether a battle started and has not been settled or abandoned.
    #[must_use]
    pub const fn is_tracking_battle(&self) -> bool {
        self.in_battle
    }

    fn forget_battle(&mut self) {
        self.in_battle = false;
        self.pending = None;
    }

    fn latch(&mut self, won: bool, delay: Duration) {
        if !self.in_battle || self.reported || self.pending.is_some() {
            return;
        }
        self.pending = Some(PendingResult {
            won,
            remaining: delay,
        });
    }
}

impl Default for BattleResultCoordinator {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
