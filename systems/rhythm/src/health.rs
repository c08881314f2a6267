//! Heart counter for a rhythm battle.

/// Outcome of losing a heart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifeLoss {
    /// A heart was lost and some remain.
    Remaining(u32),
    /// The last heart was lost. Reported exactly once per reset.
    Depleted,
    /// No hearts were left to lose.
    AlreadyDepleted,
}

/// Finite miss budget; reaching zero ends the battle as a loss.
#[derive(Clone, Copy, Debug)]
pub struct HealthTracker {
    max_lives: u32,
    lives: u32,
    depletion_signalled: bool,
}

impl HealthTracker {
    /// Creates a tracker with every heart intact.
    #[must_use]
    pub const fn new(max_lives: u32) -> Self {
        Self {
            max_lives,
            lives: max_lives,
            depletion_signalled: false,
        }
    }

    /// Removes one heart, never going below zero.
    pub fn lose_life(&mut self) -> LifeLoss {
        if self.lives == 0 {
            return LifeLoss::AlreadyDepleted;
        }
        self.lives -= 1;
        if self.lives > 0 {
            return LifeLoss::Remaining(self.lives);
        }
        if self.depletion_signalled {
            LifeLoss::AlreadyDepleted
        } else {
            self.depletion_signalled = true;
            LifeLoss::Depleted
        }
    }

    /// Reports whether at least one heart is left.
    #[must_use]
    pub const fn has_lives_remaining(&self) -> bool {
        self.lives > 0
    }

    /// Hearts left.
    #[must_use]
    pub const fn lives(&self) -> u32 {
        self.lives
    }

    /// Hearts the tracker was reset with.
    #[must_use]
    pub const fn max_lives(&self) -> u32 {
        self.max_lives
    }

    /// Restores every heart and re-arms the depletion signal.
    pub fn reset(&mut self, max_lives: u32) {
        *self = Self::new(max_lives);
    }
}
