//! Single timed note travelling down the battle lane.

use std::time::Duration;

use parasite_lost_core::{NoteId, NoteState};

use crate::Lane;

/// Note moving at constant speed from the spawn point past the hit line.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    id: NoteId,
    position: f32,
    speed: f32,
    direction: f32,
    hit_line: f32,
    end_position: f32,
    tolerance: f32,
    state: NoteState,
}

impl Note {
    /// Places a new active note at the lane's spawn point.
    #[must_use]
    pub fn spawn(id: NoteId, lane: &Lane, tolerance: f32) -> Self {
        let direction = if lane.end_position < lane.spawn_position {
            -1.0
        } else {
            1.0
        };
        Self {
            id,
            position: lane.spawn_position,
            speed: lane.note_speed,
            direction,
            hit_line: lane.hit_line,
            end_position: lane.end_position,
            tolerance,
            state: NoteState::Active,
        }
    }

    /// Identifier of the note.
    #[must_use]
    pub const fn id(&self) -> NoteId {
        self.id
    }

    /// Current lane coordinate.
    #[must_use]
    pub const fn position(&self) -> f32 {
        self.position
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> NoteState {
        self.state
    }

    /// Absolute distance between the note and the hit line.
    #[must_use]
    pub fn distance_to_hit_line(&self) -> f32 {
        (self.position - self.hit_line).abs()
    }

    /// Moves the note along the lane. Missed notes keep moving.
    pub fn advance(&mut self, dt: Duration) {
        if matches!(self.state, NoteState::Active | NoteState::Missed) {
            self.position += self.direction * self.speed * dt.as_secs_f32();
        }
    }

    /// Reports whether a hit attempt would connect with the note.
    #[must_use]
    pub fn can_be_hit(&self) -> bool {
        self.state == NoteState::Active && self.distance_to_hit_line() <= self.tolerance
    }

    /// Marks the note as hit and returns the hit accuracy in `0.0..=1.0`.
    pub fn attempt_hit(&mut self) -> Option<f32> {
        if self.state != NoteState::Active {
            return None;
        }
        self.state = NoteState::Hit;
        let accuracy = if self.tolerance > 0.0 {
            1.0 - self.distance_to_hit_line() / self.tolerance
        } else {
            1.0
        };
        Some(accuracy.clamp(0.0, 1.0))
    }

    /// Marks an active note that passed the hit window as missed.
    ///
    /// Returns `true` only on the tick the note transitions.
    pub fn check_missed(&mut self) -> bool {
        if self.state != NoteState::Active {
            return false;
        }
        let travelled_past = (self.position - self.hit_line) * self.direction;
        if travelled_past > self.tolerance {
            self.state = NoteState::Missed;
            true
        } else {
            false
        }
    }

    /// Reports whether the note moved beyond the end of the lane.
    #[must_use]
    pub fn is_past_lane_end(&self) -> bool {
        (self.position - self.end_position) * self.direction > 0.0
    }

    /// Expires a missed note that left the lane.
    ///
    /// Active notes are left for the miss check so they never skip the
    /// missed state.
    pub fn expire(&mut self) -> bool {
        if self.state == NoteState::Missed && self.is_past_lane_end() {
            self.state = NoteState::Expired;
            true
        } else {
            false
        }
    }
}
