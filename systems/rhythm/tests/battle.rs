use std::collections::BTreeMap;
use std::time::Duration;

use parasite_lost_core::{
    BattleOutcome, Command, Event, HostId, HostSize, HostSpawn, LevelId, NoteId, Position,
    SessionEndReason,
};
use parasite_lost_system_rhythm::{Lane, RhythmSession, SessionConfig, SessionPhase};
use parasite_lost_world::{self as world, World};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const STEP: Duration = Duration::from_millis(100);

fn short_lane() -> Lane {
    Lane {
        spawn_position: 2.5,
        hit_line: 0.0,
        end_position: -3.0,
        note_speed: 5.0,
    }
}

fn ten_second_battle() -> SessionConfig {
    SessionConfig::new(Duration::from_secs(10), Duration::from_secs(2), 0.5, 3)
        .with_lane(short_lane())
}

fn count(events: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}

#[test]
fn three_hits_out_of_five_notes_wins_with_sixty_percent_accuracy() {
    let mut session = RhythmSession::new();
    session.start(ten_second_battle());
    let presses = [1_500, 3_500, 7_500];
    let mut events = Vec::new();

    for step in 1..=100_u64 {
        let now = step * 100;
        session.tick(STEP, presses.contains(&now), &mut events);
    }

    assert_eq!(session.phase(), SessionPhase::Ended);
    assert_eq!(session.total_spawned(), 5);
    assert_eq!(session.total_hit(), 3);
    assert_eq!(session.lives(), 1);
    assert_eq!(count(&events, |e| matches!(e, Event::NoteMissed { .. })), 2);

    let outcome = session.result().expect("outcome");
    assert!(outcome.won);
    assert!((outcome.accuracy - 0.6).abs() < 1e-6);
    assert!(matches!(
        events.last(),
        Some(Event::RhythmSessionEnded {
            reason: SessionEndReason::DurationElapsed,
            ..
        })
    ));
}

#[test]
fn losing_every_heart_ends_the_battle_early() {
    let mut session = RhythmSession::new();
    session.start(ten_second_battle());
    let mut events = Vec::new();

    while session.is_running() {
        session.tick(STEP, false, &mut events);
    }

    assert_eq!(session.elapsed(), Duration::from_millis(5_700));
    assert_eq!(count(&events, |e| matches!(e, Event::NoteMissed { .. })), 3);
    assert_eq!(count(&events, |e| matches!(e, Event::LivesDepleted)), 1);
    assert_eq!(
        events.last(),
        Some(&Event::RhythmSessionEnded {
            outcome: BattleOutcome {
                won: false,
                accuracy: 0.0,
            },
            reason: SessionEndReason::LivesDepleted,
        })
    );
    assert!(session.notes().is_empty());
}

#[test]
fn ended_session_ignores_further_ticks() {
    let mut session = RhythmSession::new();
    session.start(ten_second_battle());
    let mut events = Vec::new();
    while session.is_running() {
        session.tick(STEP, false, &mut events);
    }

    let mut after = Vec::new();
    session.tick(STEP, true, &mut after);

    assert!(after.is_empty());
}

#[test]
fn long_frame_marks_a_note_missed_before_it_expires() {
    let mut session = RhythmSession::new();
    session.start(ten_second_battle());
    let mut events = Vec::new();
    for _ in 0..10 {
        session.tick(STEP, false, &mut events);
    }
    events.clear();

    session.tick(Duration::from_secs(3), false, &mut events);
    let first = NoteId::new(0);
    assert!(events.contains(&Event::NoteMissed { note: first }));
    assert!(!events.contains(&Event::NoteExpired { note: first }));

    events.clear();
    session.tick(STEP, false, &mut events);
    assert!(events.contains(&Event::NoteExpired { note: first }));
}

#[test]
fn note_lifecycles_stay_legal_under_random_input() {
    for seed in 0..8_u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut session = RhythmSession::new();
        session.start(
            SessionConfig::new(Duration::from_secs(30), Duration::from_millis(700), 0.5, 5)
                .with_lane(short_lane())
                .with_jitter(Duration::from_millis(300), seed),
        );
        let mut history: BTreeMap<NoteId, Vec<&'static str>> = BTreeMap::new();

        while session.is_running() {
            let dt = Duration::from_millis(rng.gen_range(1..=400));
            let pressed = rng.gen_bool(0.3);
            let mut events = Vec::new();
            session.tick(dt, pressed, &mut events);

            for event in &events {
                let (note, label) = match event {
                    Event::NoteSpawned { note } => (*note, "spawned"),
                    Event::NoteHit { note, accuracy } => {
                        assert!((0.0..=1.0).contains(accuracy));
                        (*note, "hit")
                    }
                    Event::NoteMissed { note } => (*note, "missed"),
                    Event::NoteExpired { note } => (*note, "expired"),
                    _ => continue,
                };
                history.entry(note).or_default().push(label);
            }
            assert!(session.total_hit() <= session.total_spawned());
        }

        let outcome = session.result().expect("outcome");
        assert_eq!(outcome.won, session.lives() > 0);
        for (note, labels) in &history {
            let legal = matches!(
                labels.as_slice(),
                ["spawned"]
                    | ["spawned", "hit"]
                    | ["spawned", "missed"]
                    | ["spawned", "missed", "expired"]
            );
            assert!(legal, "seed {seed}, note {note:?}: {labels:?}");
        }
    }
}

#[test]
fn paused_world_freezes_the_battle() {
    let host = HostId::new(7);
    let mut world = World::new();
    let mut world_events = Vec::new();
    for command in [
        Command::StartGame,
        Command::LevelLoaded {
            level: LevelId::new("Level1"),
            player_spawn: Some(Position::ORIGIN),
            hosts: vec![HostSpawn {
                id: host,
                size: HostSize::Medium,
            }],
        },
        Command::HostEncountered { host },
    ] {
        world::apply(&mut world, command, &mut world_events);
    }

    let mut session = RhythmSession::new();
    session.start(ten_second_battle());
    let mut out = Vec::new();
    for _ in 0..12 {
        world_events.clear();
        world::apply(&mut world, Command::Tick { dt: STEP }, &mut world_events);
        session.handle(&world_events, false, &mut out);
    }
    let frozen: Vec<f32> = session.notes().iter().map(|note| note.position()).collect();
    assert_eq!(frozen.len(), 1);

    world_events.clear();
    world::apply(&mut world, Command::Pause, &mut world_events);
    for _ in 0..30 {
        world::apply(&mut world, Command::Tick { dt: STEP }, &mut world_events);
    }
    out.clear();
    session.handle(&world_events, true, &mut out);

    assert!(out.is_empty());
    let after: Vec<f32> = session.notes().iter().map(|note| note.position()).collect();
    assert_eq!(after, frozen);
    assert_eq!(session.elapsed(), Duration::from_millis(1_200));

    world_events.clear();
    world::apply(&mut world, Command::Resume, &mut world_events);
    world::apply(&mut world, Command::Tick { dt: STEP }, &mut world_events);
    session.handle(&world_events, false, &mut out);
    assert_eq!(session.elapsed(), Duration::from_millis(1_300));
}
