use std::collections::VecDeque;
use std::time::Duration;

use parasite_lost_core::{
    Command, Event, GameMode, HostId, HostSize, HostSpawn, LevelId, NoteState, Position,
};
use parasite_lost_system_battle_result::{BattleResultCoordinator, Config};
use parasite_lost_system_rhythm::{BattleVariants, RhythmSession};
use parasite_lost_world::{self as world, query, World};

const FRAME: Duration = Duration::from_millis(100);
const HOST: HostId = HostId::new(1);

fn load(level: &LevelId) -> Command {
    Command::LevelLoaded {
        level: level.clone(),
        player_spawn: Some(Position::ORIGIN),
        hosts: vec![HostSpawn {
            id: HOST,
            size: HostSize::Small,
        }],
    }
}

struct Game {
    world: World,
    session: RhythmSession,
    variants: BattleVariants,
    coordinator: BattleResultCoordinator,
    log: Vec<Event>,
}

impl Game {
    fn new() -> Self {
        Self::with_coordinator(Config::default())
    }

    fn with_coordinator(config: Config) -> Self {
        Self {
            world: World::new(),
            session: RhythmSession::new(),
            variants: BattleVariants::default(),
            coordinator: BattleResultCoordinator::new(config),
            log: Vec::new(),
        }
    }

    fn apply_all(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut queue: VecDeque<Command> = commands.into();
        let mut events = Vec::new();
        while let Some(command) = queue.pop_front() {
            let mut produced = Vec::new();
            world::apply(&mut self.world, command, &mut produced);
            for event in &produced {
                if let Event::LevelRequested { level } = event {
                    queue.push_back(load(level));
                }
            }
            events.extend(produced);
        }
        events
    }

    fn frame(&mut self, mut commands: Vec<Command>) {
        commands.push(Command::Tick { dt: FRAME });
        let mut first_pass = true;

        while !commands.is_empty() {
            let world_events = self.apply_all(commands);
            for event in &world_events {
                if let Event::BattleStarted { target } = event {
                    self.session.start(self.variants.for_target(target));
                }
            }
            // Notes cover half a unit per frame; press when the next step lands on the line.
            let pressed = first_pass
                && self.session.notes().iter().any(|note| {
                    note.state() == NoteState::Active && (note.position() - 0.5).abs() <= 0.25
                });
            first_pass = false;

            let mut battle_events = Vec::new();
            self.session.handle(&world_events, pressed, &mut battle_events);

            let seen = self.log.len();
            self.log.extend(world_events);
            self.log.extend(battle_events);
            commands = Vec::new();
            self.coordinator.handle(&self.log[seen..], &mut commands);
        }
    }

    fn frames_until(&mut self, done: impl Fn(&Game) -> bool) {
        for _ in 0..400 {
            if done(self) {
                return;
            }
            self.frame(Vec::new());
        }
        panic!("condition not reached within 400 frames");
    }

    fn index_of(&self, wanted: impl Fn(&Event) -> bool) -> usize {
        self.log
            .iter()
            .position(|event| wanted(event))
            .expect("event in log")
    }
}

fn is_rhythm_event(event: &Event) -> bool {
    matches!(
        event,
        Event::NoteSpawned { .. }
            | Event::NoteHit { .. }
            | Event::NoteMissed { .. }
            | Event::NoteExpired { .. }
            | Event::LifeLost { .. }
            | Event::HitWhiffed
            | Event::RhythmSessionEnded { .. }
    )
}

fn enter_battle(game: &mut Game) {
    game.frame(vec![Command::StartGame, load(&LevelId::new("Level1"))]);
    for _ in 0..4 {
        game.frame(Vec::new());
    }
    game.frame(vec![Command::HostEncountered { host: HOST }]);
}

fn play_through() -> Game {
    let mut game = Game::new();
    enter_battle(&mut game);
    for _ in 0..240 {
        game.frame(Vec::new());
    }
    game
}

#[test]
fn perfect_play_possesses_the_host_and_returns_to_the_level() {
    let game = play_through();

    assert!(game.log.contains(&Event::HostPossessed { host: HOST }));
    assert!(game.log.contains(&Event::LifespanBonus {
        amount: Duration::from_secs(5),
    }));
    assert!(game.log.contains(&Event::LevelRestored {
        level: LevelId::new("Level1"),
        position: Position::ORIGIN,
        lifespan: Duration::from_millis(14_500),
    }));
    let finished = game
        .log
        .iter()
        .filter(|event| matches!(event, Event::BattleEnded { won: true }))
        .count();
    assert_eq!(finished, 1);

    assert_eq!(query::mode(&game.world), GameMode::Playing);
    let host = query::host(&game.world, HOST).expect("host");
    assert!(!host.is_interactable());
    assert!(!game.session.is_running());
    assert!(!game.coordinator.is_tracking_battle());
}

#[test]
fn result_arrives_two_seconds_after_the_session_ends() {
    let game = play_through();

    let session_end = game
        .log
        .iter()
        .position(|event| matches!(event, Event::RhythmSessionEnded { .. }))
        .expect("session end");
    let battle_end = game
        .log
        .iter()
        .position(|event| matches!(event, Event::BattleEnded { .. }))
        .expect("battle end");
    let waited: Duration = game.log[session_end..battle_end]
        .iter()
        .filter_map(|event| match event {
            Event::TimeAdvanced { dt } => Some(*dt),
            _ => None,
        })
        .sum();

    assert_eq!(waited, Duration::from_secs(2));
}

#[test]
fn replays_are_deterministic() {
    let first = play_through();
    let second = play_through();

    assert_eq!(first.log, second.log);
    assert_eq!(
        query::player_lifespan(&first.world),
        query::player_lifespan(&second.world)
    );
}

#[test]
fn accurate_hit_ends_the_session_together_with_the_battle() {
    let mut game = Game::with_coordinator(Config::default().with_auto_win_threshold(0.7));
    enter_battle(&mut game);
    game.frames_until(|game| query::mode(&game.world) == GameMode::Playing);
    for _ in 0..100 {
        game.frame(Vec::new());
    }

    let battle_end = game.index_of(|event| matches!(event, Event::BattleEnded { won: true }));
    assert!(!game.log[battle_end..].iter().any(is_rhythm_event));
    assert!(!game
        .log
        .iter()
        .any(|event| matches!(event, Event::RhythmSessionEnded { .. })));
    assert!(!game.session.is_running());
    assert!(game.session.notes().is_empty());
    assert_eq!(game.session.total_hit(), 1);
}

#[test]
fn restarting_mid_battle_abandons_the_session() {
    let mut game = Game::new();
    enter_battle(&mut game);
    for _ in 0..30 {
        game.frame(Vec::new());
    }
    assert!(!game.session.notes().is_empty());

    game.frame(vec![Command::RestartLevel]);
    let restart = game.index_of(|event| {
        matches!(
            event,
            Event::GameModeChanged {
                from: GameMode::Battle,
                to: GameMode::MainMenu,
            }
        )
    });
    for _ in 0..60 {
        game.frame(Vec::new());
    }

    assert_eq!(query::mode(&game.world), GameMode::Playing);
    assert!(!game.session.is_running());
    assert!(!game.coordinator.is_tracking_battle());
    assert!(!game.log[restart..].iter().any(is_rhythm_event));
    assert!(!game
        .log
        .iter()
        .any(|event| matches!(event, Event::BattleEnded { .. } | Event::CommandRejected { .. })));
}

#[test]
fn restart_during_the_return_delay_drops_the_result() {
    let mut game = Game::new();
    enter_battle(&mut game);
    game.frames_until(|game| !game.session.is_running());
    assert!(game.coordinator.is_pending());

    game.frame(vec![Command::RestartLevel]);
    for _ in 0..60 {
        game.frame(Vec::new());
    }

    assert_eq!(query::mode(&game.world), GameMode::Playing);
    assert!(!game.coordinator.is_pending());
    assert!(!game
        .log
        .iter()
        .any(|event| matches!(event, Event::BattleEnded { .. } | Event::CommandRejected { .. })));
}
