//! TOML configuration for headless runs.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use parasite_lost_core::{Command, HostId, HostSize, HostSpawn, LevelId, Position};
use parasite_lost_system_battle_result::Config as CoordinatorConfig;
use parasite_lost_system_rhythm::{BattleVariants, SessionConfig};
use parasite_lost_world::{Config as WorldConfig, LevelCatalog, SizeBonuses};
use serde::Deserialize;
use thiserror::Error;

/// Reasons a configuration file cannot be turned into run settings.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for the expected layout.
    #[error("failed to parse configuration toml")]
    Parse(#[from] toml::de::Error),
    /// A value is outside its accepted range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
    /// A level lists a host size the game does not know.
    #[error("unknown host size `{size}` in level `{level}`")]
    UnknownHostSize { level: String, size: String },
}

/// Layout of a loadable level.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LevelLayout {
    pub(crate) name: LevelId,
    pub(crate) spawn: Option<Position>,
    pub(crate) hosts: Vec<HostSpawn>,
}

impl LevelLayout {
    /// Command that reports this level as loaded.
    pub(crate) fn load_command(&self) -> Command {
        Command::LevelLoaded {
            level: self.name.clone(),
            player_spawn: self.spawn,
            hosts: self.hosts.clone(),
        }
    }
}

/// Fully resolved settings for every component of a run.
#[derive(Clone, Debug)]
pub(crate) struct Settings {
    pub(crate) world: WorldConfig,
    pub(crate) coordinator: CoordinatorConfig,
    pub(crate) variants: BattleVariants,
    pub(crate) levels: Vec<LevelLayout>,
}

/// Loads settings from `path`, or the built-in defaults when no path is given.
pub(crate) fn load(path: Option<&Path>, seed: u64) -> anyhow::Result<Settings> {
    let file = match path {
        Some(path) => read(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => FileConfig::default(),
    };
    file.into_settings(seed)
        .context("configuration contains invalid values")
}

fn read(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents)
}

fn parse(contents: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(contents)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    lifespan: LifespanSection,
    battle: BattleSection,
    rhythm: RhythmSection,
    levels: Vec<LevelSection>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LifespanSection {
    base_secs: f64,
    restore_cooldown_ms: u64,
    bonus_secs: BonusSection,
}

impl Default for LifespanSection {
    fn default() -> Self {
        Self {
            base_secs: 10.0,
            restore_cooldown_ms: 1_500,
            bonus_secs: BonusSection::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BonusSection {
    small: f64,
    medium: f64,
    large: f64,
}

impl Default for BonusSection {
    fn default() -> Self {
        Self {
            small: 5.0,
            medium: 10.0,
            large: 20.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BattleSection {
    return_delay_ms: u64,
    auto_win_threshold: Option<f32>,
    jitter_ms: u64,
}

impl Default for BattleSection {
    fn default() -> Self {
        Self {
            return_delay_ms: 2_000,
            auto_win_threshold: None,
            jitter_ms: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RhythmSection {
    small: RhythmOverrides,
    medium: RhythmOverrides,
    large: RhythmOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RhythmOverrides {
    duration_secs: Option<f64>,
    spawn_interval_ms: Option<u64>,
    hit_tolerance: Option<f32>,
    lives: Option<u32>,
    note_speed: Option<f32>,
}

impl RhythmOverrides {
    fn apply(&self, mut config: SessionConfig) -> Result<SessionConfig, ConfigError> {
        if let Some(duration) = self.duration_secs {
            config.duration = seconds("rhythm.duration_secs", duration)?;
        }
        if let Some(interval) = self.spawn_interval_ms {
            if interval == 0 {
                return Err(ConfigError::Invalid {
                    field: "rhythm.spawn_interval_ms",
                    reason: "must be greater than zero",
                });
            }
            config.spawn_interval = Duration::from_millis(interval);
        }
        if let Some(tolerance) = self.hit_tolerance {
            config.hit_tolerance = positive("rhythm.hit_tolerance", tolerance)?;
        }
        if let Some(lives) = self.lives {
            config.lives = lives;
        }
        if let Some(speed) = self.note_speed {
            config.lane.note_speed = positive("rhythm.note_speed", speed)?;
        }
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LevelSection {
    name: String,
    #[serde(default)]
    spawn: Option<[f32; 2]>,
    #[serde(default)]
    hosts: Vec<String>,
}

impl LevelSection {
    fn into_layout(self) -> Result<LevelLayout, ConfigError> {
        let name = LevelId::new(self.name.clone());
        if name.is_blank() {
            return Err(ConfigError::Invalid {
                field: "levels.name",
                reason: "must not be blank",
            });
        }

        let mut hosts = Vec::with_capacity(self.hosts.len());
        for (index, size) in self.hosts.iter().enumerate() {
            let size = parse_host_size(size).ok_or_else(|| ConfigError::UnknownHostSize {
                level: self.name.clone(),
                size: size.clone(),
            })?;
            let id = u32::try_from(index + 1).map_err(|_| ConfigError::Invalid {
                field: "levels.hosts",
                reason: "too many hosts in one level",
            })?;
            hosts.push(HostSpawn {
                id: HostId::new(id),
                size,
            });
        }

        Ok(LevelLayout {
            name,
            spawn: self.spawn.map(|[x, y]| Position::new(x, y)),
            hosts,
        })
    }
}

impl FileConfig {
    fn into_settings(self, seed: u64) -> Result<Settings, ConfigError> {
        let bonuses = SizeBonuses {
            small: seconds("lifespan.bonus_secs.small", self.lifespan.bonus_secs.small)?,
            medium: seconds("lifespan.bonus_secs.medium", self.lifespan.bonus_secs.medium)?,
            large: seconds("lifespan.bonus_secs.large", self.lifespan.bonus_secs.large)?,
        };
        let base_lifespan = seconds("lifespan.base_secs", self.lifespan.base_secs)?;
        if base_lifespan.is_zero() {
            return Err(ConfigError::Invalid {
                field: "lifespan.base_secs",
                reason: "must be greater than zero",
            });
        }

        let sections = if self.levels.is_empty() {
            default_levels()
        } else {
            self.levels
        };
        let levels = sections
            .into_iter()
            .map(LevelSection::into_layout)
            .collect::<Result<Vec<_>, _>>()?;
        let catalog = LevelCatalog::new(levels.iter().map(|level| level.name.clone()).collect());

        let world = WorldConfig::new(
            base_lifespan,
            bonuses,
            Duration::from_millis(self.lifespan.restore_cooldown_ms),
        )
        .with_catalog(catalog);

        let mut coordinator =
            CoordinatorConfig::new(Duration::from_millis(self.battle.return_delay_ms));
        if let Some(threshold) = self.battle.auto_win_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::Invalid {
                    field: "battle.auto_win_threshold",
                    reason: "must lie between 0 and 1",
                });
            }
            coordinator = coordinator.with_auto_win_threshold(threshold);
        }

        let jitter = Duration::from_millis(self.battle.jitter_ms);
        let defaults = BattleVariants::default();
        let variants = BattleVariants {
            small: self
                .rhythm
                .small
                .apply(defaults.small)?
                .with_jitter(jitter, seed),
            medium: self
                .rhythm
                .medium
                .apply(defaults.medium)?
                .with_jitter(jitter, seed),
            large: self
                .rhythm
                .large
                .apply(defaults.large)?
                .with_jitter(jitter, seed),
        };

        Ok(Settings {
            world,
            coordinator,
            variants,
            levels,
        })
    }
}

fn default_levels() -> Vec<LevelSection> {
    vec![
        LevelSection {
            name: "Level1".to_owned(),
            spawn: Some([0.0, 0.0]),
            hosts: vec!["small".to_owned(), "medium".to_owned()],
        },
        LevelSection {
            name: "Level2".to_owned(),
            spawn: Some([0.0, 0.0]),
            hosts: vec!["medium".to_owned(), "large".to_owned()],
        },
    ]
}

fn parse_host_size(name: &str) -> Option<HostSize> {
    match name.trim().to_ascii_lowercase().as_str() {
        "small" => Some(HostSize::Small),
        "medium" => Some(HostSize::Medium),
        "large" => Some(HostSize::Large),
        _ => None,
    }
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::Invalid {
        field,
        reason: "must be a finite, non-negative number of seconds",
    })
}

fn positive(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be a positive number",
        })
    }
}
