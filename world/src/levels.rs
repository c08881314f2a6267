//! Level catalog and exit destination inference.

use parasite_lost_core::LevelId;

/// Ordered list of levels the scene loader knows how to load.
///
/// An empty catalog places no restriction on level names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelCatalog {
    levels: Vec<LevelId>,
}

impl LevelCatalog {
    /// Creates a catalog from levels in play order.
    #[must_use]
    pub fn new(levels: Vec<LevelId>) -> Self {
        Self { levels }
    }

    /// Level the game starts in.
    #[must_use]
    pub fn first(&self) -> Option<&LevelId> {
        self.levels.first()
    }

    /// Reports whether the level can be loaded.
    #[must_use]
    pub fn contains(&self, level: &LevelId) -> bool {
        self.levels.is_empty() || self.levels.contains(level)
    }
}

/// Infers the level that follows `current` by incrementing its trailing number.
///
/// `Level1` becomes `Level2` and `Reef09` becomes `Reef10`. Names without a
/// trailing number have no successor.
#[must_use]
pub fn infer_next_level(current: &LevelId) -> Option<LevelId> {
    let name = current.as_str();
    let prefix = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[prefix.len()..];
    if digits.is_empty() {
        return None;
    }

    let number: u64 = digits.parse().ok()?;
    let next = number.checked_add(1)?;
    Some(LevelId::new(format!("{prefix}{next}")))
}
