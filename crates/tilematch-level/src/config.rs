//! Gameplay and level configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ConfigError, GridLayout};

/// Shortest animation duration the engine accepts.
pub const MIN_ANIMATION_DURATION_MS: u64 = 100;

// ---------------------------------------------------------------------------
// GameplayConfig
// ---------------------------------------------------------------------------

/// Engine-wide settings plus the ordered list of levels.
///
/// Missing fields fall back to [`Default`], so a JSON file only needs to
/// list what it overrides:
///
/// ```json
/// { "animation_duration_ms": 250, "levels": [ { "width": 3, "height": 1, "tiles": ["A", "A", null] } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Duration of every move and of the destroy delay, in milliseconds.
    pub animation_duration_ms: u64,

    /// Gestures shorter than this (in world units) produce no swipe.
    pub min_swipe_distance: f32,

    /// How tile slots map to world positions.
    pub layout: GridLayout,

    /// Levels in play order. Indices wrap around this list.
    pub levels: Vec<LevelConfig>,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            animation_duration_ms: 300,
            min_swipe_distance: 0.0,
            layout: GridLayout::default(),
            levels: Vec::new(),
        }
    }
}

impl GameplayConfig {
    /// Parses a JSON config and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validated()
    }

    /// Reads and validates a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Clamps out-of-range values and checks every level.
    ///
    /// - `animation_duration_ms` is raised to [`MIN_ANIMATION_DURATION_MS`].
    /// - A negative `min_swipe_distance` becomes 0.
    /// - Each level must pass [`LevelConfig::validate`].
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.animation_duration_ms < MIN_ANIMATION_DURATION_MS {
            warn!(
                duration_ms = self.animation_duration_ms,
                min_ms = MIN_ANIMATION_DURATION_MS,
                "animation duration below minimum, clamping"
            );
            self.animation_duration_ms = MIN_ANIMATION_DURATION_MS;
        }
        if self.min_swipe_distance.is_nan() || self.min_swipe_distance < 0.0 {
            self.min_swipe_distance = 0.0;
        }
        for level in &self.levels {
            level.validate()?;
        }
        Ok(self)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_duration_ms)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// The level for `index`, wrapped modulo the level count.
    ///
    /// # Errors
    /// [`ConfigError::NoLevels`] if no levels are configured. An index
    /// past the end is never an error.
    pub fn level_config(&self, index: u32) -> Result<&LevelConfig, ConfigError> {
        if self.levels.is_empty() {
            return Err(ConfigError::NoLevels);
        }
        let wrapped = index as usize % self.levels.len();
        Ok(&self.levels[wrapped])
    }
}

// ---------------------------------------------------------------------------
// LevelConfig
// ---------------------------------------------------------------------------

/// One level: its size and the element kind initially on each tile.
///
/// `tiles` is row-major (`y * width + x`), `None` for an empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    #[serde(default)]
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<Option<String>>,
}

impl LevelConfig {
    /// Builds a level from ASCII rows, **top row first**.
    ///
    /// `.` is an empty cell; any other character is an element whose kind
    /// is that character.
    ///
    /// ```
    /// use tilematch_level::LevelConfig;
    ///
    /// let level = LevelConfig::from_rows("intro", &["B..", "AAB"]).unwrap();
    /// assert_eq!(level.element_kind(0, 0), Some("A"));
    /// assert_eq!(level.element_kind(0, 1), Some("B"));
    /// assert_eq!(level.element_kind(1, 1), None);
    /// ```
    pub fn from_rows(name: &str, rows: &[&str]) -> Result<Self, ConfigError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        let mut tiles = vec![None; width * height];

        for (row, line) in rows.iter().enumerate() {
            if line.chars().count() != width {
                return Err(ConfigError::InvalidLevel(format!(
                    "row {row} of level {name:?} has {} cells, expected {width}",
                    line.chars().count()
                )));
            }
            let y = height - 1 - row;
            for (x, c) in line.chars().enumerate() {
                if c != '.' {
                    tiles[y * width + x] = Some(c.to_string());
                }
            }
        }

        let level = Self {
            name: name.to_owned(),
            width,
            height,
            tiles,
        };
        level.validate()?;
        Ok(level)
    }

    /// Checks the dimensions against the tile list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidLevel(format!(
                "level {:?} has zero size {}x{}",
                self.name, self.width, self.height
            )));
        }
        if self.tiles.len() != self.width * self.height {
            return Err(ConfigError::InvalidLevel(format!(
                "level {:?} lists {} tiles for a {}x{} grid",
                self.name,
                self.tiles.len(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// The configured kind at `(x, y)`, or `None` for an empty or
    /// off-grid cell.
    pub fn element_kind(&self, x: i32, y: i32) -> Option<&str> {
        let (x, y) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get(y * self.width + x)?.as_deref()
    }

    /// Looks a kind up by name among the kinds this level uses.
    ///
    /// Restoring a snapshot goes through this lookup, so a saved kind the
    /// level no longer uses resolves to `None`.
    pub fn kind_by_name(&self, name: &str) -> Option<&str> {
        self.tiles.iter().flatten().find(|k| *k == name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_levels() -> GameplayConfig {
        GameplayConfig {
            levels: vec![
                LevelConfig::from_rows("one", &["AAA"]).unwrap(),
                LevelConfig::from_rows("two", &["BB", "BB"]).unwrap(),
            ],
            ..GameplayConfig::default()
        }
    }

    #[test]
    fn test_level_index_wraps_modulo_count() {
        let config = two_levels();
        assert_eq!(config.level_config(0).unwrap().name, "one");
        assert_eq!(config.level_config(1).unwrap().name, "two");
        assert_eq!(config.level_config(2).unwrap().name, "one");
        assert_eq!(config.level_config(7).unwrap().name, "two");
        assert_eq!(config.level_config(u32::MAX).unwrap().name, "two");
    }

    #[test]
    fn test_no_levels_is_an_error() {
        let config = GameplayConfig::default();
        assert!(matches!(config.level_config(0), Err(ConfigError::NoLevels)));
    }

    #[test]
    fn test_validated_clamps_duration() {
        let config = GameplayConfig {
            animation_duration_ms: 10,
            min_swipe_distance: -4.0,
            ..GameplayConfig::default()
        }
        .validated()
        .unwrap();
        assert_eq!(config.animation_duration_ms, MIN_ANIMATION_DURATION_MS);
        assert_eq!(config.animation_duration(), Duration::from_millis(100));
        assert_eq!(config.min_swipe_distance, 0.0);
    }

    #[test]
    fn test_validated_rejects_bad_level() {
        let config = GameplayConfig {
            levels: vec![LevelConfig {
                name: "broken".into(),
                width: 2,
                height: 2,
                tiles: vec![None; 3],
            }],
            ..GameplayConfig::default()
        };
        assert!(matches!(config.validated(), Err(ConfigError::InvalidLevel(_))));
    }

    #[test]
    fn test_from_json_str_uses_defaults_for_missing_fields() {
        let json = r#"{ "levels": [ { "width": 2, "height": 1, "tiles": ["A", null] } ] }"#;
        let config = GameplayConfig::from_json_str(json).unwrap();
        assert_eq!(config.animation_duration_ms, 300);
        assert_eq!(config.level_count(), 1);
        assert_eq!(config.levels[0].element_kind(0, 0), Some("A"));
        assert_eq!(config.levels[0].element_kind(1, 0), None);
    }

    #[test]
    fn test_from_json_str_rejects_garbage() {
        assert!(matches!(
            GameplayConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_rows_rejects_ragged_rows() {
        let err = LevelConfig::from_rows("ragged", &["AA", "A"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLevel(_)));
    }

    #[test]
    fn test_element_kind_off_grid_is_none() {
        let level = LevelConfig::from_rows("l", &["AB"]).unwrap();
        assert_eq!(level.element_kind(-1, 0), None);
        assert_eq!(level.element_kind(2, 0), None);
        assert_eq!(level.element_kind(0, 1), None);
    }

    #[test]
    fn test_kind_by_name_only_knows_used_kinds() {
        let level = LevelConfig::from_rows("l", &["AB."]).unwrap();
        assert_eq!(level.kind_by_name("B"), Some("B"));
        assert_eq!(level.kind_by_name("Z"), None);
    }
}
