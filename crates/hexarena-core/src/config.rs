//! Configuration loading and typed config structures for Hexarena.
//!
//! The canonical configuration lives in `hexarena-config.yaml`. Every field
//! has a default, so an empty file (or no file) yields a playable battle.
//!
//! Environment variables override YAML values:
//! - `HEXARENA_SEED` overrides `arena.seed`

use std::path::Path;

use hexarena_world::ItemConfig;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArenaConfig {
    /// Grid, seed and timing.
    #[serde(default)]
    pub arena: BattleConfig,

    /// Combat, prediction and attrition rules.
    #[serde(default)]
    pub combat: CombatConfig,

    /// Loot rules.
    #[serde(default)]
    pub items: ItemsConfig,

    /// Skill rules.
    #[serde(default)]
    pub skills: SkillsConfig,

    /// Alliance rules.
    #[serde(default)]
    pub alliance: AllianceConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ArenaConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(seed) = std::env::var("HEXARENA_SEED")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.arena.seed = seed;
        }
    }

    /// Loot rules in the form the item subsystem consumes.
    pub const fn item_config(&self) -> ItemConfig {
        ItemConfig {
            ration_heal_min: self.items.ration_heal_min,
            ration_heal_max: self.items.ration_heal_max,
            trap_damage: self.items.trap_damage,
            min_spawn: self.items.min_spawn,
            max_spawn: self.items.max_spawn,
            weapon_epochs: self.items.weapon_epochs,
            shield_epochs: self.items.shield_epochs,
            oracle_epochs: self.items.oracle_epochs,
        }
    }
}

/// Grid, seed and timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BattleConfig {
    /// Hex grid radius.
    #[serde(default = "default_grid_radius")]
    pub grid_radius: u32,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between epochs.
    #[serde(default = "default_epoch_interval_ms")]
    pub epoch_interval_ms: u64,

    /// Milliseconds an agent has to decide before falling back.
    #[serde(default = "default_decision_timeout_ms")]
    pub decision_timeout_ms: u64,

    /// Safety cap on epochs per battle.
    #[serde(default = "default_max_epochs")]
    pub max_epochs: u64,

    /// Consecutive market outages the runner rides out before giving up.
    #[serde(default = "default_max_market_failures")]
    pub max_market_failures: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            grid_radius: default_grid_radius(),
            seed: default_seed(),
            epoch_interval_ms: default_epoch_interval_ms(),
            decision_timeout_ms: default_decision_timeout_ms(),
            max_epochs: default_max_epochs(),
            max_market_failures: default_max_market_failures(),
        }
    }
}

/// Combat, prediction and attrition rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CombatConfig {
    /// HP lost per epoch, in percent of current HP (minimum 1 HP).
    #[serde(default = "default_bleed_percent")]
    pub bleed_percent: u32,

    /// HP paid to defend, in percent of current HP.
    #[serde(default = "default_defend_cost_percent")]
    pub defend_cost_percent: u32,

    /// Lowest prediction stake, in percent of HP.
    #[serde(default = "default_min_stake_percent")]
    pub min_stake_percent: u32,

    /// Highest prediction stake, in percent of HP.
    #[serde(default = "default_max_stake_percent")]
    pub max_stake_percent: u32,

    /// HP lost per epoch on a storm tile.
    #[serde(default = "default_storm_damage")]
    pub storm_damage: u32,

    /// Whether attacks need the target on an adjacent tile.
    #[serde(default = "default_true")]
    pub require_adjacent_attack: bool,

    /// Stake multiplier when attacking an ally.
    #[serde(default = "default_betrayal_multiplier")]
    pub betrayal_multiplier: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            bleed_percent: default_bleed_percent(),
            defend_cost_percent: default_defend_cost_percent(),
            min_stake_percent: default_min_stake_percent(),
            max_stake_percent: default_max_stake_percent(),
            storm_damage: default_storm_damage(),
            require_adjacent_attack: true,
            betrayal_multiplier: default_betrayal_multiplier(),
        }
    }
}

/// Loot rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemsConfig {
    /// Smallest ration heal.
    #[serde(default = "default_ration_heal_min")]
    pub ration_heal_min: u32,

    /// Largest ration heal.
    #[serde(default = "default_ration_heal_max")]
    pub ration_heal_max: u32,

    /// Trap damage.
    #[serde(default = "default_trap_damage")]
    pub trap_damage: u32,

    /// Attack stake bonus per weapon buff, in percent.
    #[serde(default = "default_weapon_bonus_percent")]
    pub weapon_bonus_percent: u32,

    /// Fewest items spawned per epoch.
    #[serde(default = "default_min_spawn")]
    pub min_spawn: u32,

    /// Most items spawned per epoch.
    #[serde(default = "default_max_spawn")]
    pub max_spawn: u32,

    /// Weapon buff duration.
    #[serde(default = "default_weapon_epochs")]
    pub weapon_epochs: u32,

    /// Shield buff duration.
    #[serde(default = "default_shield_epochs")]
    pub shield_epochs: u32,

    /// Oracle buff duration.
    #[serde(default = "default_oracle_epochs")]
    pub oracle_epochs: u32,
}

impl Default for ItemsConfig {
    fn default() -> Self {
        Self {
            ration_heal_min: default_ration_heal_min(),
            ration_heal_max: default_ration_heal_max(),
            trap_damage: default_trap_damage(),
            weapon_bonus_percent: default_weapon_bonus_percent(),
            min_spawn: default_min_spawn(),
            max_spawn: default_max_spawn(),
            weapon_epochs: default_weapon_epochs(),
            shield_epochs: default_shield_epochs(),
            oracle_epochs: default_oracle_epochs(),
        }
    }
}

/// Skill rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SkillsConfig {
    /// Epochs a skill stays unavailable after use.
    #[serde(default = "default_skill_cooldown")]
    pub cooldown_epochs: u32,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            cooldown_epochs: default_skill_cooldown(),
        }
    }
}

/// Alliance rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AllianceConfig {
    /// Epochs an alliance lasts.
    #[serde(default = "default_alliance_epochs")]
    pub duration_epochs: u32,
}

impl Default for AllianceConfig {
    fn default() -> Self {
        Self {
            duration_epochs: default_alliance_epochs(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Pretty,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_grid_radius() -> u32 {
    3
}
const fn default_seed() -> u64 {
    42
}
const fn default_epoch_interval_ms() -> u64 {
    1000
}
const fn default_decision_timeout_ms() -> u64 {
    5000
}
const fn default_max_epochs() -> u64 {
    100
}
const fn default_max_market_failures() -> u32 {
    10
}
const fn default_bleed_percent() -> u32 {
    hexarena_agents::combat::DEFAULT_BLEED_PERCENT
}
const fn default_defend_cost_percent() -> u32 {
    hexarena_agents::combat::DEFAULT_DEFEND_COST_PERCENT
}
const fn default_min_stake_percent() -> u32 {
    5
}
const fn default_max_stake_percent() -> u32 {
    50
}
const fn default_storm_damage() -> u32 {
    50
}
const fn default_true() -> bool {
    true
}
const fn default_betrayal_multiplier() -> u32 {
    2
}
const fn default_ration_heal_min() -> u32 {
    50
}
const fn default_ration_heal_max() -> u32 {
    150
}
const fn default_trap_damage() -> u32 {
    100
}
const fn default_weapon_bonus_percent() -> u32 {
    25
}
const fn default_min_spawn() -> u32 {
    1
}
const fn default_max_spawn() -> u32 {
    3
}
const fn default_weapon_epochs() -> u32 {
    3
}
const fn default_shield_epochs() -> u32 {
    2
}
const fn default_oracle_epochs() -> u32 {
    1
}
const fn default_skill_cooldown() -> u32 {
    hexarena_agents::SKILL_COOLDOWN_EPOCHS
}
const fn default_alliance_epochs() -> u32 {
    hexarena_agents::alliance::DEFAULT_ALLIANCE_EPOCHS
}
fn default_log_level() -> String {
    String::from("info")
}
