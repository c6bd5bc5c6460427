//! Roster builder for engine-run battles.
//!
//! Picks unique names from a built-in pool and deals classes in a fixed
//! rotation, so a five-agent battle fields one agent of every class.

use std::collections::BTreeSet;

use hexarena_agents::{ArenaAgent, MAX_AGENTS};
use hexarena_types::AgentClass;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use tracing::info;

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Spawner settings, read from the `agents` section of
/// `hexarena-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpawnerConfig {
    /// Number of agents in the battle.
    #[serde(default = "default_agent_count")]
    pub count: usize,

    /// Names to use before drawing from the built-in pool.
    #[serde(default)]
    pub names: Vec<String>,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            count: default_agent_count(),
            names: Vec::new(),
        }
    }
}

const fn default_agent_count() -> usize {
    5
}

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

const NAME_POOL: &[&str] = &[
    "Ajax", "Blitz", "Cinder", "Dagger", "Echo", "Flux", "Grim", "Havoc",
    "Ion", "Jinx", "Kraken", "Lotus", "Mirage", "Nova", "Omen", "Pulse",
    "Quake", "Rogue", "Spectre", "Talon", "Umbra", "Vortex", "Wraith", "Zenith",
];

/// Build a roster of `config.count` agents with unique names.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if the count is outside `2..=8`, a
/// configured name repeats, or the name pool runs dry.
pub fn spawn_roster(
    config: &SpawnerConfig,
    rng: &mut impl Rng,
) -> Result<Vec<ArenaAgent>, EngineError> {
    if !(2..=MAX_AGENTS).contains(&config.count) {
        return Err(EngineError::Spawner {
            message: format!(
                "agent count {} outside the supported range 2..={MAX_AGENTS}",
                config.count
            ),
        });
    }

    let mut used: BTreeSet<String> = BTreeSet::new();
    let mut agents = Vec::with_capacity(config.count);
    for (index, class) in AgentClass::ALL.iter().cycle().take(config.count).enumerate() {
        let name = match config.names.get(index) {
            Some(name) => name.clone(),
            None => pick_unused_name(rng, &used)?,
        };
        if !used.insert(name.clone()) {
            return Err(EngineError::Spawner {
                message: format!("duplicate agent name: {name}"),
            });
        }
        agents.push(ArenaAgent::new(name, *class));
    }

    info!(
        count = agents.len(),
        names = ?agents.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
        "Roster spawned"
    );
    Ok(agents)
}

fn pick_unused_name(rng: &mut impl Rng, used: &BTreeSet<String>) -> Result<String, EngineError> {
    let available: Vec<&str> = NAME_POOL
        .iter()
        .copied()
        .filter(|n| !used.contains(*n))
        .collect();
    available
        .choose(rng)
        .map(|n| (*n).to_owned())
        .ok_or_else(|| EngineError::Spawner {
            message: String::from("name pool exhausted"),
        })
}
