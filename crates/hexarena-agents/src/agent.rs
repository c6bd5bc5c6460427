//! Arena agent state and the battle roster.
//!
//! An [`ArenaAgent`] carries everything the epoch orchestrator mutates:
//! HP, position, kills, survival counter, skill state and alliance
//! partner. The [`Roster`] owns all agents of a battle in insertion order,
//! which is also the order used for every tie-break in the simulation.

use std::collections::BTreeMap;

use hexarena_types::{AgentClass, AgentId, AgentSnapshot, HexCoord, ItemBuff, SkillState};

use crate::error::AgentError;

/// HP ceiling for every class.
pub const DEFAULT_MAX_HP: u32 = 1000;

/// Most agents a single battle can hold.
pub const MAX_AGENTS: usize = 8;

/// One combatant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaAgent {
    /// Agent identifier.
    pub id: AgentId,
    /// Display name, unique on the roster.
    pub name: String,
    /// Archetype.
    pub class: AgentClass,
    hp: u32,
    /// HP ceiling.
    pub max_hp: u32,
    eliminated: bool,
    /// Current tile.
    pub position: Option<HexCoord>,
    /// Agents eliminated by this agent.
    pub kills: u32,
    /// Epochs survived.
    pub epochs_survived: u64,
    /// Class skill state.
    pub skill: SkillState,
    /// Current ally.
    pub ally_id: Option<AgentId>,
    /// Epochs left on the current alliance.
    pub alliance_epochs_remaining: u32,
}

impl ArenaAgent {
    /// Create a fresh agent at full HP with its skill ready.
    pub fn new(name: impl Into<String>, class: AgentClass) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            class,
            hp: DEFAULT_MAX_HP,
            max_hp: DEFAULT_MAX_HP,
            eliminated: false,
            position: None,
            kills: 0,
            epochs_survived: 0,
            skill: SkillState {
                kind: class.skill(),
                cooldown_remaining: 0,
                active: false,
            },
            ally_id: None,
            alliance_epochs_remaining: 0,
        }
    }

    /// Current HP.
    pub const fn hp(&self) -> u32 {
        self.hp
    }

    /// Whether the agent is still in the battle.
    pub const fn is_alive(&self) -> bool {
        self.hp > 0 && !self.eliminated
    }

    /// Whether the agent has been formally eliminated.
    pub const fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// Set HP, clamped to `[0, max_hp]`.
    pub fn set_hp(&mut self, hp: u32) {
        self.hp = hp.min(self.max_hp);
    }

    /// Apply an HP delta, clamped to `[0, max_hp]`.
    ///
    /// Returns the delta actually applied.
    pub fn apply_hp_delta(&mut self, delta: i64) -> i64 {
        let before = i64::from(self.hp);
        let after = before
            .saturating_add(delta)
            .clamp(0, i64::from(self.max_hp));
        self.hp = u32::try_from(after).unwrap_or(0);
        after.saturating_sub(before)
    }

    /// Force the agent out of the battle: HP 0, not alive, off the grid.
    pub fn mark_eliminated(&mut self) {
        self.hp = 0;
        self.eliminated = true;
        self.position = None;
        self.skill.active = false;
    }

    /// Serializable view of the agent.
    pub fn snapshot(&self, buffs: &[ItemBuff]) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            name: self.name.clone(),
            class: self.class,
            hp: self.hp,
            max_hp: self.max_hp,
            is_alive: self.is_alive(),
            position: self.position,
            kills: self.kills,
            epochs_survived: self.epochs_survived,
            skill: self.skill.clone(),
            ally_id: self.ally_id,
            alliance_epochs_remaining: self.alliance_epochs_remaining,
            buffs: buffs.to_vec(),
        }
    }
}

/// All agents of one battle, in roster order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    agents: Vec<ArenaAgent>,
}

impl Roster {
    /// Create an empty roster.
    pub const fn new() -> Self {
        Self { agents: Vec::new() }
    }

    /// Add an agent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DuplicateName`] if the name is taken and
    /// [`AgentError::RosterFull`] past [`MAX_AGENTS`].
    pub fn add(&mut self, agent: ArenaAgent) -> Result<AgentId, AgentError> {
        if self.agents.len() >= MAX_AGENTS {
            return Err(AgentError::RosterFull { max: MAX_AGENTS });
        }
        if self.agents.iter().any(|a| a.name == agent.name) {
            return Err(AgentError::DuplicateName(agent.name));
        }
        let id = agent.id;
        self.agents.push(agent);
        Ok(id)
    }

    /// Number of agents, alive or not.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// All agents in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &ArenaAgent> {
        self.agents.iter()
    }

    /// All agents in roster order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ArenaAgent> {
        self.agents.iter_mut()
    }

    /// Living agents in roster order.
    pub fn living(&self) -> impl Iterator<Item = &ArenaAgent> {
        self.agents.iter().filter(|a| a.is_alive())
    }

    /// Ids of living agents in roster order.
    pub fn living_ids(&self) -> Vec<AgentId> {
        self.living().map(|a| a.id).collect()
    }

    /// Number of living agents.
    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    /// Look up an agent by id.
    pub fn get(&self, id: AgentId) -> Option<&ArenaAgent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Look up an agent by id, mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut ArenaAgent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    /// Look up an agent by id or fail.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AgentNotFound`] for unknown ids.
    pub fn require(&self, id: AgentId) -> Result<&ArenaAgent, AgentError> {
        self.get(id).ok_or(AgentError::AgentNotFound(id))
    }

    /// Resolve a name to an agent id.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownName`] when nobody carries the name.
    pub fn id_by_name(&self, name: &str) -> Result<AgentId, AgentError> {
        self.agents
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.id)
            .ok_or_else(|| AgentError::UnknownName(name.to_owned()))
    }

    /// Roster index of an agent, used for tie-breaks.
    pub fn position_of(&self, id: AgentId) -> Option<usize> {
        self.agents.iter().position(|a| a.id == id)
    }

    /// Snapshots of every agent in roster order.
    pub fn snapshots(&self, buffs: &BTreeMap<AgentId, Vec<ItemBuff>>) -> Vec<AgentSnapshot> {
        self.agents
            .iter()
            .map(|a| a.snapshot(buffs.get(&a.id).map_or(&[], Vec::as_slice)))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_is_full_and_ready() {
        let agent = ArenaAgent::new("Ares", AgentClass::Warrior);
        assert_eq!(agent.hp(), DEFAULT_MAX_HP);
        assert!(agent.is_alive());
        assert_eq!(agent.skill.cooldown_remaining, 0);
        assert_eq!(agent.skill.kind, AgentClass::Warrior.skill());
    }

    #[test]
    fn hp_is_clamped() {
        let mut agent = ArenaAgent::new("Ares", AgentClass::Warrior);
        assert_eq!(agent.apply_hp_delta(500), 0);
        assert_eq!(agent.apply_hp_delta(-300), -300);
        assert_eq!(agent.hp(), 700);
        assert_eq!(agent.apply_hp_delta(-5000), -700);
        assert_eq!(agent.hp(), 0);
        assert!(!agent.is_alive());
        agent.set_hp(9999);
        assert_eq!(agent.hp(), DEFAULT_MAX_HP);
    }

    #[test]
    fn elimination_is_terminal() {
        let mut agent = ArenaAgent::new("Ares", AgentClass::Warrior);
        agent.position = Some(HexCoord::new(3, 0));
        agent.mark_eliminated();
        assert!(!agent.is_alive());
        assert!(agent.is_eliminated());
        assert_eq!(agent.position, None);
        agent.set_hp(100);
        assert!(!agent.is_alive());
    }

    #[test]
    fn roster_rejects_duplicates_and_overflow() {
        let mut roster = Roster::new();
        roster.add(ArenaAgent::new("A", AgentClass::Warrior)).unwrap();
        assert!(matches!(
            roster.add(ArenaAgent::new("A", AgentClass::Trader)),
            Err(AgentError::DuplicateName(_))
        ));
        for i in 1..MAX_AGENTS {
            roster
                .add(ArenaAgent::new(format!("n{i}"), AgentClass::Gambler))
                .unwrap();
        }
        assert!(matches!(
            roster.add(ArenaAgent::new("late", AgentClass::Survivor)),
            Err(AgentError::RosterFull { max: MAX_AGENTS })
        ));
    }

    #[test]
    fn lookup_by_name() {
        let mut roster = Roster::new();
        let id = roster.add(ArenaAgent::new("Vex", AgentClass::Parasite)).unwrap();
        assert_eq!(roster.id_by_name("Vex").unwrap(), id);
        assert!(roster.id_by_name("Nobody").is_err());
        assert_eq!(roster.position_of(id), Some(0));
    }
}
