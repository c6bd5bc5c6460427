//! Battle lifecycle: roster, grid ownership, eliminations, and winner.
//!
//! # State machine
//!
//! ```text
//! classic:      PENDING -> BETTING_OPEN -> ACTIVE -> COMPLETED
//! multiplayer:  LOBBY -> COUNTDOWN -> ACTIVE -> COMPLETED
//!               LOBBY | COUNTDOWN -> CANCELLED
//! ```
//!
//! Every transition checks the current state and reports a violation as
//! [`ArenaError::InvalidTransition`] naming the actual and expected
//! states. Starting a battle computes the phase windows from the final
//! agent count and seeds the cornucopia.

use std::collections::BTreeMap;

use hexarena_agents::{AgentError, ArenaAgent, Roster};
use hexarena_types::{
    AgentId, BattleId, BattleState, BattleStatus, DeathCause, EliminationRecord, ItemBuff,
    PhaseConfig, PhaseEntry, WinnerRecord,
};
use hexarena_world::{Grid, ItemIdAllocator, serialize_grid, spawn_cornucopia_items};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::{debug, info};

use crate::phase::{compute_phase_config, get_current_phase};

/// Errors raised by battle lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// An operation was called from the wrong state.
    #[error("cannot {operation} while {actual}; expected one of {expected:?}")]
    InvalidTransition {
        /// The attempted operation.
        operation: &'static str,
        /// The battle's current state.
        actual: BattleStatus,
        /// States the operation is allowed from.
        expected: &'static [BattleStatus],
    },

    /// Agents were already spawned for this battle.
    #[error("agents already spawned for battle {0}")]
    AlreadySpawned(BattleId),

    /// The operation needs a spawned roster.
    #[error("battle {0} has no agents")]
    NoAgents(BattleId),

    /// The battle has no phase schedule yet.
    #[error("battle {0} has not started")]
    NotStarted(BattleId),

    /// A roster operation failed.
    #[error("roster error: {source}")]
    Agent {
        /// The underlying roster error.
        #[from]
        source: AgentError,
    },
}

/// One battle.
#[derive(Debug, Clone)]
pub struct Battle {
    pub(crate) id: BattleId,
    pub(crate) status: BattleStatus,
    pub(crate) epoch: u64,
    pub(crate) roster: Roster,
    pub(crate) grid: Grid,
    pub(crate) buffs: BTreeMap<AgentId, Vec<ItemBuff>>,
    pub(crate) phase_config: Option<PhaseConfig>,
    pub(crate) eliminations: Vec<EliminationRecord>,
    pub(crate) item_ids: ItemIdAllocator,
    pub(crate) rng: StdRng,
    pub(crate) winner: Option<WinnerRecord>,
}

impl Battle {
    /// A classic battle in `PENDING`.
    pub fn new(grid_radius: u32, seed: u64) -> Self {
        Self::with_status(grid_radius, seed, BattleStatus::Pending)
    }

    /// A multiplayer battle in `LOBBY`.
    pub fn new_lobby(grid_radius: u32, seed: u64) -> Self {
        Self::with_status(grid_radius, seed, BattleStatus::Lobby)
    }

    fn with_status(grid_radius: u32, seed: u64, status: BattleStatus) -> Self {
        let id = BattleId::new();
        debug!(%id, grid_radius, seed, %status, "Battle created");
        Self {
            id,
            status,
            epoch: 0,
            roster: Roster::new(),
            grid: Grid::new(grid_radius),
            buffs: BTreeMap::new(),
            phase_config: None,
            eliminations: Vec::new(),
            item_ids: ItemIdAllocator::new(),
            rng: StdRng::seed_from_u64(seed),
            winner: None,
        }
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// Battle identifier.
    pub const fn id(&self) -> BattleId {
        self.id
    }

    /// Lifecycle state.
    pub const fn status(&self) -> BattleStatus {
        self.status
    }

    /// Epochs processed so far.
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// All agents.
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// All agents, mutably.
    pub const fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    /// The grid.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Active buffs per agent.
    pub const fn buffs(&self) -> &BTreeMap<AgentId, Vec<ItemBuff>> {
        &self.buffs
    }

    /// Phase windows, once started.
    pub const fn phase_config(&self) -> Option<&PhaseConfig> {
        self.phase_config.as_ref()
    }

    /// The phase of the current epoch, once started.
    pub fn current_phase(&self) -> Option<&PhaseEntry> {
        get_current_phase(self.epoch.max(1), self.phase_config.as_ref()?)
    }

    /// Eliminations in order.
    pub fn eliminations(&self) -> &[EliminationRecord] {
        &self.eliminations
    }

    /// The winner, once decided.
    pub const fn winner(&self) -> Option<&WinnerRecord> {
        self.winner.as_ref()
    }

    // -------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------

    fn require(
        &self,
        operation: &'static str,
        expected: &'static [BattleStatus],
    ) -> Result<(), ArenaError> {
        if expected.contains(&self.status) {
            Ok(())
        } else {
            Err(ArenaError::InvalidTransition {
                operation,
                actual: self.status,
                expected,
            })
        }
    }

    fn require_agents(&self) -> Result<(), ArenaError> {
        if self.roster.is_empty() {
            Err(ArenaError::NoAgents(self.id))
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, to: BattleStatus) {
        info!(battle_id = %self.id, from = %self.status, %to, "Battle transition");
        self.status = to;
    }

    /// Add agents to a `PENDING` battle and place them on the outer ring.
    ///
    /// Only allowed once.
    pub fn spawn_agents(&mut self, agents: Vec<ArenaAgent>) -> Result<(), ArenaError> {
        self.require("spawn agents", &[BattleStatus::Pending])?;
        self.place_roster(agents)
    }

    /// Add lobby players to a `LOBBY` or `COUNTDOWN` battle.
    ///
    /// Only allowed once.
    pub fn spawn_from_lobby(&mut self, agents: Vec<ArenaAgent>) -> Result<(), ArenaError> {
        self.require("spawn from lobby", &[
            BattleStatus::Lobby,
            BattleStatus::Countdown,
        ])?;
        self.place_roster(agents)
    }

    /// Shuffle the outer ring and deal positions round-robin.
    fn place_roster(&mut self, agents: Vec<ArenaAgent>) -> Result<(), ArenaError> {
        if !self.roster.is_empty() {
            return Err(ArenaError::AlreadySpawned(self.id));
        }
        if agents.is_empty() {
            return Err(ArenaError::NoAgents(self.id));
        }

        let mut roster = Roster::new();
        for agent in agents {
            roster.add(agent)?;
        }

        let mut spawn_tiles = self.grid.outer_ring_tiles();
        spawn_tiles.shuffle(&mut self.rng);
        let mut grid = self.grid.clone();
        for (agent, coord) in roster.iter_mut().zip(spawn_tiles.iter().cycle()) {
            agent.position = Some(*coord);
            grid = grid.place_agent(agent.id, *coord);
        }

        info!(battle_id = %self.id, agents = roster.len(), "Agents spawned");
        self.roster = roster;
        self.grid = grid;
        Ok(())
    }

    /// `PENDING -> BETTING_OPEN`. Requires spawned agents.
    pub fn open_betting(&mut self) -> Result<(), ArenaError> {
        self.require("open betting", &[BattleStatus::Pending])?;
        self.require_agents()?;
        self.transition(BattleStatus::BettingOpen);
        Ok(())
    }

    /// `LOBBY -> COUNTDOWN`.
    pub fn start_countdown(&mut self) -> Result<(), ArenaError> {
        self.require("start countdown", &[BattleStatus::Lobby])?;
        self.transition(BattleStatus::Countdown);
        Ok(())
    }

    /// `BETTING_OPEN -> ACTIVE`.
    pub fn start_battle(&mut self) -> Result<(), ArenaError> {
        self.require("start battle", &[BattleStatus::BettingOpen])?;
        self.begin()
    }

    /// `PENDING | BETTING_OPEN -> ACTIVE`, skipping the betting window.
    pub fn start_battle_immediate(&mut self) -> Result<(), ArenaError> {
        self.require("start battle immediately", &[
            BattleStatus::Pending,
            BattleStatus::BettingOpen,
        ])?;
        self.begin()
    }

    /// `LOBBY | COUNTDOWN -> ACTIVE`.
    pub fn start_battle_from_lobby(&mut self) -> Result<(), ArenaError> {
        self.require("start battle from lobby", &[
            BattleStatus::Lobby,
            BattleStatus::Countdown,
        ])?;
        self.begin()
    }

    fn begin(&mut self) -> Result<(), ArenaError> {
        self.require_agents()?;
        let config = compute_phase_config(self.roster.len());
        let (grid, items) = spawn_cornucopia_items(&self.grid, &mut self.item_ids, &mut self.rng);
        info!(
            battle_id = %self.id,
            agents = self.roster.len(),
            total_epochs = config.total_epochs,
            cornucopia_items = items.len(),
            "Battle starting"
        );
        self.grid = grid;
        self.phase_config = Some(config);
        self.transition(BattleStatus::Active);
        Ok(())
    }

    /// `LOBBY | COUNTDOWN -> CANCELLED`.
    pub fn cancel_battle(&mut self) -> Result<(), ArenaError> {
        self.require("cancel battle", &[
            BattleStatus::Lobby,
            BattleStatus::Countdown,
        ])?;
        self.transition(BattleStatus::Cancelled);
        Ok(())
    }

    /// `ACTIVE -> COMPLETED`.
    ///
    /// Decides the winner if that has not happened yet. With more than one
    /// survivor (an epoch cap was hit) the healthiest survivor wins, ties
    /// going to kills and then roster order.
    pub fn complete(&mut self) -> Result<Option<&WinnerRecord>, ArenaError> {
        self.require("complete battle", &[BattleStatus::Active])?;
        if self.winner.is_none() {
            self.winner = self.get_winner().or_else(|| self.leader());
        }
        self.transition(BattleStatus::Completed);
        Ok(self.winner.as_ref())
    }

    // -------------------------------------------------------------------
    // Eliminations and outcome
    // -------------------------------------------------------------------

    /// Remove an agent from the battle and record the elimination.
    ///
    /// Idempotent: a second call for the same agent changes nothing and
    /// returns `None`.
    pub fn eliminate_agent(
        &mut self,
        agent_id: AgentId,
        cause: DeathCause,
        killer_id: Option<AgentId>,
        final_words: String,
    ) -> Option<&EliminationRecord> {
        if self.eliminations.iter().any(|e| e.agent_id == agent_id) {
            return None;
        }
        let agent = self.roster.get_mut(agent_id)?;
        agent.mark_eliminated();
        let (agent_name, class) = (agent.name.clone(), agent.class);

        self.grid = self.grid.remove_agent(agent_id);
        self.buffs.remove(&agent_id);

        let remaining = u32::try_from(self.roster.living_count()).unwrap_or(u32::MAX);
        let record = EliminationRecord {
            agent_id,
            agent_name,
            class,
            epoch: self.epoch,
            cause,
            killer_id,
            final_words,
            placement: remaining.saturating_add(1),
        };
        info!(
            battle_id = %self.id,
            agent = %record.agent_name,
            %cause,
            epoch = self.epoch,
            placement = record.placement,
            "Agent eliminated"
        );
        self.eliminations.push(record);
        self.eliminations.last()
    }

    /// Whether at most one agent is left, or the battle is over.
    pub fn is_complete(&self) -> bool {
        self.status.is_terminal() || self.roster.living_count() <= 1
    }

    /// Decide the winner, if the battle has one.
    ///
    /// The sole survivor wins. If nobody survives, the agents that went
    /// down in the last epoch are ranked by kills, with a random pick among
    /// ties. A decided winner is kept.
    pub fn get_winner(&mut self) -> Option<WinnerRecord> {
        if let Some(winner) = &self.winner {
            return Some(winner.clone());
        }
        let living: Vec<&ArenaAgent> = self.roster.living().collect();
        match living.as_slice() {
            [sole] => return Some(winner_record(sole)),
            [] => {}
            _ => return None,
        }

        let epoch = self.epoch;
        let finalists: Vec<&ArenaAgent> = self
            .roster
            .iter()
            .filter(|a| {
                self.eliminations
                    .iter()
                    .find(|e| e.agent_id == a.id)
                    .is_none_or(|e| e.epoch == epoch)
            })
            .collect();
        let top_kills = finalists.iter().map(|a| a.kills).max()?;
        let tied: Vec<&ArenaAgent> = finalists
            .into_iter()
            .filter(|a| a.kills == top_kills)
            .collect();
        let chosen = tied.choose(&mut self.rng).map(|a| winner_record(a));
        if let Some(w) = &chosen {
            info!(battle_id = %self.id, winner = %w.agent_name, kills = w.kills, "No survivors, winner by kills");
        }
        self.winner.clone_from(&chosen);
        chosen
    }

    /// The healthiest living agent; kills, then roster order, break ties.
    fn leader(&self) -> Option<WinnerRecord> {
        let mut best: Option<&ArenaAgent> = None;
        for agent in self.roster.living() {
            let better = best.is_none_or(|b| (agent.hp(), agent.kills) > (b.hp(), b.kills));
            if better {
                best = Some(agent);
            }
        }
        best.map(winner_record)
    }

    /// Serializable snapshot of the battle.
    pub fn state(&self) -> BattleState {
        BattleState {
            battle_id: self.id,
            status: self.status,
            epoch: self.epoch,
            phase: self.current_phase().map(|p| p.name),
            phase_config: self.phase_config.clone(),
            agents: self.roster.snapshots(&self.buffs),
            grid: serialize_grid(&self.grid),
            eliminations: self.eliminations.clone(),
            winner: self.winner.clone(),
        }
    }
}

fn winner_record(agent: &ArenaAgent) -> WinnerRecord {
    WinnerRecord {
        agent_id: agent.id,
        agent_name: agent.name.clone(),
        class: agent.class,
        hp: agent.hp(),
        kills: agent.kills,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use hexarena_types::{AgentClass, TileType};

    use super::*;

    fn five() -> Vec<ArenaAgent> {
        AgentClass::ALL
            .iter()
            .map(|c| ArenaAgent::new(format!("{c}"), *c))
            .collect()
    }

    #[test]
    fn classic_flow() {
        let mut battle = Battle::new(3, 1);
        assert!(matches!(
            battle.open_betting(),
            Err(ArenaError::NoAgents(_))
        ));
        battle.spawn_agents(five()).unwrap();
        battle.open_betting().unwrap();
        battle.start_battle().unwrap();
        assert_eq!(battle.status(), BattleStatus::Active);
        assert_eq!(battle.phase_config().unwrap().total_epochs, 16);
    }

    #[test]
    fn spawn_only_once() {
        let mut battle = Battle::new(3, 1);
        battle.spawn_agents(five()).unwrap();
        assert!(matches!(
            battle.spawn_agents(five()),
            Err(ArenaError::AlreadySpawned(_))
        ));
    }

    #[test]
    fn guard_violation_names_states() {
        let mut battle = Battle::new(3, 1);
        let err = battle.cancel_battle().unwrap_err();
        assert!(matches!(
            err,
            ArenaError::InvalidTransition {
                actual: BattleStatus::Pending,
                expected,
                ..
            } if expected.contains(&BattleStatus::Lobby)
        ));
        assert!(err.to_string().contains("PENDING"));
    }

    #[test]
    fn lobby_flow_and_cancel() {
        let mut battle = Battle::new_lobby(3, 1);
        battle.start_countdown().unwrap();
        battle.spawn_from_lobby(five()).unwrap();
        battle.start_battle_from_lobby().unwrap();
        assert_eq!(battle.status(), BattleStatus::Active);

        let mut abandoned = Battle::new_lobby(3, 1);
        abandoned.cancel_battle().unwrap();
        assert_eq!(abandoned.status(), BattleStatus::Cancelled);
        assert!(abandoned.start_countdown().is_err());
    }

    #[test]
    fn agents_spawn_on_outer_ring() {
        let mut battle = Battle::new(3, 7);
        battle.spawn_agents(five()).unwrap();
        for agent in battle.roster().iter() {
            let pos = agent.position.unwrap();
            assert_eq!(pos.ring(), 3);
            assert_eq!(battle.grid().occupant(pos), Some(agent.id));
        }
    }

    #[test]
    fn start_seeds_cornucopia() {
        let mut battle = Battle::new(3, 7);
        battle.spawn_agents(five()).unwrap();
        battle.start_battle_immediate().unwrap();
        for c in battle.grid().tiles_of_type(TileType::Cornucopia) {
            assert_eq!(battle.grid().tile(c).unwrap().items.len(), 1);
        }
    }

    #[test]
    fn small_arena_keeps_spawn_tiles_clear() {
        let mut battle = Battle::new(1, 7);
        battle.spawn_agents(five()).unwrap();
        battle.start_battle_immediate().unwrap();
        for agent in battle.roster().iter() {
            let tile = battle.grid().tile(agent.position.unwrap()).unwrap();
            assert!(tile.items.is_empty());
        }
        let stocked = battle
            .grid()
            .tiles()
            .filter(|t| !t.items.is_empty())
            .count();
        assert_eq!(stocked, 2);
    }

    #[test]
    fn elimination_is_idempotent() {
        let mut battle = Battle::new(3, 7);
        battle.spawn_agents(five()).unwrap();
        battle.start_battle_immediate().unwrap();
        let id = battle.roster().iter().next().unwrap().id;

        let record = battle
            .eliminate_agent(id, DeathCause::Bleed, None, "bye".into())
            .unwrap();
        assert_eq!(record.placement, 5);
        assert!(battle
            .eliminate_agent(id, DeathCause::Combat, None, "again".into())
            .is_none());
        assert_eq!(battle.eliminations().len(), 1);
        assert!(battle.grid().position_of(id).is_none());
        assert!(!battle.roster().get(id).unwrap().is_alive());
    }

    #[test]
    fn sole_survivor_wins() {
        let mut battle = Battle::new(3, 7);
        battle.spawn_agents(five()).unwrap();
        battle.start_battle_immediate().unwrap();
        let ids = battle.roster().living_ids();
        for id in &ids[1..] {
            battle.eliminate_agent(*id, DeathCause::Bleed, None, String::new());
        }
        assert!(battle.is_complete());
        assert_eq!(battle.get_winner().unwrap().agent_id, ids[0]);
        battle.complete().unwrap();
        assert_eq!(battle.status(), BattleStatus::Completed);
    }

    #[test]
    fn simultaneous_death_goes_to_most_kills() {
        let mut battle = Battle::new(3, 7);
        battle.spawn_agents(five()).unwrap();
        battle.start_battle_immediate().unwrap();
        let ids = battle.roster().living_ids();
        for (kills, id) in ids.iter().enumerate() {
            let agent = battle.roster_mut().get_mut(*id).unwrap();
            agent.kills = u32::try_from(kills).unwrap();
            agent.set_hp(0);
        }
        assert!(battle.is_complete());
        assert_eq!(battle.get_winner().unwrap().agent_id, ids[4]);
    }

    #[test]
    fn epoch_cap_completion_picks_healthiest() {
        let mut battle = Battle::new(3, 7);
        battle.spawn_agents(five()).unwrap();
        battle.start_battle_immediate().unwrap();
        let ids = battle.roster().living_ids();
        battle.roster_mut().get_mut(ids[2]).unwrap().apply_hp_delta(-10);
        battle.roster_mut().get_mut(ids[0]).unwrap().apply_hp_delta(-5);
        for id in &ids[2..] {
            battle.roster_mut().get_mut(*id).unwrap().apply_hp_delta(-100);
        }
        let winner = battle.complete().unwrap().unwrap();
        assert_eq!(winner.agent_id, ids[1]);
    }

    #[test]
    fn state_snapshot() {
        let mut battle = Battle::new(2, 7);
        battle.spawn_agents(five()).unwrap();
        let state = battle.state();
        assert_eq!(state.status, BattleStatus::Pending);
        assert_eq!(state.agents.len(), 5);
        assert_eq!(state.grid.tiles.len(), 19);
        assert!(state.phase.is_none());
    }
}
