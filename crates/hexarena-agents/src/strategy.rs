//! Built-in scripted strategies, one per class.
//!
//! Each class reads an [`ArenaView`] and produces an [`AgentActions`]
//! set. The strategies are deliberately simple rule lists: they exist so
//! a battle can run end to end without an external decision provider.
//!
//! | Class    | Movement                    | Prediction | Combat                         | Skill                       |
//! |----------|-----------------------------|------------|--------------------------------|-----------------------------|
//! | Warrior  | toward nearest enemy        | 10%        | weakest adjacent enemy, 30%    | with every attack           |
//! | Trader   | toward loot                 | 25%        | defends when threatened        | whenever ready              |
//! | Survivor | toward loot, away from foes | 5%         | defends when threatened        | below 40% HP and threatened |
//! | Parasite | toward loot                 | 10%        | weakest adjacent non-ally, 20% | with every attack           |
//! | Gambler  | random step                 | 50%        | none                           | whenever ready              |
//!
//! Every class leaves the storm first when it stands in it.

use hexarena_types::{
    AgentActions, AgentClass, AgentSnapshot, AllianceIntent, Asset, AttackIntent, Direction,
    HexCoord, MarketSnapshot, PhaseName, PredictionIntent,
};
use hexarena_world::Grid;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::skills;

/// What an agent can see when deciding.
#[derive(Debug, Clone)]
pub struct ArenaView {
    /// The deciding agent.
    pub me: AgentSnapshot,
    /// Every other living agent.
    pub others: Vec<AgentSnapshot>,
    /// The current grid.
    pub grid: Grid,
    /// Current phase.
    pub phase: PhaseName,
    /// Whether attacks resolve this phase.
    pub combat_enabled: bool,
    /// Epoch being decided.
    pub epoch: u64,
    /// Last market snapshot, if any.
    pub market: Option<MarketSnapshot>,
}

impl ArenaView {
    fn is_enemy(&self, other: &AgentSnapshot) -> bool {
        other.is_alive && self.me.ally_id != Some(other.id)
    }

    /// Living non-allies standing next to the agent.
    pub fn adjacent_enemies(&self) -> Vec<&AgentSnapshot> {
        let Some(pos) = self.me.position else {
            return Vec::new();
        };
        self.others
            .iter()
            .filter(|o| self.is_enemy(o))
            .filter(|o| o.position.is_some_and(|p| Grid::is_adjacent(pos, p)))
            .collect()
    }

    /// The closest living non-ally.
    pub fn nearest_enemy(&self) -> Option<&AgentSnapshot> {
        let pos = self.me.position?;
        self.others
            .iter()
            .filter(|o| self.is_enemy(o))
            .filter_map(|o| o.position.map(|p| (o, pos.distance(p))))
            .min_by_key(|&(_, d)| d)
            .map(|(o, _)| o)
    }

    /// The first step of a shortest path toward `goal`, if that step is free.
    pub fn step_toward(&self, goal: HexCoord) -> Option<HexCoord> {
        let pos = self.me.position?;
        let path = self.grid.find_path(pos, goal, true)?;
        let next = *path.get(1)?;
        self.grid.occupant(next).is_none().then_some(next)
    }

    /// A step out of the storm, if the agent stands in it.
    pub fn storm_escape(&self) -> Option<HexCoord> {
        let pos = self.me.position?;
        if !self.grid.is_storm_tile(pos, self.phase) {
            return None;
        }
        let safe = self.grid.safe_tiles(self.phase);
        let goal = Grid::closest_to(pos, &safe)?;
        self.step_toward(goal)
    }

    /// A step toward the nearest loot.
    pub fn loot_step(&self) -> Option<HexCoord> {
        let pos = self.me.position?;
        let goal = self.grid.find_nearest_item_tile(pos)?;
        self.step_toward(goal)
    }

    fn skill_ready(&self) -> bool {
        skills::is_ready(&self.me.skill)
    }

    fn hp_percent(&self, percent: u32) -> u32 {
        let value = u64::from(self.me.hp).saturating_mul(u64::from(percent)) / 100;
        u32::try_from(value).unwrap_or(self.me.hp)
    }
}

fn random_prediction(rng: &mut impl Rng, stake_percent: u32) -> Option<PredictionIntent> {
    let asset = *Asset::ALL.choose(rng)?;
    let direction = if rng.random_bool(0.5) {
        Direction::Up
    } else {
        Direction::Down
    };
    Some(PredictionIntent {
        asset,
        direction,
        stake_percent,
    })
}

/// Decide actions for the viewing agent with its class strategy.
pub fn scripted_actions(view: &ArenaView, rng: &mut impl Rng) -> AgentActions {
    match view.me.class {
        AgentClass::Warrior => warrior(view, rng),
        AgentClass::Trader => trader(view, rng),
        AgentClass::Survivor => survivor(view, rng),
        AgentClass::Parasite => parasite(view, rng),
        AgentClass::Gambler => gambler(view, rng),
    }
}

fn warrior(view: &ArenaView, rng: &mut impl Rng) -> AgentActions {
    let mut actions = AgentActions {
        prediction: random_prediction(rng, 10),
        ..AgentActions::default()
    };

    if let Some(step) = view.storm_escape() {
        actions.movement = Some(step);
        actions.reasoning = "Getting out of the storm.".to_owned();
        return actions;
    }

    if view.combat_enabled {
        let weakest = view.adjacent_enemies().into_iter().min_by_key(|o| o.hp);
        if let Some(target) = weakest {
            actions.attack = Some(AttackIntent {
                target_name: target.name.clone(),
                stake: view.hp_percent(30),
            });
            actions.use_skill = view.skill_ready();
            actions.reasoning = format!("{} is within reach.", target.name);
            return actions;
        }
        if let Some(enemy) = view.nearest_enemy() {
            actions.movement = enemy.position.and_then(|p| view.step_toward(p));
            actions.reasoning = format!("Hunting {}.", enemy.name);
            return actions;
        }
    }

    actions.movement = view.loot_step();
    actions.reasoning = "Arming up before the fight.".to_owned();
    actions
}

fn trader(view: &ArenaView, rng: &mut impl Rng) -> AgentActions {
    let threatened = view.combat_enabled && !view.adjacent_enemies().is_empty();
    AgentActions {
        movement: view.storm_escape().or_else(|| view.loot_step()),
        prediction: random_prediction(rng, 25),
        defend: threatened,
        use_skill: view.skill_ready(),
        reasoning: "Reading the tape.".to_owned(),
        ..AgentActions::default()
    }
}

fn survivor(view: &ArenaView, rng: &mut impl Rng) -> AgentActions {
    let threatened = view.combat_enabled && !view.adjacent_enemies().is_empty();
    let low = view.me.hp.saturating_mul(10) < view.me.max_hp.saturating_mul(4);

    let movement = view.storm_escape().or_else(|| {
        if threatened {
            // Any free neighbor that is not itself next to an enemy.
            let pos = view.me.position?;
            view.grid
                .neighbors(pos)
                .into_iter()
                .filter(|n| view.grid.occupant(*n).is_none())
                .filter(|n| !view.grid.is_storm_tile(*n, view.phase))
                .find(|n| {
                    !view
                        .others
                        .iter()
                        .filter_map(|o| o.position)
                        .any(|p| Grid::is_adjacent(*n, p))
                })
        } else {
            view.loot_step()
        }
    });

    AgentActions {
        movement,
        prediction: random_prediction(rng, 5),
        defend: threatened,
        use_skill: threatened && low && view.skill_ready(),
        reasoning: "Staying alive.".to_owned(),
        ..AgentActions::default()
    }
}

fn parasite(view: &ArenaView, rng: &mut impl Rng) -> AgentActions {
    let mut actions = AgentActions {
        movement: view.storm_escape().or_else(|| view.loot_step()),
        prediction: random_prediction(rng, 10),
        reasoning: "Looking for a host.".to_owned(),
        ..AgentActions::default()
    };

    if view.me.ally_id.is_none() {
        let strongest = view.others.iter().filter(|o| o.is_alive).max_by_key(|o| o.hp);
        actions.alliance = strongest.map(|o| AllianceIntent::Propose {
            target_name: o.name.clone(),
        });
    }

    if view.combat_enabled {
        let weakest = view.adjacent_enemies().into_iter().min_by_key(|o| o.hp);
        if let Some(target) = weakest {
            actions.attack = Some(AttackIntent {
                target_name: target.name.clone(),
                stake: view.hp_percent(20),
            });
            actions.use_skill = view.skill_ready();
            actions.reasoning = format!("Feeding on {}.", target.name);
        }
    }
    actions
}

fn gambler(view: &ArenaView, rng: &mut impl Rng) -> AgentActions {
    let movement = view.storm_escape().or_else(|| {
        let pos = view.me.position?;
        let free: Vec<HexCoord> = view
            .grid
            .neighbors(pos)
            .into_iter()
            .filter(|n| view.grid.occupant(*n).is_none())
            .collect();
        free.choose(rng).copied()
    });
    AgentActions {
        movement,
        prediction: random_prediction(rng, 50),
        use_skill: view.skill_ready(),
        reasoning: "Fortune favors the bold.".to_owned(),
        ..AgentActions::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::agent::ArenaAgent;

    fn snapshot(name: &str, class: AgentClass, at: HexCoord) -> AgentSnapshot {
        let mut agent = ArenaAgent::new(name, class);
        agent.position = Some(at);
        agent.snapshot(&[])
    }

    fn view(me: AgentSnapshot, others: Vec<AgentSnapshot>, phase: PhaseName) -> ArenaView {
        let mut grid = Grid::new(3);
        for a in std::iter::once(&me).chain(&others) {
            if let Some(p) = a.position {
                grid = grid.place_agent(a.id, p);
            }
        }
        ArenaView {
            me,
            others,
            grid,
            phase,
            combat_enabled: phase != PhaseName::Loot,
            epoch: 5,
            market: None,
        }
    }

    #[test]
    fn warrior_attacks_adjacent_enemy() {
        let me = snapshot("Ares", AgentClass::Warrior, HexCoord::new(1, 0));
        let foe = snapshot("Vex", AgentClass::Parasite, HexCoord::new(2, 0));
        let v = view(me, vec![foe], PhaseName::Blood);
        let actions = scripted_actions(&v, &mut StdRng::seed_from_u64(1));
        let attack = actions.attack.unwrap();
        assert_eq!(attack.target_name, "Vex");
        assert_eq!(attack.stake, 300);
        assert!(actions.use_skill);
    }

    #[test]
    fn nobody_attacks_during_loot() {
        let me = snapshot("Ares", AgentClass::Warrior, HexCoord::new(1, 0));
        let foe = snapshot("Vex", AgentClass::Parasite, HexCoord::new(2, 0));
        let v = view(me, vec![foe], PhaseName::Loot);
        assert!(scripted_actions(&v, &mut StdRng::seed_from_u64(1)).attack.is_none());
    }

    #[test]
    fn storm_escape_moves_inward() {
        let me = snapshot("Sol", AgentClass::Trader, HexCoord::new(3, 0));
        let v = view(me, Vec::new(), PhaseName::Blood);
        let step = v.storm_escape().unwrap();
        assert!(step.ring() < 3);
    }

    #[test]
    fn moves_are_adjacent_and_free() {
        let mut rng = StdRng::seed_from_u64(9);
        for class in AgentClass::ALL {
            let me = snapshot("Me", class, HexCoord::new(-3, 1));
            let other = snapshot("Other", AgentClass::Gambler, HexCoord::new(0, 0));
            let v = view(me, vec![other], PhaseName::Hunt);
            if let Some(step) = scripted_actions(&v, &mut rng).movement {
                assert!(Grid::is_adjacent(HexCoord::new(-3, 1), step));
                assert!(v.grid.occupant(step).is_none());
            }
        }
    }

    #[test]
    fn parasite_courts_the_strongest() {
        let me = snapshot("Vex", AgentClass::Parasite, HexCoord::new(0, 3));
        let mut big = snapshot("Big", AgentClass::Warrior, HexCoord::new(-3, 0));
        big.hp = 900;
        let mut small = snapshot("Small", AgentClass::Trader, HexCoord::new(3, -3));
        small.hp = 100;
        let v = view(me, vec![small, big], PhaseName::Loot);
        let actions = scripted_actions(&v, &mut StdRng::seed_from_u64(2));
        assert_eq!(
            actions.alliance,
            Some(AllianceIntent::Propose {
                target_name: "Big".to_owned()
            })
        );
    }
}
