//! Combat and attrition resolution.
//!
//! ## Combat flow
//!
//! 1. Every defending agent pays the defend cost, attacked or not. Free
//!    defends (shield buff, sponsor) and fortified agents pay nothing.
//! 2. Each attack is resolved independently against the HP values passed
//!    in, never against the output of another attack:
//!    - dead or unknown attacker or target: skipped
//!    - stake clamped to the attacker's HP
//!    - defended target: the attacker loses the stake, the defender gains it
//!    - undefended target: the attacker steals `min(stake, target hp)`
//! 3. A fortified side cannot lose HP; a transfer it would pay is cancelled
//!    on both sides.
//!
//! Both resolvers are pure. The caller applies the returned deltas.

use std::collections::BTreeMap;

use hexarena_types::{AgentId, BleedResult, CombatResult, DefendCost};

/// Default share of current HP paid to defend, in percent.
pub const DEFAULT_DEFEND_COST_PERCENT: u32 = 5;

/// Default share of current HP lost to bleed each epoch, in percent.
pub const DEFAULT_BLEED_PERCENT: u32 = 2;

/// Combat-relevant state of one agent at the start of resolution.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combatant {
    /// Current HP.
    pub hp: u32,
    /// Whether the agent is alive.
    pub is_alive: bool,
    /// Whether attacks against the agent are absorbed.
    pub defending: bool,
    /// Whether the defend is free of charge.
    pub free_defend: bool,
    /// Whether the agent is immune to HP loss this epoch.
    pub loss_immunity: bool,
}

/// A declared attack with its target resolved to an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attack {
    /// Attacker.
    pub attacker_id: AgentId,
    /// Target.
    pub target_id: AgentId,
    /// Stake after modifiers, before clamping to the attacker's HP.
    pub stake: u32,
    /// Whether the target is the attacker's ally.
    pub betrayal: bool,
}

/// Output of [`resolve_combat`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatResolution {
    /// One entry per resolved attack, in input order.
    pub results: Vec<CombatResult>,
    /// One entry per paying defender.
    pub defend_costs: Vec<DefendCost>,
}

/// Stake modifiers applied to a declared attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeModifiers {
    /// Double the stake (berserk).
    pub double: bool,
    /// Active weapon buffs. Each adds `weapon_bonus_percent`.
    pub weapon_buffs: u32,
    /// Bonus per weapon buff, in percent.
    pub weapon_bonus_percent: u32,
    /// Sponsor attack boost, in percent.
    pub sponsor_boost_percent: u32,
    /// Multiplier applied when attacking an ally. 1 otherwise.
    pub betrayal_multiplier: u32,
}

impl Default for StakeModifiers {
    fn default() -> Self {
        Self {
            double: false,
            weapon_buffs: 0,
            weapon_bonus_percent: 0,
            sponsor_boost_percent: 0,
            betrayal_multiplier: 1,
        }
    }
}

/// Compute the effective stake of an attack.
pub fn effective_attack_stake(base: u32, modifiers: &StakeModifiers) -> u32 {
    let bonus_percent = u64::from(modifiers.weapon_buffs)
        .saturating_mul(u64::from(modifiers.weapon_bonus_percent))
        .saturating_add(u64::from(modifiers.sponsor_boost_percent));
    let base = u64::from(base);
    let mut stake = base.saturating_add(base.saturating_mul(bonus_percent) / 100);
    if modifiers.double {
        stake = stake.saturating_mul(2);
    }
    stake = stake.saturating_mul(u64::from(modifiers.betrayal_multiplier.max(1)));
    u32::try_from(stake).unwrap_or(u32::MAX)
}

/// `percent` of `hp`, rounded down.
fn percent_of(hp: u32, percent: u32) -> u32 {
    let value = u64::from(hp).saturating_mul(u64::from(percent)) / 100;
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Resolve all attacks and defend costs of one epoch.
pub fn resolve_combat(
    attacks: &[Attack],
    combatants: &BTreeMap<AgentId, Combatant>,
    defend_cost_percent: u32,
) -> CombatResolution {
    let defend_costs = combatants
        .iter()
        .filter(|(_, c)| c.is_alive && c.defending && !c.free_defend && !c.loss_immunity)
        .map(|(&agent_id, c)| DefendCost {
            agent_id,
            cost: percent_of(c.hp, defend_cost_percent),
        })
        .collect();

    let mut results = Vec::new();
    for attack in attacks {
        if attack.attacker_id == attack.target_id {
            continue;
        }
        let (Some(attacker), Some(target)) = (
            combatants.get(&attack.attacker_id),
            combatants.get(&attack.target_id),
        ) else {
            continue;
        };
        if !attacker.is_alive || !target.is_alive {
            continue;
        }

        let stake = attack.stake.min(attacker.hp);
        let (attacker_change, target_change) = if target.defending {
            if attacker.loss_immunity {
                (0, 0)
            } else {
                (-i64::from(stake), i64::from(stake))
            }
        } else if target.loss_immunity {
            (0, 0)
        } else {
            let stolen = i64::from(stake.min(target.hp));
            (stolen, -stolen)
        };

        results.push(CombatResult {
            attacker_id: attack.attacker_id,
            target_id: attack.target_id,
            stake,
            defended: target.defending,
            betrayal: attack.betrayal,
            attacker_hp_change: attacker_change,
            target_hp_change: target_change,
        });
    }

    CombatResolution {
        results,
        defend_costs,
    }
}

/// Bleed for one agent: `max(1, floor(hp * percent / 100))`, or zero for
/// an agent with no HP left.
pub fn bleed_amount(hp: u32, percent: u32) -> u32 {
    if hp == 0 {
        return 0;
    }
    percent_of(hp, percent).max(1)
}

/// Attrition input for one living agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BleedInput {
    /// The agent.
    pub agent_id: AgentId,
    /// HP before attrition.
    pub hp: u32,
    /// Whether the agent stands on a storm tile.
    pub in_storm: bool,
}

/// Apply bleed and storm damage to every input.
pub fn apply_bleed(inputs: &[BleedInput], bleed_percent: u32, storm_damage: u32) -> Vec<BleedResult> {
    inputs
        .iter()
        .filter(|i| i.hp > 0)
        .map(|i| {
            let bleed = bleed_amount(i.hp, bleed_percent);
            let storm = if i.in_storm { storm_damage } else { 0 };
            BleedResult {
                agent_id: i.agent_id,
                hp_before: i.hp,
                bleed,
                storm_damage: storm,
                hp_after: i.hp.saturating_sub(bleed).saturating_sub(storm),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn fighter(hp: u32) -> Combatant {
        Combatant {
            hp,
            is_alive: hp > 0,
            defending: false,
            free_defend: false,
            loss_immunity: false,
        }
    }

    fn setup(a: Combatant, b: Combatant) -> (AgentId, AgentId, BTreeMap<AgentId, Combatant>) {
        let (ida, idb) = (AgentId::new(), AgentId::new());
        let mut map = BTreeMap::new();
        map.insert(ida, a);
        map.insert(idb, b);
        (ida, idb, map)
    }

    fn attack(attacker_id: AgentId, target_id: AgentId, stake: u32) -> Attack {
        Attack {
            attacker_id,
            target_id,
            stake,
            betrayal: false,
        }
    }

    #[test]
    fn stake_is_clamped_to_attacker_hp() {
        let (a, b, map) = setup(fighter(10), fighter(500));
        let res = resolve_combat(&[attack(a, b, 100)], &map, 5);
        assert_eq!(res.results[0].stake, 10);
        assert_eq!(res.results[0].attacker_hp_change, 10);
        assert_eq!(res.results[0].target_hp_change, -10);
    }

    #[test]
    fn steal_is_capped_at_target_hp() {
        let (a, b, map) = setup(fighter(500), fighter(30));
        let res = resolve_combat(&[attack(a, b, 200)], &map, 5);
        assert_eq!(res.results[0].target_hp_change, -30);
        assert_eq!(res.results[0].attacker_hp_change, 30);
    }

    #[test]
    fn defended_attack_transfers_stake_to_defender() {
        let defender = Combatant {
            defending: true,
            ..fighter(400)
        };
        let (a, b, map) = setup(fighter(300), defender);
        let res = resolve_combat(&[attack(a, b, 100)], &map, 5);
        let r = &res.results[0];
        assert!(r.defended);
        assert_eq!(r.attacker_hp_change, -100);
        assert_eq!(r.target_hp_change, 100);
        assert_eq!(res.defend_costs.len(), 1);
        assert_eq!(res.defend_costs[0].cost, 20);
    }

    #[test]
    fn defend_cost_is_unconditional_unless_free() {
        let paying = Combatant {
            defending: true,
            ..fighter(1000)
        };
        let free = Combatant {
            defending: true,
            free_defend: true,
            ..fighter(1000)
        };
        let (_, _, map) = setup(paying, free);
        let res = resolve_combat(&[], &map, 5);
        assert_eq!(res.defend_costs.len(), 1);
        assert_eq!(res.defend_costs[0].cost, 50);
    }

    #[test]
    fn dead_participants_are_skipped() {
        let (a, b, map) = setup(fighter(100), fighter(0));
        assert!(resolve_combat(&[attack(a, b, 10), attack(b, a, 10)], &map, 5)
            .results
            .is_empty());
    }

    #[test]
    fn attacks_resolve_against_input_hp() {
        let (a, b, map) = setup(fighter(100), fighter(100));
        let res = resolve_combat(&[attack(a, b, 100), attack(b, a, 100)], &map, 5);
        assert_eq!(res.results.len(), 2);
        assert!(res.results.iter().all(|r| r.attacker_hp_change == 100));
    }

    #[test]
    fn fortified_target_loses_nothing() {
        let fortified = Combatant {
            loss_immunity: true,
            ..fighter(200)
        };
        let (a, b, map) = setup(fighter(300), fortified);
        let res = resolve_combat(&[attack(a, b, 100)], &map, 5);
        assert_eq!(res.results[0].target_hp_change, 0);
        assert_eq!(res.results[0].attacker_hp_change, 0);
    }

    #[test]
    fn stake_modifiers_compound() {
        let m = StakeModifiers {
            double: true,
            weapon_buffs: 2,
            weapon_bonus_percent: 25,
            sponsor_boost_percent: 0,
            betrayal_multiplier: 2,
        };
        // 100 * 1.5 * 2 * 2
        assert_eq!(effective_attack_stake(100, &m), 600);
        assert_eq!(effective_attack_stake(100, &StakeModifiers::default()), 100);
    }

    #[test]
    fn bleed_has_floor_of_one() {
        assert_eq!(bleed_amount(10, 2), 1);
        assert_eq!(bleed_amount(1000, 2), 20);
        assert_eq!(bleed_amount(0, 2), 0);
    }

    #[test]
    fn storm_adds_to_bleed() {
        let id = AgentId::new();
        let out = apply_bleed(
            &[BleedInput {
                agent_id: id,
                hp: 1000,
                in_storm: true,
            }],
            2,
            50,
        );
        assert_eq!(out[0].bleed, 20);
        assert_eq!(out[0].storm_damage, 50);
        assert_eq!(out[0].hp_after, 930);
    }
}
