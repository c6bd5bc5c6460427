//! The epoch orchestrator: one epoch of a battle, start to finish.
//!
//! Each epoch runs through these steps in a fixed order. Later steps read
//! HP written by earlier ones, so the order is part of the game rules.
//!
//! 1. **Market** -- fetch the current snapshot, advance the epoch counter.
//!    The previous snapshot defaults to the current one, so predictions on
//!    the first epoch are flat.
//! 2. **Decisions** -- ask every living agent concurrently. A failed or
//!    panicking decision falls back to [`AgentActions::fallback`].
//! 3. **Movement** -- adjacency and vacancy checks; two or more agents
//!    aiming at the same tile all stay put.
//! 4. **Items** -- traps fire, then the mover picks up what is left.
//! 5. **Sponsors** -- HP boosts, capped at max HP.
//! 6. **Skills and alliances** -- skills with cooldown zero activate;
//!    proposals and breaks resolve in roster order.
//! 7. **Predictions** -- resolved against the two snapshots, with skill
//!    and oracle modifiers.
//! 8. **Combat** -- defend costs, then independent attacks; betrayals
//!    break the pact on both sides.
//! 9. **Loot** -- new items spawn, buffs tick.
//! 10. **Bleed** -- attrition plus storm damage.
//! 11. **Deaths** -- every agent at 0 HP is eliminated with its cause,
//!     killer and final words.
//! 12. **Bookkeeping** -- survival counters, win check, skill cooldowns,
//!     alliance expiry.
//! 13. **Result** -- the full [`EpochResult`].
//!
//! A market failure aborts before step 1 changes anything. Nothing after
//! step 2 can fail except the lifecycle transition on completion.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use futures::FutureExt as _;
use futures::future::join_all;
use hexarena_agents::alliance::{end_alliance, resolve_alliance_intents, tick_alliances};
use hexarena_agents::skills::{self, SkillEffects};
use hexarena_agents::{
    ArenaView, Attack, BleedInput, Combatant, DamageLedger, DamageSource, PredictionInput,
    PredictionModifiers, StakeModifiers, apply_bleed, apply_modifiers, effective_attack_stake,
    fallback_final_words, resolve_combat, resolve_predictions, stake_from_percent,
};
use hexarena_types::{
    AgentActions, AgentId, AllianceEvent, AllianceEventKind, BattleStatus, BleedResult, BuffTick,
    CombatResult, DefendCost, EliminationRecord, EpochResult, HexCoord, Item, ItemPickup,
    ItemType, MarketSnapshot, MoveRejection, MoveResult, PhaseEntry, PredictionResult,
    SkillActivation, SkillKind, SponsorBoost, SponsorEffect, TrapTrigger,
};
use hexarena_world::{
    Grid, ItemConfig, buff_count, check_traps, has_buff, pickup_item, serialize_grid,
    spawn_items, tick_item_buffs,
};
use tracing::{debug, info, warn};

use crate::arena::{ArenaError, Battle};
use crate::config::ArenaConfig;
use crate::decision::{DecisionError, DecisionSource};
use crate::final_words::FinalWords;
use crate::market::{MarketError, MarketSource};
use crate::phase::{detect_phase_transition, get_current_phase};

/// Errors that abort an epoch.
#[derive(Debug, thiserror::Error)]
pub enum EpochError {
    /// The battle is not in a state that processes epochs.
    #[error("arena error: {source}")]
    Arena {
        /// The underlying lifecycle error.
        #[from]
        source: ArenaError,
    },

    /// Market data could not be fetched. No state was changed.
    #[error("market error: {source}")]
    Market {
        /// The underlying market error.
        #[from]
        source: MarketError,
    },
}

/// External collaborators consulted during an epoch.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Price feed.
    pub market: &'a dyn MarketSource,
    /// Agent decisions.
    pub decisions: &'a dyn DecisionSource,
    /// Last-words generator. Canned lines are used when absent.
    pub final_words: Option<&'a dyn FinalWords>,
}

/// Event lists accumulated over one epoch.
#[derive(Default)]
struct EpochLog {
    moves: Vec<MoveResult>,
    pickups: Vec<ItemPickup>,
    traps: Vec<TrapTrigger>,
    spawned_items: Vec<Item>,
    buff_ticks: Vec<BuffTick>,
    sponsor_boosts: Vec<SponsorBoost>,
    skill_activations: Vec<SkillActivation>,
    alliance_events: Vec<AllianceEvent>,
    predictions: Vec<PredictionResult>,
    defend_costs: Vec<DefendCost>,
    combat: Vec<CombatResult>,
    bleed: Vec<BleedResult>,
    deaths: Vec<EliminationRecord>,
    ledger: DamageLedger,
}

/// Run one epoch of an active battle.
///
/// The caller guarantees at most one call in flight per battle.
///
/// # Errors
///
/// Returns [`EpochError::Arena`] if the battle is not `ACTIVE`, and
/// [`EpochError::Market`] if the market fetch fails. In both cases the
/// battle is left untouched.
pub async fn process_epoch(
    battle: &mut Battle,
    collaborators: &Collaborators<'_>,
    previous_market: Option<&MarketSnapshot>,
    sponsor_effects: &BTreeMap<AgentId, SponsorEffect>,
    config: &ArenaConfig,
) -> Result<EpochResult, EpochError> {
    if battle.status != BattleStatus::Active {
        return Err(ArenaError::InvalidTransition {
            operation: "process epoch",
            actual: battle.status,
            expected: &[BattleStatus::Active],
        }
        .into());
    }
    let phase_config = battle
        .phase_config
        .clone()
        .ok_or(ArenaError::NotStarted(battle.id))?;
    let epoch = battle.epoch.saturating_add(1);
    let phase = get_current_phase(epoch, &phase_config)
        .cloned()
        .ok_or(ArenaError::NotStarted(battle.id))?;

    // --- 1. Market ---
    let market = collaborators.market.fetch_prices().await?;
    let previous = previous_market.cloned().unwrap_or_else(|| market.clone());
    let previous_epoch = battle.epoch;
    battle.epoch = epoch;
    let phase_transition = detect_phase_transition(previous_epoch, epoch, &phase_config);
    if let Some(t) = &phase_transition {
        info!(battle_id = %battle.id, epoch, from = ?t.from, to = ?t.to, "Phase transition");
    }

    // --- 2. Decisions ---
    let views = build_views(battle, &phase, epoch, previous_market);
    let decisions = collect_decisions(collaborators.decisions, views).await;
    let order = battle.roster.living_ids();

    let item_config = config.item_config();
    let mut log = EpochLog::default();

    // --- 3. Movement, 4. Items ---
    let movers = resolve_movement(battle, &order, &decisions, &mut log);
    resolve_items(battle, &movers, &item_config, &mut log);

    // --- 5. Sponsors ---
    apply_sponsors(battle, sponsor_effects, &mut log);

    // --- 6. Skills and alliances ---
    activate_skills(battle, &order, &decisions, config, &mut log);
    let intents: Vec<_> = order
        .iter()
        .filter(|id| battle.roster.get(**id).is_some_and(|a| a.is_alive()))
        .filter_map(|id| {
            let intent = decisions.get(id)?.alliance.clone()?;
            Some((*id, intent))
        })
        .collect();
    log.alliance_events.extend(resolve_alliance_intents(
        &mut battle.roster,
        &intents,
        config.alliance.duration_epochs,
        epoch,
    ));
    let effects: BTreeMap<AgentId, SkillEffects> = battle
        .roster
        .iter()
        .map(|a| (a.id, SkillEffects::of(&a.skill)))
        .collect();

    // --- 7. Predictions ---
    resolve_agent_predictions(
        battle, &order, &decisions, &effects, &market, &previous, config, &mut log,
    );

    // --- 8. Combat ---
    resolve_agent_combat(
        battle,
        &order,
        &decisions,
        &effects,
        sponsor_effects,
        &phase,
        config,
        &mut log,
    );

    // --- 9. Loot ---
    let (grid, spawned) = spawn_items(
        &battle.grid,
        epoch,
        &item_config,
        &mut battle.item_ids,
        &mut battle.rng,
    );
    battle.grid = grid;
    log.spawned_items = spawned;
    let (buffs, ticks) = tick_item_buffs(&battle.buffs);
    battle.buffs = buffs;
    log.buff_ticks = ticks;

    // --- 10. Bleed ---
    apply_attrition(battle, &phase, config, &mut log);

    // --- 11. Deaths ---
    process_deaths(battle, collaborators.final_words, &mut log).await;

    // --- 12. Bookkeeping ---
    for agent in battle.roster.iter_mut() {
        if agent.is_alive() {
            agent.epochs_survived = agent.epochs_survived.saturating_add(1);
        }
        skills::tick_skill(&mut agent.skill);
    }
    log.alliance_events
        .extend(tick_alliances(&mut battle.roster, epoch));
    let is_complete = battle.is_complete();
    if is_complete {
        battle.complete()?;
    }

    debug!(
        battle_id = %battle.id,
        epoch,
        phase = ?phase.name,
        alive = battle.roster.living_count(),
        moves = log.moves.len(),
        attacks = log.combat.len(),
        deaths = log.deaths.len(),
        "Epoch processed"
    );

    // --- 13. Result ---
    Ok(EpochResult {
        battle_id: battle.id,
        epoch,
        phase: phase.name,
        phase_transition,
        market,
        moves: log.moves,
        pickups: log.pickups,
        traps: log.traps,
        spawned_items: log.spawned_items,
        buff_ticks: log.buff_ticks,
        sponsor_boosts: log.sponsor_boosts,
        skill_activations: log.skill_activations,
        alliance_events: log.alliance_events,
        predictions: log.predictions,
        defend_costs: log.defend_costs,
        combat: log.combat,
        bleed: log.bleed,
        deaths: log.deaths,
        agents: battle.roster.snapshots(&battle.buffs),
        grid: serialize_grid(&battle.grid),
        is_complete,
        winner: battle.winner.clone(),
    })
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

fn build_views(
    battle: &Battle,
    phase: &PhaseEntry,
    epoch: u64,
    market: Option<&MarketSnapshot>,
) -> Vec<ArenaView> {
    let snapshots = battle.roster.snapshots(&battle.buffs);
    snapshots
        .iter()
        .filter(|s| s.is_alive)
        .map(|me| ArenaView {
            me: me.clone(),
            others: snapshots
                .iter()
                .filter(|o| o.is_alive && o.id != me.id)
                .cloned()
                .collect(),
            grid: battle.grid.clone(),
            phase: phase.name,
            combat_enabled: phase.combat_enabled,
            epoch,
            market: market.cloned(),
        })
        .collect()
}

async fn collect_decisions(
    source: &dyn DecisionSource,
    views: Vec<ArenaView>,
) -> BTreeMap<AgentId, AgentActions> {
    let pending = views.into_iter().map(|view| {
        let agent_id = view.me.id;
        let name = view.me.name.clone();
        AssertUnwindSafe(source.decide(view))
            .catch_unwind()
            .map(move |outcome| {
                let outcome = outcome.unwrap_or_else(|_| {
                    Err(DecisionError::Internal {
                        message: String::from("decision panicked"),
                    })
                });
                match outcome {
                    Ok(actions) => (agent_id, actions),
                    Err(error) => {
                        warn!(%agent_id, agent = %name, %error, "Decision failed, using fallback");
                        (agent_id, AgentActions::fallback(&error.to_string()))
                    }
                }
            })
    });
    join_all(pending).await.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Movement and items
// ---------------------------------------------------------------------------

/// Validate and apply moves. Returns `(agent, new position)` for movers.
fn resolve_movement(
    battle: &mut Battle,
    order: &[AgentId],
    decisions: &BTreeMap<AgentId, AgentActions>,
    log: &mut EpochLog,
) -> Vec<(AgentId, HexCoord)> {
    let grid = &battle.grid;
    let mut requests: Vec<(AgentId, Option<HexCoord>, HexCoord, Option<MoveRejection>)> =
        Vec::new();
    for &id in order {
        let Some(target) = decisions.get(&id).and_then(|a| a.movement) else {
            continue;
        };
        let from = battle.roster.get(id).and_then(|a| a.position);
        let rejection = match from {
            None => Some(MoveRejection::NotPlaced),
            Some(_) if !grid.contains(target) => Some(MoveRejection::OutOfBounds),
            Some(f) if !Grid::is_adjacent(f, target) => Some(MoveRejection::NotAdjacent),
            Some(_) if grid.occupant(target).is_some() => Some(MoveRejection::Occupied),
            Some(_) => None,
        };
        requests.push((id, from, target, rejection));
    }

    let mut demand: BTreeMap<HexCoord, u32> = BTreeMap::new();
    for (_, _, target, rejection) in &requests {
        if rejection.is_none() {
            let count = demand.entry(*target).or_insert(0);
            *count = count.saturating_add(1);
        }
    }

    let mut movers = Vec::new();
    for (agent_id, from, to, rejection) in requests {
        let reason = rejection.or_else(|| {
            (demand.get(&to).copied().unwrap_or(0) > 1).then_some(MoveRejection::Collision)
        });
        let success = reason.is_none();
        if success {
            if let Some(f) = from {
                battle.grid = battle.grid.move_agent(agent_id, f, to);
            }
            if let Some(agent) = battle.roster.get_mut(agent_id) {
                agent.position = Some(to);
            }
            movers.push((agent_id, to));
        }
        log.moves.push(MoveResult {
            agent_id,
            from,
            to,
            success,
            reason,
        });
    }
    movers
}

fn resolve_items(
    battle: &mut Battle,
    movers: &[(AgentId, HexCoord)],
    config: &ItemConfig,
    log: &mut EpochLog,
) {
    for &(agent_id, coord) in movers {
        let (grid, triggers) = check_traps(&battle.grid, agent_id, coord, config);
        battle.grid = grid;
        for trigger in triggers {
            if let Some(agent) = battle.roster.get_mut(agent_id) {
                let applied = agent.apply_hp_delta(-i64::from(trigger.damage));
                log.ledger
                    .record(agent_id, DamageSource::Environment, loss(applied));
            }
            log.traps.push(trigger);
        }

        let items = battle
            .grid
            .tile(coord)
            .map(|t| t.items.clone())
            .unwrap_or_default();
        for item in items {
            let Some(agent) = battle.roster.get_mut(agent_id) else {
                break;
            };
            if !agent.is_alive() {
                break;
            }
            let outcome = pickup_item(&item, agent.hp(), agent.max_hp, config, &mut battle.rng);
            let applied = agent.apply_hp_delta(outcome.hp_change);
            log.ledger
                .record(agent_id, DamageSource::Environment, loss(applied));
            if let Some(buff) = &outcome.buff {
                battle.buffs.entry(agent_id).or_default().push(buff.clone());
            }
            battle.grid = battle.grid.remove_item(coord, item.id);
            log.pickups.push(ItemPickup {
                agent_id,
                item_id: item.id,
                item_type: item.item_type,
                coord,
                hp_change: applied,
                buff: outcome.buff,
            });
        }
    }
}

/// Positive HP lost for a (possibly positive) applied delta.
fn loss(applied: i64) -> u32 {
    u32::try_from(applied.min(0).unsigned_abs()).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Sponsors and skills
// ---------------------------------------------------------------------------

fn apply_sponsors(
    battle: &mut Battle,
    sponsor_effects: &BTreeMap<AgentId, SponsorEffect>,
    log: &mut EpochLog,
) {
    for (&agent_id, effect) in sponsor_effects {
        let Some(agent) = battle.roster.get_mut(agent_id) else {
            debug!(%agent_id, "Sponsor effect for unknown agent dropped");
            continue;
        };
        if !agent.is_alive() {
            continue;
        }
        let applied = agent.apply_hp_delta(i64::from(effect.hp_boost));
        log.sponsor_boosts.push(SponsorBoost {
            agent_id,
            requested: effect.hp_boost,
            applied: u32::try_from(applied.max(0)).unwrap_or(0),
            hp_after: agent.hp(),
            free_defend: effect.free_defend,
            attack_boost: effect.attack_boost,
            tier: effect.tier.clone(),
            sponsorship_id: effect.sponsorship_id.clone(),
            message: effect.message.clone(),
        });
    }
}

/// Resolve an attack or siphon target by name: alive and not `me`.
fn living_target(battle: &Battle, me: AgentId, name: &str) -> Option<AgentId> {
    let id = battle.roster.id_by_name(name).ok()?;
    let alive = battle.roster.get(id).is_some_and(|a| a.is_alive());
    (alive && id != me).then_some(id)
}

fn activate_skills(
    battle: &mut Battle,
    order: &[AgentId],
    decisions: &BTreeMap<AgentId, AgentActions>,
    config: &ArenaConfig,
    log: &mut EpochLog,
) {
    let cooldown = config.skills.cooldown_epochs;
    let wants_skill = |id: AgentId| decisions.get(&id).is_some_and(|a| a.use_skill);

    // Self-targeted skills first, so a fortify is in place before siphons.
    for id in order.iter().filter(|id| wants_skill(**id)) {
        let Some(agent) = battle.roster.get_mut(*id) else {
            continue;
        };
        if !agent.is_alive() || agent.skill.kind == SkillKind::Siphon {
            continue;
        }
        if skills::try_activate(&mut agent.skill, cooldown) {
            debug!(agent = %agent.name, skill = ?agent.skill.kind, "Skill activated");
            log.skill_activations.push(SkillActivation {
                agent_id: *id,
                skill: agent.skill.kind,
                target_id: None,
                hp_change: 0,
            });
        }
    }

    for id in order.iter().filter(|id| wants_skill(**id)) {
        let is_siphon = battle
            .roster
            .get(*id)
            .is_some_and(|a| a.is_alive() && a.skill.kind == SkillKind::Siphon);
        if !is_siphon {
            continue;
        }
        let target = decisions
            .get(id)
            .and_then(|a| a.attack.as_ref())
            .and_then(|attack| living_target(battle, *id, &attack.target_name));
        let Some(target_id) = target else {
            debug!(agent_id = %id, "Siphon without a living target, not activated");
            continue;
        };

        let Some(user) = battle.roster.get_mut(*id) else {
            continue;
        };
        if !skills::try_activate(&mut user.skill, cooldown) {
            continue;
        }

        let taken = match battle.roster.get_mut(target_id) {
            Some(target) if !SkillEffects::of(&target.skill).loss_immunity => {
                let amount = skills::siphon_amount(target.hp());
                loss(target.apply_hp_delta(-i64::from(amount)))
            }
            _ => 0,
        };
        log.ledger.record_combat(target_id, *id, taken);
        let gained = battle
            .roster
            .get_mut(*id)
            .map_or(0, |user| user.apply_hp_delta(i64::from(taken)));
        log.skill_activations.push(SkillActivation {
            agent_id: *id,
            skill: SkillKind::Siphon,
            target_id: Some(target_id),
            hp_change: gained,
        });
    }
}

// ---------------------------------------------------------------------------
// Predictions and combat
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn resolve_agent_predictions(
    battle: &mut Battle,
    order: &[AgentId],
    decisions: &BTreeMap<AgentId, AgentActions>,
    effects: &BTreeMap<AgentId, SkillEffects>,
    market: &MarketSnapshot,
    previous: &MarketSnapshot,
    config: &ArenaConfig,
    log: &mut EpochLog,
) {
    let mut inputs = Vec::new();
    let mut modifiers = BTreeMap::new();
    for &id in order {
        let Some(intent) = decisions.get(&id).and_then(|a| a.prediction) else {
            continue;
        };
        let Some(agent) = battle.roster.get(id).filter(|a| a.is_alive()) else {
            continue;
        };
        let effect = effects.get(&id).copied().unwrap_or_default();
        let hp = agent.hp();
        let mut stake = stake_from_percent(
            hp,
            intent.stake_percent,
            config.combat.min_stake_percent,
            config.combat.max_stake_percent,
        );
        if effect.double_prediction_stake {
            stake = stake.saturating_mul(2).min(hp);
        }
        let oracle = battle
            .buffs
            .get(&id)
            .is_some_and(|b| has_buff(b, ItemType::Oracle));
        inputs.push(PredictionInput {
            agent_id: id,
            asset: intent.asset,
            direction: intent.direction,
            stake,
        });
        modifiers.insert(id, PredictionModifiers {
            force_win: effect.force_prediction_win || oracle,
            loss_immunity: effect.loss_immunity,
        });
    }

    for result in resolve_predictions(&inputs, market, previous) {
        let agent_id = result.agent_id;
        let mut result = apply_modifiers(
            result,
            modifiers.get(&agent_id).copied().unwrap_or_default(),
        );
        if let Some(agent) = battle.roster.get_mut(agent_id) {
            result.hp_change = agent.apply_hp_delta(result.hp_change);
            log.ledger
                .record(agent_id, DamageSource::Prediction, loss(result.hp_change));
        }
        log.predictions.push(result);
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_agent_combat(
    battle: &mut Battle,
    order: &[AgentId],
    decisions: &BTreeMap<AgentId, AgentActions>,
    effects: &BTreeMap<AgentId, SkillEffects>,
    sponsor_effects: &BTreeMap<AgentId, SponsorEffect>,
    phase: &PhaseEntry,
    config: &ArenaConfig,
    log: &mut EpochLog,
) {
    let buffs_of = |id: &AgentId| battle.buffs.get(id).map_or(&[][..], Vec::as_slice);

    let mut attacks = Vec::new();
    if phase.combat_enabled {
        for &id in order {
            let Some(intent) = decisions.get(&id).and_then(|a| a.attack.as_ref()) else {
                continue;
            };
            let Some(attacker) = battle.roster.get(id).filter(|a| a.is_alive()) else {
                continue;
            };
            let Some(target_id) = living_target(battle, id, &intent.target_name) else {
                debug!(attacker = %attacker.name, target = %intent.target_name, "Attack target invalid, dropped");
                continue;
            };
            if config.combat.require_adjacent_attack {
                let target_pos = battle.roster.get(target_id).and_then(|t| t.position);
                let adjacent = attacker
                    .position
                    .zip(target_pos)
                    .is_some_and(|(a, b)| Grid::is_adjacent(a, b));
                if !adjacent {
                    debug!(attacker = %attacker.name, target = %intent.target_name, "Attack target out of reach, dropped");
                    continue;
                }
            }

            let betrayal = attacker.ally_id == Some(target_id);
            let effect = effects.get(&id).copied().unwrap_or_default();
            let modifiers = StakeModifiers {
                double: effect.double_attack_stake,
                weapon_buffs: buff_count(buffs_of(&id), ItemType::Weapon),
                weapon_bonus_percent: config.items.weapon_bonus_percent,
                sponsor_boost_percent: sponsor_effects.get(&id).map_or(0, |s| s.attack_boost),
                betrayal_multiplier: if betrayal {
                    config.combat.betrayal_multiplier
                } else {
                    1
                },
            };
            attacks.push(Attack {
                attacker_id: id,
                target_id,
                stake: effective_attack_stake(intent.stake, &modifiers),
                betrayal,
            });
        }
    } else if order
        .iter()
        .any(|id| decisions.get(id).is_some_and(|a| a.attack.is_some()))
    {
        debug!(phase = ?phase.name, "Combat disabled, attacks dropped");
    }

    let combatants: BTreeMap<AgentId, Combatant> = order
        .iter()
        .filter_map(|&id| {
            let agent = battle.roster.get(id)?;
            let declared = decisions.get(&id).is_some_and(|a| a.defend);
            let sponsored = sponsor_effects.get(&id).is_some_and(|s| s.free_defend);
            let shielded = has_buff(buffs_of(&id), ItemType::Shield);
            Some((id, Combatant {
                hp: agent.hp(),
                is_alive: agent.is_alive(),
                defending: declared || sponsored || shielded,
                free_defend: sponsored || shielded,
                loss_immunity: effects.get(&id).is_some_and(|e| e.loss_immunity),
            }))
        })
        .collect();

    let resolution = resolve_combat(&attacks, &combatants, config.combat.defend_cost_percent);

    for cost in &resolution.defend_costs {
        if let Some(agent) = battle.roster.get_mut(cost.agent_id) {
            let applied = agent.apply_hp_delta(-i64::from(cost.cost));
            log.ledger
                .record(cost.agent_id, DamageSource::Combat, loss(applied));
        }
    }

    for result in &resolution.results {
        for (me, other, delta) in [
            (result.attacker_id, result.target_id, result.attacker_hp_change),
            (result.target_id, result.attacker_id, result.target_hp_change),
        ] {
            if let Some(agent) = battle.roster.get_mut(me) {
                let applied = agent.apply_hp_delta(delta);
                log.ledger.record_combat(me, other, loss(applied));
            }
        }
        if result.betrayal {
            if let Some(event) = end_alliance(
                &mut battle.roster,
                result.attacker_id,
                AllianceEventKind::Betrayed,
                battle.epoch,
            ) {
                info!(attacker = %result.attacker_id, target = %result.target_id, "Alliance betrayed");
                log.alliance_events.push(event);
            }
        }
    }

    log.defend_costs = resolution.defend_costs;
    log.combat = resolution.results;
}

// ---------------------------------------------------------------------------
// Attrition and deaths
// ---------------------------------------------------------------------------

fn apply_attrition(battle: &mut Battle, phase: &PhaseEntry, config: &ArenaConfig, log: &mut EpochLog) {
    let inputs: Vec<BleedInput> = battle
        .roster
        .living()
        .map(|a| BleedInput {
            agent_id: a.id,
            hp: a.hp(),
            in_storm: a
                .position
                .is_some_and(|p| battle.grid.is_storm_tile(p, phase.name)),
        })
        .collect();

    let results = apply_bleed(&inputs, config.combat.bleed_percent, config.combat.storm_damage);
    for result in &results {
        if let Some(agent) = battle.roster.get_mut(result.agent_id) {
            agent.set_hp(result.hp_after);
        }
        log.ledger.record(
            result.agent_id,
            DamageSource::Environment,
            result.hp_before.saturating_sub(result.hp_after),
        );
    }
    log.bleed = results;
}

async fn process_deaths(
    battle: &mut Battle,
    final_words: Option<&dyn FinalWords>,
    log: &mut EpochLog,
) {
    let dead: Vec<AgentId> = battle
        .roster
        .iter()
        .filter(|a| !a.is_eliminated() && a.hp() == 0)
        .map(|a| a.id)
        .collect();

    for agent_id in dead {
        let cause = log.ledger.cause_of(agent_id);
        let killer = log.ledger.killer_of(agent_id).filter(|k| *k != agent_id);
        if let Some(k) = killer.and_then(|k| battle.roster.get_mut(k)) {
            k.kills = k.kills.saturating_add(1);
        }
        if let Some(event) = end_alliance(
            &mut battle.roster,
            agent_id,
            AllianceEventKind::Dissolved,
            battle.epoch,
        ) {
            log.alliance_events.push(event);
        }

        let Some(snapshot) = battle
            .roster
            .get(agent_id)
            .map(|a| a.snapshot(battle.buffs.get(&agent_id).map_or(&[], Vec::as_slice)))
        else {
            continue;
        };
        let generated = match final_words {
            Some(generator) => match generator.final_words(&snapshot, cause).await {
                Ok(words) => Some(words),
                Err(error) => {
                    warn!(agent = %snapshot.name, %error, "Final words unavailable, using fallback");
                    None
                }
            },
            None => None,
        };
        let words = generated
            .unwrap_or_else(|| fallback_final_words(cause, &mut battle.rng).to_owned());

        if let Some(record) = battle.eliminate_agent(agent_id, cause, killer, words) {
            log.deaths.push(record.clone());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use futures::future::{BoxFuture, FutureExt as _};
    use hexarena_agents::{ArenaAgent, final_words_pool};
    use hexarena_types::{
        AgentClass, AgentSnapshot, AllianceIntent, Asset, AttackIntent, DeathCause, Direction,
        ItemBuff, PredictionIntent,
    };

    use super::*;
    use crate::decision::StubDecisionSource;
    use crate::final_words::FinalWordsError;
    use crate::market::{StaticMarket, default_prices};

    /// Replays fixed actions per agent name; unknown agents hold.
    struct Scripted(BTreeMap<String, AgentActions>);

    impl DecisionSource for Scripted {
        fn decide(&self, view: ArenaView) -> BoxFuture<'_, Result<AgentActions, DecisionError>> {
            let actions = self.0.get(&view.me.name).cloned().unwrap_or_default();
            futures::future::ready(Ok(actions)).boxed()
        }
    }

    struct Failing;

    impl DecisionSource for Failing {
        fn decide(&self, _view: ArenaView) -> BoxFuture<'_, Result<AgentActions, DecisionError>> {
            futures::future::ready(Err(DecisionError::Internal {
                message: String::from("backend down"),
            }))
            .boxed()
        }
    }

    struct Panicking;

    impl DecisionSource for Panicking {
        #[allow(clippy::panic)]
        fn decide(&self, _view: ArenaView) -> BoxFuture<'_, Result<AgentActions, DecisionError>> {
            futures::future::lazy(|_| -> Result<AgentActions, DecisionError> { panic!("boom") })
                .boxed()
        }
    }

    /// Signs every agent off by name.
    struct Eulogy;

    impl FinalWords for Eulogy {
        fn final_words<'a>(
            &'a self,
            agent: &'a AgentSnapshot,
            _cause: DeathCause,
        ) -> BoxFuture<'a, Result<String, FinalWordsError>> {
            futures::future::ready(Ok(format!("{} signs off", agent.name))).boxed()
        }
    }

    struct Speechless;

    impl FinalWords for Speechless {
        fn final_words<'a>(
            &'a self,
            _agent: &'a AgentSnapshot,
            _cause: DeathCause,
        ) -> BoxFuture<'a, Result<String, FinalWordsError>> {
            futures::future::ready(Err(FinalWordsError {
                message: String::from("generator offline"),
            }))
            .boxed()
        }
    }

    struct BrokenMarket;

    impl MarketSource for BrokenMarket {
        fn fetch_prices(&self) -> BoxFuture<'_, Result<MarketSnapshot, MarketError>> {
            futures::future::ready(Err(MarketError::Unavailable {
                message: String::from("feed offline"),
            }))
            .boxed()
        }
    }

    fn battle_with(names: &[(&str, AgentClass)]) -> Battle {
        let mut battle = Battle::new(3, 11);
        battle
            .spawn_agents(
                names
                    .iter()
                    .map(|(n, c)| ArenaAgent::new(*n, *c))
                    .collect(),
            )
            .unwrap();
        battle.start_battle_immediate().unwrap();
        battle
    }

    fn place(battle: &mut Battle, name: &str, coord: HexCoord) {
        let id = battle.roster.id_by_name(name).unwrap();
        battle.grid = battle.grid.remove_agent(id).place_agent(id, coord);
        battle.roster.get_mut(id).unwrap().position = Some(coord);
    }

    /// Clear all items so movement tests are not disturbed by loot.
    fn clear_items(battle: &mut Battle) {
        let stocked: Vec<(HexCoord, Vec<hexarena_types::ItemId>)> = battle
            .grid
            .tiles()
            .map(|t| (t.coord, t.items.iter().map(|i| i.id).collect()))
            .collect();
        for (coord, ids) in stocked {
            for id in ids {
                battle.grid = battle.grid.remove_item(coord, id);
            }
        }
    }

    async fn run(battle: &mut Battle, source: &dyn DecisionSource) -> EpochResult {
        run_with(battle, source, None, &BTreeMap::new(), None, &ArenaConfig::default()).await
    }

    async fn run_with(
        battle: &mut Battle,
        source: &dyn DecisionSource,
        previous: Option<&MarketSnapshot>,
        sponsors: &BTreeMap<AgentId, SponsorEffect>,
        final_words: Option<&dyn FinalWords>,
        config: &ArenaConfig,
    ) -> EpochResult {
        let market = StaticMarket::default();
        let collaborators = Collaborators {
            market: &market,
            decisions: source,
            final_words,
        };
        process_epoch(battle, &collaborators, previous, sponsors, config)
            .await
            .unwrap()
    }

    /// The default prices with ETH moved to `eth`. Against the static
    /// market, a lower value means ETH went up this epoch.
    fn previous_with_eth(eth: f64) -> MarketSnapshot {
        let mut prices = default_prices();
        prices.insert(Asset::Eth, eth);
        MarketSnapshot {
            prices,
            timestamp: Utc::now(),
        }
    }

    /// Two adjacent agents, past the combat-free opening phase.
    fn duel(first: (&str, AgentClass), second: (&str, AgentClass)) -> Battle {
        let mut battle = battle_with(&[first, second]);
        clear_items(&mut battle);
        place(&mut battle, first.0, HexCoord::new(1, 0));
        place(&mut battle, second.0, HexCoord::new(2, 0));
        battle.epoch = 3;
        battle
    }

    fn two_fighters() -> Battle {
        duel(("Ares", AgentClass::Warrior), ("Vex", AgentClass::Parasite))
    }

    fn id(battle: &Battle, name: &str) -> AgentId {
        battle.roster.id_by_name(name).unwrap()
    }

    fn hp(battle: &Battle, name: &str) -> u32 {
        battle.roster.get(id(battle, name)).unwrap().hp()
    }

    fn attack(target: &str, stake: u32) -> AgentActions {
        AgentActions {
            attack: Some(AttackIntent {
                target_name: target.into(),
                stake,
            }),
            ..AgentActions::default()
        }
    }

    fn bet(direction: Direction, stake_percent: u32) -> AgentActions {
        AgentActions {
            prediction: Some(PredictionIntent {
                asset: Asset::Eth,
                direction,
                stake_percent,
            }),
            ..AgentActions::default()
        }
    }

    fn grant(battle: &mut Battle, name: &str, buff_type: ItemType, count: usize) {
        let agent = id(battle, name);
        let buffs = (700_u64..).take(count).map(|n| ItemBuff {
            buff_type,
            remaining_epochs: 2,
            source_item_id: hexarena_types::ItemId(n),
        });
        battle.buffs.entry(agent).or_default().extend(buffs);
    }

    fn actions(pairs: &[(&str, AgentActions)]) -> Scripted {
        Scripted(
            pairs
                .iter()
                .map(|(n, a)| ((*n).to_owned(), a.clone()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn requires_active_battle() {
        let mut battle = Battle::new(3, 1);
        let market = StaticMarket::default();
        let collaborators = Collaborators {
            market: &market,
            decisions: &StubDecisionSource,
            final_words: None,
        };
        let err = process_epoch(&mut battle, &collaborators, None, &BTreeMap::new(), &ArenaConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EpochError::Arena { .. }));
    }

    #[tokio::test]
    async fn market_failure_changes_nothing() {
        let mut battle = battle_with(&[("A", AgentClass::Trader), ("B", AgentClass::Gambler)]);
        let before = battle.state();
        let collaborators = Collaborators {
            market: &BrokenMarket,
            decisions: &StubDecisionSource,
            final_words: None,
        };
        let err = process_epoch(&mut battle, &collaborators, None, &BTreeMap::new(), &ArenaConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EpochError::Market { .. }));
        assert_eq!(battle.state(), before);
    }

    #[tokio::test]
    async fn failing_decisions_fall_back() {
        let mut battle = battle_with(&[("A", AgentClass::Trader), ("B", AgentClass::Gambler)]);
        let result = run(&mut battle, &Failing).await;
        assert_eq!(result.epoch, 1);
        assert!(result.moves.is_empty());
        assert!(result.predictions.is_empty());
        assert_eq!(result.bleed.len(), 2);
    }

    #[tokio::test]
    async fn panicking_decisions_fall_back() {
        let mut battle = battle_with(&[("A", AgentClass::Trader), ("B", AgentClass::Gambler)]);
        let result = run(&mut battle, &Panicking).await;
        assert_eq!(result.bleed.len(), 2);
    }

    #[tokio::test]
    async fn moving_onto_items_picks_them_up() {
        let mut battle = battle_with(&[("A", AgentClass::Trader), ("B", AgentClass::Gambler)]);
        clear_items(&mut battle);
        place(&mut battle, "A", HexCoord::new(2, 0));
        let item = Item {
            id: hexarena_types::ItemId(900),
            item_type: ItemType::Weapon,
            coord: HexCoord::new(1, 0),
            spawned_at_epoch: 0,
            is_cornucopia: true,
        };
        battle.grid = battle.grid.add_item(item);

        let source = actions(&[("A", AgentActions {
            movement: Some(HexCoord::new(1, 0)),
            ..AgentActions::default()
        })]);
        let result = run(&mut battle, &source).await;
        assert!(result.moves[0].success);
        assert_eq!(result.pickups.len(), 1);
        let a = battle.roster.id_by_name("A").unwrap();
        // Picked up at step 4, ticked once at step 9.
        assert_eq!(battle.buffs[&a][0].remaining_epochs, 2);
    }

    #[tokio::test]
    async fn stepping_on_a_trap_hurts() {
        let mut battle = battle_with(&[("A", AgentClass::Trader), ("B", AgentClass::Gambler)]);
        clear_items(&mut battle);
        place(&mut battle, "A", HexCoord::new(2, 0));
        battle.grid = battle.grid.add_item(Item {
            id: hexarena_types::ItemId(901),
            item_type: ItemType::Trap,
            coord: HexCoord::new(1, 0),
            spawned_at_epoch: 0,
            is_cornucopia: false,
        });
        let source = actions(&[("A", AgentActions {
            movement: Some(HexCoord::new(1, 0)),
            ..AgentActions::default()
        })]);
        let result = run(&mut battle, &source).await;
        assert_eq!(result.traps.len(), 1);
        assert!(result.pickups.is_empty());
        let a = battle.roster.id_by_name("A").unwrap();
        // 1000 - 100 trap, then 2% bleed of 900.
        assert_eq!(battle.roster.get(a).unwrap().hp(), 882);
    }

    #[tokio::test]
    async fn loot_phase_drops_attacks() {
        let mut battle = two_fighters();
        battle.epoch = 0;
        let source = actions(&[("Ares", AgentActions {
            attack: Some(AttackIntent {
                target_name: "Vex".into(),
                stake: 100,
            }),
            ..AgentActions::default()
        })]);
        let result = run(&mut battle, &source).await;
        assert_eq!(result.phase, hexarena_types::PhaseName::Loot);
        assert!(result.combat.is_empty());
    }

    #[tokio::test]
    async fn undefended_attack_steals_stake() {
        let mut battle = two_fighters();
        let source = actions(&[("Ares", AgentActions {
            attack: Some(AttackIntent {
                target_name: "Vex".into(),
                stake: 100,
            }),
            ..AgentActions::default()
        })]);
        let result = run(&mut battle, &source).await;
        assert_eq!(result.combat.len(), 1);
        assert_eq!(result.combat[0].target_hp_change, -100);
        let ares = battle.roster.id_by_name("Ares").unwrap();
        let vex = battle.roster.id_by_name("Vex").unwrap();
        // Ares is capped at max HP; Vex bleeds 2% of 900.
        assert_eq!(battle.roster.get(ares).unwrap().hp(), 980);
        assert_eq!(battle.roster.get(vex).unwrap().hp(), 882);
    }

    #[tokio::test]
    async fn attacks_out_of_reach_are_dropped() {
        let mut battle = two_fighters();
        place(&mut battle, "Vex", HexCoord::new(-3, 0));
        let source = actions(&[("Ares", AgentActions {
            attack: Some(AttackIntent {
                target_name: "Vex".into(),
                stake: 100,
            }),
            ..AgentActions::default()
        })]);
        assert!(run(&mut battle, &source).await.combat.is_empty());
    }

    #[tokio::test]
    async fn betrayal_breaks_the_pact() {
        let mut battle = two_fighters();
        let ares = battle.roster.id_by_name("Ares").unwrap();
        let vex = battle.roster.id_by_name("Vex").unwrap();
        hexarena_agents::alliance::form_alliance(&mut battle.roster, ares, vex, 3, 3).unwrap();

        let source = actions(&[("Ares", AgentActions {
            attack: Some(AttackIntent {
                target_name: "Vex".into(),
                stake: 100,
            }),
            ..AgentActions::default()
        })]);
        let result = run(&mut battle, &source).await;
        assert!(result.combat[0].betrayal);
        assert_eq!(result.combat[0].stake, 200);
        assert!(result
            .alliance_events
            .iter()
            .any(|e| e.kind == AllianceEventKind::Betrayed));
        assert_eq!(battle.roster.get(vex).unwrap().ally_id, None);
    }

    #[tokio::test]
    async fn alliances_form_and_expire_once() {
        let mut battle = two_fighters();
        let source = actions(&[("Vex", AgentActions {
            alliance: Some(AllianceIntent::Propose {
                target_name: "Ares".into(),
            }),
            ..AgentActions::default()
        })]);
        let first = run(&mut battle, &source).await;
        assert_eq!(first.alliance_events.len(), 1);
        assert_eq!(first.alliance_events[0].kind, AllianceEventKind::Formed);

        let idle = actions(&[]);
        let mut events = Vec::new();
        for _ in 0..3 {
            events.extend(run(&mut battle, &idle).await.alliance_events);
        }
        let expired = events
            .iter()
            .filter(|e| e.kind == AllianceEventKind::Expired)
            .count();
        assert_eq!(expired, 1);
    }

    #[tokio::test]
    async fn storm_damage_applies_on_storm_tiles() {
        let mut battle = two_fighters();
        place(&mut battle, "Vex", HexCoord::new(3, 0));
        let result = run(&mut battle, &actions(&[])).await;
        let vex = battle.roster.id_by_name("Vex").unwrap();
        let bleed = result.bleed.iter().find(|b| b.agent_id == vex).unwrap();
        assert_eq!(bleed.storm_damage, 50);
        assert_eq!(bleed.hp_after, 930);
    }

    #[tokio::test]
    async fn lethal_attack_credits_the_kill() {
        let mut battle = battle_with(&[
            ("Ares", AgentClass::Warrior),
            ("Vex", AgentClass::Parasite),
            ("Sol", AgentClass::Trader),
        ]);
        clear_items(&mut battle);
        place(&mut battle, "Ares", HexCoord::new(1, 0));
        place(&mut battle, "Vex", HexCoord::new(2, 0));
        battle.epoch = 3;
        let vex = battle.roster.id_by_name("Vex").unwrap();
        battle.roster.get_mut(vex).unwrap().set_hp(50);

        let source = actions(&[("Ares", AgentActions {
            attack: Some(AttackIntent {
                target_name: "Vex".into(),
                stake: 200,
            }),
            ..AgentActions::default()
        })]);
        let result = run(&mut battle, &source).await;
        assert_eq!(result.deaths.len(), 1);
        let death = &result.deaths[0];
        assert_eq!(death.cause, DeathCause::Combat);
        let ares = battle.roster.id_by_name("Ares").unwrap();
        assert_eq!(death.killer_id, Some(ares));
        assert!(!death.final_words.is_empty());
        assert_eq!(battle.roster.get(ares).unwrap().kills, 1);
        assert!(!result.is_complete);
    }

    #[tokio::test]
    async fn last_survivor_completes_the_battle() {
        let mut battle = two_fighters();
        let vex = battle.roster.id_by_name("Vex").unwrap();
        battle.roster.get_mut(vex).unwrap().set_hp(1);
        let result = run(&mut battle, &actions(&[])).await;
        assert!(result.is_complete);
        assert_eq!(result.winner.as_ref().map(|w| w.agent_name.as_str()), Some("Ares"));
        assert_eq!(battle.status(), BattleStatus::Completed);
        assert_eq!(result.deaths[0].cause, DeathCause::Bleed);
    }

    #[tokio::test]
    async fn result_survives_json() {
        let mut battle = two_fighters();
        let result = run(&mut battle, &actions(&[])).await;
        let json = serde_json::to_string(&result).unwrap();
        let back: EpochResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.epoch, result.epoch);
        assert_eq!(back.agents, result.agents);
        assert_eq!(back.grid, result.grid);
    }

    #[tokio::test]
    async fn skills_go_on_cooldown() {
        let mut battle = two_fighters();
        let source = actions(&[("Ares", AgentActions {
            use_skill: true,
            ..AgentActions::default()
        })]);
        let first = run(&mut battle, &source).await;
        assert_eq!(first.skill_activations.len(), 1);
        let second = run(&mut battle, &source).await;
        assert!(second.skill_activations.is_empty());
    }

    #[tokio::test]
    async fn siphon_drains_target() {
        let mut battle = two_fighters();
        let ares = battle.roster.id_by_name("Ares").unwrap();
        let vex = battle.roster.id_by_name("Vex").unwrap();
        battle.roster.get_mut(vex).unwrap().set_hp(500);
        let source = actions(&[("Vex", AgentActions {
            use_skill: true,
            attack: Some(AttackIntent {
                target_name: "Ares".into(),
                stake: 0,
            }),
            ..AgentActions::default()
        })]);
        let result = run(&mut battle, &source).await;
        let siphon = &result.skill_activations[0];
        assert_eq!(siphon.target_id, Some(ares));
        assert_eq!(siphon.hp_change, 100);
    }

    #[tokio::test]
    async fn failed_final_words_use_a_canned_line() {
        let mut battle = two_fighters();
        let vex = id(&battle, "Vex");
        battle.roster.get_mut(vex).unwrap().set_hp(1);
        let result = run_with(
            &mut battle,
            &actions(&[]),
            None,
            &BTreeMap::new(),
            Some(&Speechless),
            &ArenaConfig::default(),
        )
        .await;
        let death = &result.deaths[0];
        assert_eq!(death.cause, DeathCause::Bleed);
        assert!(final_words_pool(DeathCause::Bleed).contains(&death.final_words.as_str()));
    }

    #[tokio::test]
    async fn generated_final_words_are_recorded() {
        let mut battle = two_fighters();
        let vex = id(&battle, "Vex");
        battle.roster.get_mut(vex).unwrap().set_hp(1);
        let result = run_with(
            &mut battle,
            &actions(&[]),
            None,
            &BTreeMap::new(),
            Some(&Eulogy),
            &ArenaConfig::default(),
        )
        .await;
        assert_eq!(result.deaths[0].final_words, "Vex signs off");
        assert_eq!(battle.eliminations()[0].final_words, "Vex signs off");
    }

    #[tokio::test]
    async fn sponsor_boost_is_capped_at_max_hp() {
        let mut battle = two_fighters();
        let vex = id(&battle, "Vex");
        battle.roster.get_mut(vex).unwrap().set_hp(950);
        let sponsors = BTreeMap::from([(vex, SponsorEffect {
            hp_boost: 500,
            ..SponsorEffect::default()
        })]);
        let result = run_with(
            &mut battle,
            &actions(&[]),
            None,
            &sponsors,
            None,
            &ArenaConfig::default(),
        )
        .await;
        let boost = &result.sponsor_boosts[0];
        assert_eq!(boost.agent_id, vex);
        assert_eq!((boost.requested, boost.applied, boost.hp_after), (500, 50, 1000));
        // Bleed still runs on the boosted total.
        assert_eq!(hp(&battle, "Vex"), 980);
    }

    #[tokio::test]
    async fn sponsored_defend_is_free() {
        let mut battle = two_fighters();
        let vex = id(&battle, "Vex");
        battle.roster.get_mut(vex).unwrap().set_hp(500);
        let sponsors = BTreeMap::from([(vex, SponsorEffect {
            free_defend: true,
            ..SponsorEffect::default()
        })]);
        let result = run_with(
            &mut battle,
            &actions(&[("Ares", attack("Vex", 100))]),
            None,
            &sponsors,
            None,
            &ArenaConfig::default(),
        )
        .await;
        assert!(result.defend_costs.is_empty());
        let fight = &result.combat[0];
        assert!(fight.defended);
        assert_eq!((fight.attacker_hp_change, fight.target_hp_change), (-100, 100));
        // 500 + 100, then 2% bleed.
        assert_eq!(hp(&battle, "Vex"), 588);
    }

    #[tokio::test]
    async fn sponsor_attack_boost_raises_the_stake() {
        let mut battle = two_fighters();
        let ares = id(&battle, "Ares");
        let sponsors = BTreeMap::from([(ares, SponsorEffect {
            attack_boost: 50,
            ..SponsorEffect::default()
        })]);
        let result = run_with(
            &mut battle,
            &actions(&[("Ares", attack("Vex", 100))]),
            None,
            &sponsors,
            None,
            &ArenaConfig::default(),
        )
        .await;
        assert_eq!(result.combat[0].stake, 150);
        assert_eq!(result.combat[0].target_hp_change, -150);
    }

    #[tokio::test]
    async fn declared_defend_costs_five_percent() {
        let mut battle = two_fighters();
        let vex = id(&battle, "Vex");
        let source = actions(&[("Vex", AgentActions {
            defend: true,
            ..AgentActions::default()
        })]);
        let result = run(&mut battle, &source).await;
        assert_eq!(result.defend_costs, vec![DefendCost {
            agent_id: vex,
            cost: 50
        }]);
        // 1000 - 50, then 2% bleed of 950.
        assert_eq!(hp(&battle, "Vex"), 931);
    }

    #[tokio::test]
    async fn defended_attack_pays_the_defender() {
        let mut battle = two_fighters();
        let vex = id(&battle, "Vex");
        battle.roster.get_mut(vex).unwrap().set_hp(600);
        let source = actions(&[
            ("Ares", attack("Vex", 100)),
            ("Vex", AgentActions {
                defend: true,
                ..AgentActions::default()
            }),
        ]);
        let result = run(&mut battle, &source).await;
        assert_eq!(result.defend_costs[0].cost, 30);
        let fight = &result.combat[0];
        assert!(fight.defended);
        assert_eq!((fight.attacker_hp_change, fight.target_hp_change), (-100, 100));
        // 600 - 30 + 100 = 670, bleed 13.
        assert_eq!(hp(&battle, "Vex"), 657);
        // 1000 - 100 = 900, bleed 18.
        assert_eq!(hp(&battle, "Ares"), 882);
    }

    #[tokio::test]
    async fn shield_buff_defends_for_free() {
        let mut battle = two_fighters();
        grant(&mut battle, "Vex", ItemType::Shield, 1);
        let result = run(&mut battle, &actions(&[("Ares", attack("Vex", 100))])).await;
        assert!(result.defend_costs.is_empty());
        assert!(result.combat[0].defended);
        assert_eq!(result.combat[0].attacker_hp_change, -100);
        assert_eq!(hp(&battle, "Ares"), 882);
    }

    #[tokio::test]
    async fn stacked_weapons_add_up() {
        let mut battle = two_fighters();
        grant(&mut battle, "Ares", ItemType::Weapon, 2);
        let result = run(&mut battle, &actions(&[("Ares", attack("Vex", 100))])).await;
        // Two buffs at 25% each.
        assert_eq!(result.combat[0].stake, 150);
        assert_eq!(result.combat[0].target_hp_change, -150);
    }

    #[tokio::test]
    async fn oracle_turns_a_wrong_call_into_a_win() {
        let mut battle = two_fighters();
        let ares = id(&battle, "Ares");
        let vex = id(&battle, "Vex");
        battle.roster.get_mut(ares).unwrap().set_hp(500);
        grant(&mut battle, "Ares", ItemType::Oracle, 1);
        let previous = previous_with_eth(3_000.0);
        let source = actions(&[
            ("Ares", bet(Direction::Down, 10)),
            ("Vex", bet(Direction::Down, 10)),
        ]);
        let result = run_with(
            &mut battle,
            &source,
            Some(&previous),
            &BTreeMap::new(),
            None,
            &ArenaConfig::default(),
        )
        .await;
        let of = |agent: AgentId| {
            result
                .predictions
                .iter()
                .find(|p| p.agent_id == agent)
                .unwrap()
        };
        assert!(of(ares).correct);
        assert_eq!(of(ares).hp_change, 50);
        assert!(!of(vex).correct);
        assert_eq!(of(vex).hp_change, -100);
    }

    #[tokio::test]
    async fn fortify_cancels_combat_losses() {
        let mut battle = duel(("Ares", AgentClass::Warrior), ("Sage", AgentClass::Survivor));
        let source = actions(&[
            ("Ares", attack("Sage", 300)),
            ("Sage", AgentActions {
                use_skill: true,
                ..AgentActions::default()
            }),
        ]);
        let result = run(&mut battle, &source).await;
        assert_eq!(result.skill_activations[0].skill, SkillKind::Fortify);
        let fight = &result.combat[0];
        assert_eq!(fight.stake, 300);
        assert_eq!((fight.attacker_hp_change, fight.target_hp_change), (0, 0));
        assert_eq!(hp(&battle, "Sage"), 980);
    }

    #[tokio::test]
    async fn all_in_doubles_the_stake_up_to_hp() {
        let mut battle = duel(("Ares", AgentClass::Warrior), ("Dice", AgentClass::Gambler));
        let dice = id(&battle, "Dice");
        battle.roster.get_mut(dice).unwrap().set_hp(600);
        let mut config = ArenaConfig::default();
        config.combat.max_stake_percent = 80;
        let source = actions(&[("Dice", AgentActions {
            use_skill: true,
            ..bet(Direction::Up, 80)
        })]);
        let previous = previous_with_eth(3_000.0);
        let result = run_with(
            &mut battle,
            &source,
            Some(&previous),
            &BTreeMap::new(),
            None,
            &config,
        )
        .await;
        assert_eq!(result.skill_activations[0].skill, SkillKind::AllIn);
        let prediction = &result.predictions[0];
        // 80% of 600 is 480, doubled to 960, clamped to 600.
        assert_eq!(prediction.stake, 600);
        assert!(prediction.correct);
        // The win is capped at max HP.
        assert_eq!(prediction.hp_change, 400);
    }
}
