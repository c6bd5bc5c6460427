//! Alliances: two-agent non-aggression pacts with a fixed expiry.
//!
//! Each agent has at most one ally. Both sides of a pact always point at
//! each other and carry the same remaining duration, so every lifecycle
//! event is emitted once per pair.

use hexarena_types::{AgentId, AllianceEvent, AllianceEventKind, AllianceIntent};
use tracing::debug;

use crate::agent::Roster;

/// Default alliance length in epochs.
pub const DEFAULT_ALLIANCE_EPOCHS: u32 = 3;

/// Whether two agents are currently allied with each other.
pub fn are_allied(roster: &Roster, a: AgentId, b: AgentId) -> bool {
    roster.get(a).and_then(|x| x.ally_id) == Some(b)
        && roster.get(b).and_then(|x| x.ally_id) == Some(a)
}

/// Form a pact between two agents if both are alive, distinct and unallied.
pub fn form_alliance(
    roster: &mut Roster,
    proposer: AgentId,
    target: AgentId,
    duration: u32,
    epoch: u64,
) -> Option<AllianceEvent> {
    if proposer == target {
        return None;
    }
    let eligible = |id| {
        roster
            .get(id)
            .is_some_and(|a| a.is_alive() && a.ally_id.is_none())
    };
    if !eligible(proposer) || !eligible(target) {
        return None;
    }

    for (me, other) in [(proposer, target), (target, proposer)] {
        if let Some(agent) = roster.get_mut(me) {
            agent.ally_id = Some(other);
            agent.alliance_epochs_remaining = duration;
        }
    }
    debug!(%proposer, %target, epoch, "Alliance formed");
    Some(AllianceEvent {
        kind: AllianceEventKind::Formed,
        agent_a: proposer,
        agent_b: target,
        epoch,
    })
}

/// End an agent's current pact on both sides.
///
/// `kind` labels the event (`Broken`, `Betrayed`, `Dissolved`). Returns
/// `None` if the agent had no ally.
pub fn end_alliance(
    roster: &mut Roster,
    initiator: AgentId,
    kind: AllianceEventKind,
    epoch: u64,
) -> Option<AllianceEvent> {
    let partner = roster.get(initiator).and_then(|a| a.ally_id)?;
    for id in [initiator, partner] {
        if let Some(agent) = roster.get_mut(id) {
            if agent.ally_id.is_some() {
                agent.ally_id = None;
                agent.alliance_epochs_remaining = 0;
            }
        }
    }
    debug!(%initiator, %partner, ?kind, epoch, "Alliance ended");
    Some(AllianceEvent {
        kind,
        agent_a: initiator,
        agent_b: partner,
        epoch,
    })
}

/// Resolve this epoch's alliance intents in roster order.
///
/// Proposals naming an unknown agent are dropped. The first proposal in
/// roster order wins when several target the same agent.
pub fn resolve_alliance_intents(
    roster: &mut Roster,
    intents: &[(AgentId, AllianceIntent)],
    duration: u32,
    epoch: u64,
) -> Vec<AllianceEvent> {
    let mut events = Vec::new();
    for (agent_id, intent) in intents {
        let event = match intent {
            AllianceIntent::Propose { target_name } => {
                let Ok(target) = roster.id_by_name(target_name) else {
                    debug!(%agent_id, target_name, "Alliance target unknown, dropped");
                    continue;
                };
                form_alliance(roster, *agent_id, target, duration, epoch)
            }
            AllianceIntent::Break => {
                end_alliance(roster, *agent_id, AllianceEventKind::Broken, epoch)
            }
        };
        events.extend(event);
    }
    events
}

/// Count every alliance down by one epoch and dissolve those that reach
/// zero, emitting one `Expired` event per pair.
pub fn tick_alliances(roster: &mut Roster, epoch: u64) -> Vec<AllianceEvent> {
    let mut expired: Vec<(AgentId, AgentId)> = Vec::new();
    for agent in roster.iter_mut() {
        let Some(ally) = agent.ally_id else {
            continue;
        };
        agent.alliance_epochs_remaining = agent.alliance_epochs_remaining.saturating_sub(1);
        if agent.alliance_epochs_remaining == 0 {
            agent.ally_id = None;
            if !expired.iter().any(|&(a, b)| a == ally && b == agent.id) {
                expired.push((agent.id, ally));
            }
        }
    }
    expired
        .into_iter()
        .map(|(agent_a, agent_b)| AllianceEvent {
            kind: AllianceEventKind::Expired,
            agent_a,
            agent_b,
            epoch,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use hexarena_types::AgentClass;

    use super::*;
    use crate::agent::ArenaAgent;

    fn roster(names: &[&str]) -> (Roster, Vec<AgentId>) {
        let mut roster = Roster::new();
        let ids = names
            .iter()
            .map(|n| roster.add(ArenaAgent::new(*n, AgentClass::Trader)).unwrap())
            .collect();
        (roster, ids)
    }

    fn propose(name: &str) -> AllianceIntent {
        AllianceIntent::Propose {
            target_name: name.to_owned(),
        }
    }

    #[test]
    fn proposal_forms_mutual_pact() {
        let (mut r, ids) = roster(&["a", "b"]);
        let events = resolve_alliance_intents(&mut r, &[(ids[0], propose("b"))], 3, 1);
        assert_eq!(events.len(), 1);
        assert!(are_allied(&r, ids[0], ids[1]));
        assert_eq!(r.get(ids[1]).unwrap().alliance_epochs_remaining, 3);
    }

    #[test]
    fn first_proposal_wins() {
        let (mut r, ids) = roster(&["a", "b", "c"]);
        let intents = [(ids[0], propose("c")), (ids[1], propose("c"))];
        let events = resolve_alliance_intents(&mut r, &intents, 3, 1);
        assert_eq!(events.len(), 1);
        assert!(are_allied(&r, ids[0], ids[2]));
        assert_eq!(r.get(ids[1]).unwrap().ally_id, None);
    }

    #[test]
    fn invalid_proposals_are_dropped() {
        let (mut r, ids) = roster(&["a", "b"]);
        r.get_mut(ids[1]).unwrap().set_hp(0);
        let intents = [(ids[0], propose("ghost")), (ids[0], propose("a")), (ids[0], propose("b"))];
        assert!(resolve_alliance_intents(&mut r, &intents, 3, 1).is_empty());
    }

    #[test]
    fn break_clears_both_sides() {
        let (mut r, ids) = roster(&["a", "b"]);
        form_alliance(&mut r, ids[0], ids[1], 3, 1).unwrap();
        let events = resolve_alliance_intents(&mut r, &[(ids[1], AllianceIntent::Break)], 3, 2);
        assert_eq!(events.first().map(|e| e.kind), Some(AllianceEventKind::Broken));
        assert!(!are_allied(&r, ids[0], ids[1]));
        assert_eq!(r.get(ids[0]).unwrap().ally_id, None);
    }

    #[test]
    fn expiry_emits_once_per_pair() {
        let (mut r, ids) = roster(&["a", "b", "c", "d"]);
        form_alliance(&mut r, ids[0], ids[1], 2, 1).unwrap();
        form_alliance(&mut r, ids[2], ids[3], 3, 1).unwrap();

        assert!(tick_alliances(&mut r, 1).is_empty());
        let events = tick_alliances(&mut r, 2);
        assert_eq!(events.len(), 1);
        assert_eq!(events.first().map(|e| e.agent_a), Some(ids[0]));
        assert!(are_allied(&r, ids[2], ids[3]));

        assert_eq!(tick_alliances(&mut r, 3).len(), 1);
        assert!(tick_alliances(&mut r, 4).is_empty());
    }
}
