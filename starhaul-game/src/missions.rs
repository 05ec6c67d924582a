//! Delivery contracts: generation, acceptance and payout.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{
    MAX_ACCEPTED_MISSIONS, MAX_MISSION_BATCH, MIN_MISSION_BATCH, MISSION_REFRESH_INTERVAL_MS,
    MISSION_RARITY_WEIGHTS,
};
use crate::error::CommandError;
use crate::numbers::index_from_fraction;
use crate::rarity::{Rarity, draw_weighted};
use crate::resources::{ResourceAmounts, ResourceId, ResourceRegistry};
use crate::rewards::roll_inclusive;
use crate::state::GameState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveTemplate {
    pub resources: Vec<ResourceId>,
    pub amount_range: [u64; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusResourceTemplate {
    pub pool: Vec<ResourceId>,
    pub amount_range: [u64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardTemplate {
    pub credits_range: [u64; 2],
    pub xp_range: [u64; 2],
    #[serde(default)]
    pub resources: Option<BonusResourceTemplate>,
    #[serde(default)]
    pub ship_box_chance: f64,
}

/// Generation rules for one mission rarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionTemplate {
    pub titles: Vec<String>,
    pub objective: ObjectiveTemplate,
    pub rewards: RewardTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionObjective {
    pub resource: ResourceId,
    pub amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionReward {
    pub credits: u64,
    pub xp: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: ResourceAmounts,
    #[serde(default)]
    pub ship_boxes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: u64,
    pub rarity: Rarity,
    pub title: String,
    pub description: String,
    pub objective: MissionObjective,
    pub rewards: MissionReward,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionState {
    #[serde(default)]
    pub available_missions: Vec<Mission>,
    #[serde(default)]
    pub accepted_missions: Vec<Mission>,
    #[serde(default)]
    pub last_mission_refresh: u64,
}

impl MissionState {
    #[must_use]
    pub fn needs_refresh(&self, now: u64) -> bool {
        self.available_missions.is_empty()
            || now.saturating_sub(self.last_mission_refresh) > MISSION_REFRESH_INTERVAL_MS
    }
}

fn pick<'a, T, R: Rng + ?Sized>(pool: &'a [T], rng: &mut R) -> Option<&'a T> {
    let roll: f64 = rng.r#gen();
    pool.get(index_from_fraction(roll, pool.len()))
}

/// Roll one mission of a drawn rarity. `None` when the rarity has no
/// template or its pools are empty.
fn roll_mission<R>(
    id: u64,
    templates: &BTreeMap<Rarity, MissionTemplate>,
    registry: &ResourceRegistry,
    rng: &mut R,
) -> Option<Mission>
where
    R: Rng + ?Sized,
{
    let rarity = draw_weighted(&MISSION_RARITY_WEIGHTS, rng);
    let template = templates.get(&rarity)?;

    let resource = *pick(&template.objective.resources, rng)?;
    let amount = roll_inclusive(rng, template.objective.amount_range);
    let mut rewards = MissionReward {
        credits: roll_inclusive(rng, template.rewards.credits_range),
        xp: roll_inclusive(rng, template.rewards.xp_range),
        ..MissionReward::default()
    };
    if let Some(bonus) = &template.rewards.resources
        && let Some(bonus_resource) = pick(&bonus.pool, rng)
    {
        rewards
            .resources
            .insert(*bonus_resource, roll_inclusive(rng, bonus.amount_range));
    }
    if template.rewards.ship_box_chance > 0.0 && rng.r#gen::<f64>() < template.rewards.ship_box_chance {
        rewards.ship_boxes = 1;
    }
    let title = pick(&template.titles, rng).cloned().unwrap_or_else(|| "Contract".to_string());
    let name = registry.name(resource);

    Some(Mission {
        id,
        rarity,
        title,
        description: format!(
            "A local faction needs a delivery of {amount} units of {name}. \
             Gather the cargo and deliver it to collect the reward."
        ),
        objective: MissionObjective { resource, amount },
        rewards,
    })
}

/// Roll a fresh batch of one to five missions. Mythic is never offered.
pub fn generate_missions<R>(
    state: &mut GameState,
    templates: &BTreeMap<Rarity, MissionTemplate>,
    registry: &ResourceRegistry,
    rng: &mut R,
) -> Vec<Mission>
where
    R: Rng + ?Sized,
{
    let span = MAX_MISSION_BATCH - MIN_MISSION_BATCH + 1;
    let count = MIN_MISSION_BATCH + index_from_fraction(rng.r#gen(), span);
    (0..count)
        .filter_map(|_| {
            let id = state.next_id();
            roll_mission(id, templates, registry, rng)
        })
        .collect()
}

/// Replace the offered pool when it is empty or stale. Returns whether a
/// refresh happened.
pub fn refresh_missions_if_needed<R>(
    state: &mut GameState,
    templates: &BTreeMap<Rarity, MissionTemplate>,
    registry: &ResourceRegistry,
    now: u64,
    rng: &mut R,
) -> bool
where
    R: Rng + ?Sized,
{
    if !state.mission_state.needs_refresh(now) {
        return false;
    }
    let fresh = generate_missions(state, templates, registry, rng);
    log::debug!("mission board refreshed with {} contracts", fresh.len());
    state.mission_state.available_missions = fresh;
    state.mission_state.last_mission_refresh = now;
    true
}

/// # Errors
///
/// Rejects unknown ids and a full accepted list.
pub fn accept_mission(state: &mut GameState, mission_id: u64) -> Result<(), CommandError> {
    let missions = &mut state.mission_state;
    if missions.accepted_missions.len() >= MAX_ACCEPTED_MISSIONS {
        return Err(CommandError::MissionLimitReached(MAX_ACCEPTED_MISSIONS));
    }
    let index = missions
        .available_missions
        .iter()
        .position(|mission| mission.id == mission_id)
        .ok_or(CommandError::UnknownMission(mission_id))?;
    let mission = missions.available_missions.remove(index);
    missions.accepted_missions.push(mission);
    Ok(())
}

/// Return an accepted mission to the offered pool.
///
/// # Errors
///
/// Rejects ids that are not accepted.
pub fn abandon_mission(state: &mut GameState, mission_id: u64) -> Result<(), CommandError> {
    let missions = &mut state.mission_state;
    let index = missions
        .accepted_missions
        .iter()
        .position(|mission| mission.id == mission_id)
        .ok_or(CommandError::UnknownMission(mission_id))?;
    let mission = missions.accepted_missions.remove(index);
    missions.available_missions.push(mission);
    Ok(())
}

/// Deliver the objective cargo and collect the reward.
///
/// # Errors
///
/// Rejects ids that are not accepted and missing cargo; nothing changes on
/// rejection.
pub fn claim_mission(state: &mut GameState, mission_id: u64) -> Result<Mission, CommandError> {
    let index = state
        .mission_state
        .accepted_missions
        .iter()
        .position(|mission| mission.id == mission_id)
        .ok_or(CommandError::UnknownMission(mission_id))?;
    let objective = state.mission_state.accepted_missions[index].objective.clone();
    state.resources.try_spend(objective.resource, objective.amount)?;

    let mission = state.mission_state.accepted_missions.remove(index);
    let rewards = &mission.rewards;
    state.resources.credit(ResourceId::Credits, rewards.credits);
    state.resources.credit_all(&rewards.resources);
    state.ship_boxes = state.ship_boxes.saturating_add(rewards.ship_boxes);
    state.player_state.add_xp(rewards.xp);
    log::info!("mission #{mission_id} \"{}\" completed", mission.title);
    Ok(mission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::GameContent;
    use crate::test_support::{FixedRng, ScriptedRng};

    fn mission(id: u64, resource: ResourceId, amount: u64) -> Mission {
        Mission {
            id,
            rarity: Rarity::Common,
            title: "Mining Order".to_string(),
            description: String::new(),
            objective: MissionObjective { resource, amount },
            rewards: MissionReward {
                credits: 200,
                xp: 20,
                resources: [(ResourceId::Silicon, 60)].into_iter().collect(),
                ship_boxes: 1,
            },
        }
    }

    #[test]
    fn generation_follows_roll_order() {
        let content = GameContent::load_from_static();
        let mut state = GameState::new(0);
        // count, rarity, objective resource, amount, credits, xp, title
        let mut rng = ScriptedRng::new(&[0.0, 0.0, 0.5, 0.0, 0.999, 0.0, 0.0]);
        let batch = generate_missions(&mut state, &content.missions, &content.resources, &mut rng);
        assert_eq!(batch.len(), 1);
        let mission = &batch[0];
        assert_eq!(mission.rarity, Rarity::Common);
        assert_eq!(mission.objective.resource, ResourceId::Copper);
        assert_eq!(mission.objective.amount, 50);
        assert_eq!(mission.rewards.credits, 300);
        assert_eq!(mission.rewards.xp, 10);
        assert_eq!(mission.title, "Scrap Collection");
        assert!(mission.rewards.resources.is_empty());
        assert_eq!(mission.rewards.ship_boxes, 0);
        assert!(mission.description.contains("50 units of Copper"));
        assert_eq!(rng.consumed(), 7);
    }

    #[test]
    fn top_roll_generates_five_missions() {
        let content = GameContent::load_from_static();
        let mut state = GameState::new(0);
        let batch = generate_missions(
            &mut state,
            &content.missions,
            &content.resources,
            &mut FixedRng::fraction(0.999),
        );
        assert_eq!(batch.len(), 5);
        assert!(batch.iter().all(|mission| mission.rarity == Rarity::Legendary));
        assert!(batch.iter().all(|mission| mission.rewards.ship_boxes == 1));
        assert!(batch.iter().all(|mission| mission.objective.amount == 3));
    }

    #[test]
    fn refresh_only_when_empty_or_stale() {
        let content = GameContent::load_from_static();
        let mut state = GameState::new(0);
        let mut rng = FixedRng::fraction(0.3);
        assert!(refresh_missions_if_needed(&mut state, &content.missions, &content.resources, 10, &mut rng));
        assert!(!state.mission_state.available_missions.is_empty());
        assert!(!refresh_missions_if_needed(
            &mut state,
            &content.missions,
            &content.resources,
            10 + MISSION_REFRESH_INTERVAL_MS,
            &mut rng
        ));
        assert!(refresh_missions_if_needed(
            &mut state,
            &content.missions,
            &content.resources,
            11 + MISSION_REFRESH_INTERVAL_MS,
            &mut rng
        ));
        assert_eq!(state.mission_state.last_mission_refresh, 11 + MISSION_REFRESH_INTERVAL_MS);
    }

    #[test]
    fn accept_caps_at_three_and_abandon_returns() {
        let mut state = GameState::new(0);
        state.mission_state.available_missions = (1..=4).map(|id| mission(id, ResourceId::Iron, 10)).collect();
        for id in 1..=3 {
            accept_mission(&mut state, id).unwrap();
        }
        assert_eq!(accept_mission(&mut state, 4), Err(CommandError::MissionLimitReached(3)));
        abandon_mission(&mut state, 2).unwrap();
        assert_eq!(state.mission_state.accepted_missions.len(), 2);
        assert_eq!(state.mission_state.available_missions.last().map(|m| m.id), Some(2));
        assert_eq!(abandon_mission(&mut state, 2), Err(CommandError::UnknownMission(2)));
    }

    #[test]
    fn claim_requires_cargo_and_pays_out() {
        let mut state = GameState::new(0);
        state.mission_state.accepted_missions = vec![mission(7, ResourceId::Iron, 80)];
        let before = state.clone();
        assert!(matches!(
            claim_mission(&mut state, 7),
            Err(CommandError::InsufficientResources { .. })
        ));
        assert_eq!(state, before);

        state.resources.credit(ResourceId::Iron, 30);
        claim_mission(&mut state, 7).unwrap();
        assert_eq!(state.resources.get(ResourceId::Iron), 0);
        assert_eq!(state.resources.get(ResourceId::Credits), 1_200);
        assert_eq!(state.resources.get(ResourceId::Silicon), 60);
        assert_eq!(state.ship_boxes, 2);
        assert_eq!(state.player_state.xp, 20);
        assert!(state.mission_state.accepted_missions.is_empty());
    }
}
